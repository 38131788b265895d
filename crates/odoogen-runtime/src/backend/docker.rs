//! Docker Compose CLI backend.

use std::path::{Path, PathBuf};
use std::process::Command;

use odoogen_common::error::{OdoogenError, Result};

use super::{ComposeRuntime, ExecOutput};

/// Invokes `docker-compose`, or `docker compose` when the standalone binary
/// is not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerCompose {
    program: PathBuf,
    prefix: Vec<String>,
}

impl DockerCompose {
    /// Locates a compose implementation on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`OdoogenError::NotFound`] if neither `docker-compose` nor
    /// `docker` is installed.
    pub fn detect() -> Result<Self> {
        if let Ok(program) = which::which("docker-compose") {
            tracing::debug!(program = %program.display(), "using standalone docker-compose");
            return Ok(Self::new(program, Vec::new()));
        }
        let program = which::which("docker").map_err(|_| OdoogenError::NotFound {
            kind: "container runtime",
            id: "docker-compose or docker".into(),
        })?;
        tracing::debug!(program = %program.display(), "using docker compose plugin");
        Ok(Self::new(program, vec!["compose".into()]))
    }

    /// Uses `program` followed by `prefix` for every invocation.
    pub fn new(program: impl Into<PathBuf>, prefix: Vec<String>) -> Self {
        Self {
            program: program.into(),
            prefix,
        }
    }

    fn run(&self, project_dir: &Path, args: &[String]) -> Result<ExecOutput> {
        let command = format!("{} {}", self.command_line(), args.join(" "));
        tracing::info!(dir = %project_dir.display(), %command, "invoking container runtime");

        let output = Command::new(&self.program)
            .args(&self.prefix)
            .args(args)
            .current_dir(project_dir)
            .output()
            .map_err(|e| OdoogenError::io(&self.program, e))?;

        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        if !output.status.success() {
            return Err(OdoogenError::Runtime {
                command,
                message: format!("exit code {}: {}", result.exit_code, result.stderr.trim()),
            });
        }
        Ok(result)
    }
}

impl ComposeRuntime for DockerCompose {
    fn command_line(&self) -> String {
        let program = self
            .program
            .file_name()
            .map_or_else(|| self.program.display().to_string(), |n| n.to_string_lossy().into_owned());
        std::iter::once(program)
            .chain(self.prefix.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn up_build(&self, project_dir: &Path) -> Result<ExecOutput> {
        self.run(project_dir, &["up".into(), "-d".into(), "--build".into()])
    }

    fn ps(&self, project_dir: &Path) -> Result<ExecOutput> {
        self.run(project_dir, &["ps".into()])
    }

    fn exec(&self, project_dir: &Path, service: &str, command: &[String]) -> Result<ExecOutput> {
        let mut args = vec!["exec".to_string(), "-T".to_string(), service.to_string()];
        args.extend_from_slice(command);
        self.run(project_dir, &args)
    }
}
