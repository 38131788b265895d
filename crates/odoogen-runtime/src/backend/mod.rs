//! Container runtime abstraction.
//!
//! Every operation runs against a project directory passed explicitly; the
//! process working directory is never changed.

pub mod docker;

use std::path::Path;

use odoogen_common::error::Result;

pub use docker::DockerCompose;

/// Captured output of a runtime invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code, `-1` when terminated by a signal.
    pub exit_code: i32,
}

/// Compose-style container runtime.
pub trait ComposeRuntime {
    /// Human-readable command prefix, e.g. `docker compose`.
    fn command_line(&self) -> String;

    /// Builds images and starts every service in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be invoked or exits non-zero.
    fn up_build(&self, project_dir: &Path) -> Result<ExecOutput>;

    /// Lists the services of the project.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be invoked or exits non-zero.
    fn ps(&self, project_dir: &Path) -> Result<ExecOutput>;

    /// Runs `command` inside the running `service` without a TTY.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be invoked or exits non-zero.
    fn exec(&self, project_dir: &Path, service: &str, command: &[String]) -> Result<ExecOutput>;
}
