//! Build, start and initialize a generated instance.

use std::path::{Path, PathBuf};

use odoogen_common::config::DeployConfig;
use odoogen_common::constants::DEFAULT_PORT;
use odoogen_common::error::{OdoogenError, Result};
use odoogen_common::report::{Level, Reporter};
use odoogen_common::types::InstallMode;
use odoogen_compose::render::write_env_file;

use crate::backend::ComposeRuntime;
use crate::inspect;

/// Service running Odoo in the generated compose file.
pub const ODOO_SERVICE: &str = "odoo";

/// Outcome of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    /// Instance directory.
    pub instance_dir: PathBuf,
    /// Compose project name pinned in `.env`.
    pub project_name: String,
    /// Published HTTP port.
    pub port: u16,
    /// Access URL.
    pub url: String,
    /// Whether the state check found running services.
    pub running: bool,
    /// Database initialization result; `None` in fresh-install mode.
    pub database_initialized: Option<bool>,
}

/// Deploys instances through a [`ComposeRuntime`].
pub struct DeploymentRunner<'a> {
    runtime: &'a dyn ComposeRuntime,
    config: DeployConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> DeploymentRunner<'a> {
    /// Creates a runner.
    pub fn new(runtime: &'a dyn ComposeRuntime, config: DeployConfig, reporter: &'a dyn Reporter) -> Self {
        Self {
            runtime,
            config,
            reporter,
        }
    }

    /// Starts the stack described by `compose_file`.
    ///
    /// In preconfigured mode `db_name` is initialized with the `base` module
    /// once the stack is up; a failure there is reported but not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the compose file is missing or unreadable, or if
    /// building, starting or listing the services fails.
    pub fn deploy(&self, compose_file: &Path, mode: InstallMode, db_name: &str) -> Result<DeploymentReport> {
        if !compose_file.is_file() {
            self.reporter.error("docker-compose.yml not found");
            return Err(OdoogenError::NotFound {
                kind: "compose file",
                id: compose_file.display().to_string(),
            });
        }
        let instance_dir = compose_file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        self.reporter.section("Deploying Docker containers");

        let info = inspect::inspect(compose_file)?;
        let port = info.port.unwrap_or_else(|| {
            self.reporter
                .warning(&format!("No published port for the odoo service, assuming {DEFAULT_PORT}"));
            DEFAULT_PORT
        });
        self.reporter.message(
            Level::Docker,
            &format!("Using Docker Compose project name: {}", info.project_name),
        );
        let _ = write_env_file(&instance_dir, &info.project_name)?;
        self.reporter
            .info(&format!(".env written with COMPOSE_PROJECT_NAME={}", info.project_name));

        self.step(
            &format!("Building containers from {}", compose_file.display()),
            "Containers built and started",
            || self.runtime.up_build(&instance_dir),
        )?;

        let wait = self.reporter.spinner(&format!(
            "Waiting {} seconds for the containers to start",
            self.config.settle.as_secs()
        ));
        std::thread::sleep(self.config.settle);
        wait.finish(true, None);

        let check = self.reporter.spinner("Checking container state");
        let running = match self.runtime.ps(&instance_dir) {
            Ok(output) => {
                let running = output.stdout.contains("Up") || output.stdout.contains("running");
                if running {
                    check.finish(true, Some("Containers started successfully"));
                } else {
                    check.finish(false, Some("The containers do not seem to be running"));
                }
                running
            }
            Err(e) => {
                check.finish(false, Some(&e.to_string()));
                return Err(e);
            }
        };
        tracing::info!(project = %info.project_name, running, "deployment state checked");

        let database_initialized = match mode {
            InstallMode::Preconfigured => Some(self.initialize_database(&instance_dir, db_name)),
            InstallMode::Fresh => {
                self.reporter.message(
                    Level::Odoo,
                    "Fresh install mode: Odoo starts without a preconfigured database",
                );
                self.reporter
                    .info("Create a new database from the web interface");
                None
            }
        };

        let url = format!("http://localhost:{port}");
        self.summarize(&instance_dir, &url, mode, db_name);

        Ok(DeploymentReport {
            instance_dir,
            project_name: info.project_name,
            port,
            url,
            running,
            database_initialized,
        })
    }

    fn initialize_database(&self, instance_dir: &Path, db_name: &str) -> bool {
        self.reporter.message(
            Level::Odoo,
            &format!("Initializing Odoo database '{db_name}'..."),
        );
        let command: Vec<String> = ["odoo", "-d", db_name, "--stop-after-init", "-i", "base"]
            .into_iter()
            .map(String::from)
            .collect();
        match self.runtime.exec(instance_dir, ODOO_SERVICE, &command) {
            Ok(_) => {
                self.reporter
                    .success(&format!("Database '{db_name}' initialized"));
                true
            }
            Err(e) => {
                tracing::warn!(db = db_name, error = %e, "database initialization failed");
                self.reporter
                    .error(&format!("Database initialization failed: {e}"));
                false
            }
        }
    }

    fn summarize(&self, instance_dir: &Path, url: &str, mode: InstallMode, db_name: &str) {
        let runtime = self.runtime.command_line();
        let dir = instance_dir.display();
        self.reporter.section("Odoo instance access");
        self.reporter.success(&format!("Odoo available at {url}"));
        if !mode.is_fresh() {
            self.reporter.info(&format!("Database: {db_name}"));
        }
        self.reporter.section("Useful commands");
        self.reporter
            .info("Stop and remove only this instance:");
        self.reporter
            .info(&format!("cd {dir} && {runtime} down -v"));
        self.reporter.info("Follow the logs:");
        self.reporter
            .info(&format!("cd {dir} && {runtime} logs -f"));
    }

    fn step<T>(&self, label: &str, done: &str, run: impl FnOnce() -> Result<T>) -> Result<T> {
        let task = self.reporter.spinner(label);
        match run() {
            Ok(value) => {
                task.finish(true, Some(done));
                Ok(value)
            }
            Err(e) => {
                task.finish(false, Some(&e.to_string()));
                self.reporter
                    .error(&format!("Error while starting the containers: {e}"));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use odoogen_common::report::MemoryReporter;

    use super::*;
    use crate::backend::ExecOutput;

    #[derive(Default)]
    struct FakeRuntime {
        calls: RefCell<Vec<(PathBuf, String)>>,
        ps_output: String,
        fail_up: bool,
        fail_exec: bool,
    }

    impl FakeRuntime {
        fn running() -> Self {
            Self {
                ps_output: "odoo-1  Up 3 seconds\ndb-1  Up 4 seconds\n".into(),
                ..Self::default()
            }
        }

        fn record(&self, dir: &Path, call: String) {
            self.calls.borrow_mut().push((dir.to_path_buf(), call));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(_, c)| c.clone()).collect()
        }
    }

    impl ComposeRuntime for FakeRuntime {
        fn command_line(&self) -> String {
            "docker compose".into()
        }

        fn up_build(&self, project_dir: &Path) -> Result<ExecOutput> {
            self.record(project_dir, "up -d --build".into());
            if self.fail_up {
                return Err(OdoogenError::Runtime {
                    command: "docker compose up -d --build".into(),
                    message: "build failed".into(),
                });
            }
            Ok(ExecOutput::default())
        }

        fn ps(&self, project_dir: &Path) -> Result<ExecOutput> {
            self.record(project_dir, "ps".into());
            Ok(ExecOutput {
                stdout: self.ps_output.clone(),
                ..ExecOutput::default()
            })
        }

        fn exec(&self, project_dir: &Path, service: &str, command: &[String]) -> Result<ExecOutput> {
            self.record(project_dir, format!("exec {service} {}", command.join(" ")));
            if self.fail_exec {
                return Err(OdoogenError::Runtime {
                    command: "exec".into(),
                    message: "database exists".into(),
                });
            }
            Ok(ExecOutput::default())
        }
    }

    fn instance(dir: &Path) -> PathBuf {
        let compose = dir.join("docker-compose.yml");
        std::fs::write(
            &compose,
            "services:\n  odoo:\n    ports:\n    - 8070:8069\nvolumes:\n  odoo_180_community_8070_odoo_data: null\n  odoo_180_community_8070_postgres_data: null\n",
        )
        .expect("write compose");
        compose
    }

    fn config() -> DeployConfig {
        DeployConfig {
            settle: Duration::ZERO,
        }
    }

    #[test]
    fn fresh_deploy_skips_database_init() {
        let dir = tempfile::tempdir().expect("tempdir");
        let compose = instance(dir.path());
        let runtime = FakeRuntime::running();
        let reporter = MemoryReporter::new();

        let report = DeploymentRunner::new(&runtime, config(), &reporter)
            .deploy(&compose, InstallMode::Fresh, "odoo_18_0_community_8070")
            .expect("deploy");

        assert_eq!(runtime.calls(), vec!["up -d --build", "ps"]);
        assert!(report.running);
        assert_eq!(report.database_initialized, None);
        assert_eq!(report.url, "http://localhost:8070");
        assert_eq!(report.project_name, "odoo_180_community_8070");
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".env")).expect("env"),
            "COMPOSE_PROJECT_NAME=odoo_180_community_8070\n"
        );
    }

    #[test]
    fn runtime_calls_use_the_instance_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let compose = instance(dir.path());
        let runtime = FakeRuntime::running();
        let reporter = MemoryReporter::new();

        let _ = DeploymentRunner::new(&runtime, config(), &reporter)
            .deploy(&compose, InstallMode::Preconfigured, "db")
            .expect("deploy");

        assert!(runtime.calls.borrow().iter().all(|(d, _)| d == dir.path()));
    }

    #[test]
    fn preconfigured_deploy_initializes_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let compose = instance(dir.path());
        let runtime = FakeRuntime::running();
        let reporter = MemoryReporter::new();

        let report = DeploymentRunner::new(&runtime, config(), &reporter)
            .deploy(&compose, InstallMode::Preconfigured, "odoo_18_0_community_8070")
            .expect("deploy");

        assert_eq!(
            runtime.calls().last().map(String::as_str),
            Some("exec odoo odoo -d odoo_18_0_community_8070 --stop-after-init -i base")
        );
        assert_eq!(report.database_initialized, Some(true));
        assert!(reporter
            .at(Level::Info)
            .iter()
            .any(|m| m == "Database: odoo_18_0_community_8070"));
    }

    #[test]
    fn database_init_failure_is_reported_not_returned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let compose = instance(dir.path());
        let runtime = FakeRuntime {
            fail_exec: true,
            ..FakeRuntime::running()
        };
        let reporter = MemoryReporter::new();

        let report = DeploymentRunner::new(&runtime, config(), &reporter)
            .deploy(&compose, InstallMode::Preconfigured, "db")
            .expect("deploy");

        assert_eq!(report.database_initialized, Some(false));
        assert_eq!(reporter.at(Level::Error).len(), 1);
    }

    #[test]
    fn up_failure_is_an_error_without_further_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let compose = instance(dir.path());
        let runtime = FakeRuntime {
            fail_up: true,
            ..FakeRuntime::running()
        };
        let reporter = MemoryReporter::new();

        let result = DeploymentRunner::new(&runtime, config(), &reporter).deploy(&compose, InstallMode::Fresh, "db");

        assert!(matches!(result, Err(OdoogenError::Runtime { .. })));
        assert_eq!(runtime.calls(), vec!["up -d --build"]);
    }

    #[test]
    fn stopped_services_are_flagged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let compose = instance(dir.path());
        let runtime = FakeRuntime {
            ps_output: "NAME  STATUS\nodoo-1  Exited (1)\n".into(),
            ..FakeRuntime::default()
        };
        let reporter = MemoryReporter::new();

        let report = DeploymentRunner::new(&runtime, config(), &reporter)
            .deploy(&compose, InstallMode::Fresh, "db")
            .expect("deploy");

        assert!(!report.running);
    }

    #[test]
    fn missing_compose_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runtime = FakeRuntime::running();
        let reporter = MemoryReporter::new();

        let result = DeploymentRunner::new(&runtime, config(), &reporter).deploy(
            &dir.path().join("docker-compose.yml"),
            InstallMode::Fresh,
            "db",
        );

        assert!(matches!(result, Err(OdoogenError::NotFound { .. })));
        assert!(runtime.calls().is_empty());
    }
}
