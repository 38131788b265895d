//! Instance generation, optionally followed by deployment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use odoogen_archive::fetch::FetchOutcome;
use odoogen_common::config::{DeployConfig, GeneratorConfig};
use odoogen_common::constants;
use odoogen_common::report::Reporter;
use odoogen_common::types::{Edition, InstallMode};
use odoogen_compose::composer::{ComposeRequest, GeneratedInstance, InstanceComposer};
use odoogen_runtime::backend::DockerCompose;
use odoogen_runtime::deploy::DeploymentRunner;

use crate::output::{self, TerminalReporter};

/// Arguments for instance generation.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Odoo version, e.g. `18` or `17.0`.
    #[arg(short = 'v', long = "version", env = "ODOOGEN_VERSION")]
    pub odoo_version: String,

    /// Edition: community or enterprise.
    #[arg(short, long, default_value = "community", env = "ODOOGEN_EDITION")]
    pub edition: Edition,

    /// Host port published for the Odoo web interface.
    #[arg(short, long, default_value_t = constants::DEFAULT_PORT, env = "ODOOGEN_PORT")]
    pub port: u16,

    /// Directory under which instance directories are created.
    #[arg(short, long, default_value = constants::DEFAULT_OUTPUT_DIR, env = "ODOOGEN_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Existing addons directory mounted as the custom addons.
    #[arg(long, env = "ODOOGEN_ADDONS_PATH")]
    pub addons_path: Option<PathBuf>,

    /// Token for the enterprise source download.
    #[arg(long, env = "ODOOGEN_ENTERPRISE_TOKEN", hide_env_values = true)]
    pub enterprise_token: Option<String>,

    /// Start the stack after generation.
    #[arg(long)]
    pub build: bool,

    /// Pin a database name and initialize it after start.
    #[arg(long)]
    pub configured: bool,

    /// Directory holding cached enterprise archives.
    #[arg(long, env = "ODOOGEN_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory overriding the embedded templates.
    #[arg(long, env = "ODOOGEN_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Seconds to wait after starting before checking the services.
    #[arg(long, default_value_t = constants::DEFAULT_SETTLE_SECS)]
    pub settle_secs: u64,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

impl GenerateArgs {
    const fn install_mode(&self) -> InstallMode {
        if self.configured {
            InstallMode::Preconfigured
        } else {
            InstallMode::Fresh
        }
    }

    fn has_enterprise_source(&self) -> bool {
        self.addons_path.is_some() || self.enterprise_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn generator_config(&self) -> GeneratorConfig {
        let mut config = GeneratorConfig {
            output_dir: self.output_dir.clone(),
            templates_dir: self.templates_dir.clone(),
            ..GeneratorConfig::default()
        };
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir.clone_from(cache_dir);
        }
        config
    }

    fn request(&self) -> ComposeRequest {
        ComposeRequest {
            version: self.odoo_version.clone(),
            edition: self.edition,
            port: self.port,
            addons_path: self.addons_path.clone(),
            enterprise_token: self.enterprise_token.clone(),
            install_mode: self.install_mode(),
        }
    }
}

/// Executes instance generation.
///
/// # Errors
///
/// Returns an error if generation fails or, with `--build`, if the stack
/// cannot be started.
pub fn execute(args: GenerateArgs) -> anyhow::Result<()> {
    let reporter = TerminalReporter::new();

    if args.edition == Edition::Enterprise && !args.has_enterprise_source() && !args.yes && !confirm_without_source()? {
        reporter.info("Aborted.");
        return Ok(());
    }

    let config = args.generator_config();
    let generated = InstanceComposer::new(&config, &reporter)
        .generate(&args.request())
        .context("instance generation failed")?;
    print_summary(&generated);

    if !args.build {
        print_start_hint(&generated);
        return Ok(());
    }

    let runtime = DockerCompose::detect().context("cannot start the instance")?;
    let deploy_config = DeployConfig {
        settle: Duration::from_secs(args.settle_secs),
    };
    let report = DeploymentRunner::new(&runtime, deploy_config, &reporter)
        .deploy(
            &generated.files.compose,
            generated.instance.install_mode,
            &generated.instance.names.database,
        )
        .context("deployment failed")?;
    if !report.running {
        reporter.warning("The instance may not be running; check the logs.");
    }
    Ok(())
}

fn confirm_without_source() -> anyhow::Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt("Enterprise edition without --addons-path or --enterprise-token. Continue?")
        .default(false)
        .interact()
        .context("confirmation needs an interactive terminal; pass --yes to skip it")
}

#[allow(clippy::print_stderr)]
fn print_summary(generated: &GeneratedInstance) {
    let instance = &generated.instance;
    eprintln!();
    eprintln!("  {}", "Instance ready".bold());
    eprintln!("    Directory : {}", instance.directory().display());
    eprintln!("    Version   : {} ({})", instance.version, instance.edition.display_name());
    eprintln!("    Port      : {}", instance.port);
    eprintln!("    Database  : {}", instance.names.database);
    eprintln!("    Project   : {}", instance.names.project);
    if let Some(FetchOutcome::Extracted { archive, from_cache, .. }) = &instance.enterprise_fetch {
        let size = std::fs::metadata(archive).map_or(0, |m| m.len());
        let origin = if *from_cache { "cached" } else { "downloaded" };
        eprintln!("    Enterprise: {origin} archive, {}", output::format_bytes(size));
    }
    eprintln!();
}

#[allow(clippy::print_stderr)]
fn print_start_hint(generated: &GeneratedInstance) {
    eprintln!("  To start the instance:");
    eprintln!(
        "    {}",
        format!("cd {} && docker compose up -d", generated.instance.directory().display()).cyan()
    );
    eprintln!();
}
