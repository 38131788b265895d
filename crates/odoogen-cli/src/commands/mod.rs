//! CLI definition and dispatch.

pub mod generate;

use clap::Parser;

/// odoogen: per-instance Odoo docker-compose generator.
#[derive(Parser, Debug)]
#[command(name = "odoogen", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Generation options.
    #[command(flatten)]
    pub generate: generate::GenerateArgs,

    /// Enable debug logging (overrides `RUST_LOG`).
    #[arg(long)]
    pub verbose: bool,
}

/// Runs the parsed command line.
///
/// # Errors
///
/// Returns an error if generation or deployment fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    generate::execute(cli.generate)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::CommandFactory;
    use odoogen_common::types::Edition;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_apply() {
        let cli = Cli::try_parse_from(["odoogen", "--version", "18"]).expect("parse");
        let args = cli.generate;
        assert_eq!(args.odoo_version, "18");
        assert_eq!(args.edition, Edition::Community);
        assert_eq!(args.port, 8069);
        assert_eq!(args.output_dir, PathBuf::from("docker-compose-files"));
        assert!(!args.build);
        assert!(!args.configured);
        assert!(!cli.verbose);
    }

    #[test]
    fn enterprise_flags_parse() {
        let cli = Cli::try_parse_from([
            "odoogen",
            "-v",
            "17.0",
            "--edition",
            "Enterprise",
            "--port",
            "8070",
            "--enterprise-token",
            "secret",
            "--configured",
            "--build",
            "--yes",
        ])
        .expect("parse");
        let args = cli.generate;
        assert_eq!(args.edition, Edition::Enterprise);
        assert_eq!(args.port, 8070);
        assert_eq!(args.enterprise_token.as_deref(), Some("secret"));
        assert!(args.configured && args.build && args.yes);
    }

    #[test]
    fn version_is_required() {
        assert!(Cli::try_parse_from(["odoogen", "--edition", "community"]).is_err());
    }

    #[test]
    fn unknown_edition_is_rejected() {
        assert!(Cli::try_parse_from(["odoogen", "--version", "18", "--edition", "premium"]).is_err());
    }
}
