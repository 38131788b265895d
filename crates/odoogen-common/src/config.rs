//! Configuration model for generation and deployment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Endpoints of the token-gated enterprise download flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHost {
    /// Thanks-page URL template with `{token}` and `{version}` placeholders.
    pub thanks_url: String,
    /// Base URL of the download host, without trailing slash.
    pub download_base: String,
}

impl ArchiveHost {
    /// Builds the thanks-page URL for a token and short version.
    #[must_use]
    pub fn thanks_url_for(&self, token: &str, short_version: &str) -> String {
        self.thanks_url
            .replace("{token}", token)
            .replace("{version}", short_version)
    }

    /// Builds a direct download URL from a `payload=` value.
    #[must_use]
    pub fn payload_url(&self, short_version: &str, payload: &str) -> String {
        format!(
            "{}/download/{short_version}e/src?payload={payload}",
            self.download_base.trim_end_matches('/')
        )
    }
}

impl Default for ArchiveHost {
    fn default() -> Self {
        Self {
            thanks_url: constants::DEFAULT_THANKS_URL.to_string(),
            download_base: constants::DEFAULT_DOWNLOAD_BASE.to_string(),
        }
    }
}

/// Root configuration for instance generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Directory under which instance directories are created.
    pub output_dir: PathBuf,
    /// Directory holding cached enterprise archives.
    pub cache_dir: PathBuf,
    /// Directory overriding the embedded templates.
    pub templates_dir: Option<PathBuf>,
    /// Remote archive host.
    pub archive_host: ArchiveHost,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            cache_dir: constants::default_cache_dir(),
            templates_dir: None,
            archive_host: ArchiveHost::default(),
        }
    }
}

/// Configuration of the deployment runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Time to wait between `up` and the state inspection.
    pub settle: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(constants::DEFAULT_SETTLE_SECS),
        }
    }
}
