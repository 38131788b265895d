//! Domain primitive types used across the odoogen workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OdoogenError;

/// Odoo version in the two-segment form used by images and archives (`18.0`).
///
/// Normalization only appends `.0`; the numeric content is not validated, so
/// `"abc"` becomes `"abc.0"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OdooVersion(String);

impl OdooVersion {
    /// Canonicalizes a user-supplied version, appending `.0` when missing.
    #[must_use]
    pub fn normalize(input: &str) -> Self {
        let input = input.trim();
        let normalized = if input.ends_with(".0") {
            input.to_string()
        } else {
            format!("{input}.0")
        };
        let version = Self(normalized);
        if !version.is_release_number() {
            tracing::warn!(version = %version, "version does not look like an Odoo release number");
        }
        version
    }

    /// Whether the major part is a plain number.
    #[must_use]
    pub fn is_release_number(&self) -> bool {
        let major = self.short_form();
        !major.is_empty() && major.chars().all(|c| c.is_ascii_digit())
    }

    /// Returns the version without its trailing `.0` (`18.0` -> `18`).
    ///
    /// Only used to build archive-host URLs.
    #[must_use]
    pub fn short_form(&self) -> &str {
        self.0.strip_suffix(".0").unwrap_or(&self.0)
    }

    /// Returns the normalized version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OdooVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Odoo edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    /// Open-source feature set.
    #[default]
    Community,
    /// Licensed feature set, distributed as a token-gated archive.
    Enterprise,
}

impl Edition {
    /// Lowercase identifier used in directory and resource names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Community => "community",
            Self::Enterprise => "enterprise",
        }
    }

    /// Capitalized name shown in generated documents.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Community => "Community",
            Self::Enterprise => "Enterprise",
        }
    }

    /// Whether this is the enterprise edition.
    #[must_use]
    pub const fn is_enterprise(self) -> bool {
        matches!(self, Self::Enterprise)
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Edition {
    type Err = OdoogenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "community" => Ok(Self::Community),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(OdoogenError::Config {
                message: format!("unknown edition '{other}' (expected community or enterprise)"),
            }),
        }
    }
}

/// How the generated instance initializes its database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    /// No database is pinned; the web wizard creates one on first run.
    #[default]
    Fresh,
    /// A fixed database name is pinned and initialized after start.
    Preconfigured,
}

impl InstallMode {
    /// Whether this is the fresh-install mode.
    #[must_use]
    pub const fn is_fresh(self) -> bool {
        matches!(self, Self::Fresh)
    }
}
