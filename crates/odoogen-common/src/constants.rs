//! System-wide constants and default paths.

use std::path::PathBuf;

/// Application name used in CLI output and data directories.
pub const APP_NAME: &str = "odoogen";

/// Default output directory for generated instances, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "docker-compose-files";

/// Default port exposed by the Odoo service.
pub const DEFAULT_PORT: u16 = 8069;

/// Thanks-page URL of the enterprise download flow. `{token}` and `{version}`
/// are substituted with the subscription code and the short version.
pub const DEFAULT_THANKS_URL: &str =
    "https://www.odoo.com/fr_FR/thanks/download?code={token}&platform_version=src_{version}e";

/// Host serving the enterprise archives.
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://download.odoocdn.com";

/// File written next to the extracted archive when the host answers with HTML.
pub const ERROR_RESPONSE_FILE: &str = "error_response.html";

/// Chunk size used while streaming downloads.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Seconds to wait after `up` before inspecting the stack.
pub const DEFAULT_SETTLE_SECS: u64 = 10;

/// Fixed PostgreSQL credentials shared by the database service and odoo.conf.
pub const POSTGRES_USER: &str = "odoo";
/// See [`POSTGRES_USER`].
pub const POSTGRES_PASSWORD: &str = "odoo";
/// Maintenance database created by the PostgreSQL image.
pub const POSTGRES_DB: &str = "postgres";
/// Master password written to odoo.conf.
pub const ADMIN_PASSWORD: &str = "admin";

/// Container-side mount points.
pub const MOUNT_EXTRA_ADDONS: &str = "/mnt/extra-addons";
/// See [`MOUNT_EXTRA_ADDONS`].
pub const MOUNT_CUSTOM_ADDONS: &str = "/mnt/custom-addons";
/// See [`MOUNT_EXTRA_ADDONS`].
pub const MOUNT_ENTERPRISE: &str = "/mnt/enterprise";
/// See [`MOUNT_EXTRA_ADDONS`].
pub const MOUNT_ENTERPRISE_ADDONS: &str = "/mnt/enterprise-addons";
/// Odoo data directory inside the container.
pub const ODOO_DATA_DIR: &str = "/var/lib/odoo";
/// Odoo configuration directory inside the container.
pub const ODOO_CONFIG_DIR: &str = "/etc/odoo";

/// Returns the data directory: `$HOME/.odoogen`, or `./.odoogen` without a
/// home directory. Nothing is created here; the cache creates its own
/// directory when opened.
pub fn data_dir() -> PathBuf {
    data_dir_in(
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from),
    )
}

fn data_dir_in(home: Option<PathBuf>) -> PathBuf {
    let name = format!(".{APP_NAME}");
    home.filter(|h| !h.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from(&name), |h| h.join(&name))
}

/// Returns the default enterprise archive cache directory.
pub fn default_cache_dir() -> PathBuf {
    data_dir().join("enterprise_cache")
}
