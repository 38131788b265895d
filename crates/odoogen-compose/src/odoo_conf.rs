//! The `odoo.conf` file mounted at `/etc/odoo`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use odoogen_common::constants::{
    ADMIN_PASSWORD, DEFAULT_PORT, MOUNT_CUSTOM_ADDONS, MOUNT_ENTERPRISE_ADDONS, MOUNT_EXTRA_ADDONS,
    POSTGRES_PASSWORD, POSTGRES_USER,
};
use odoogen_common::error::{OdoogenError, Result};
use odoogen_common::types::{Edition, InstallMode};

const CORE_ADDONS: &str = "/usr/lib/python3/dist-packages/odoo/addons";
const ENTERPRISE_ODOO_ADDONS: &str = "/mnt/enterprise/odoo/addons";

/// Comma-separated `addons_path` for an edition.
pub fn addons_path(edition: Edition) -> String {
    let mut paths = vec![MOUNT_EXTRA_ADDONS, CORE_ADDONS];
    if edition.is_enterprise() {
        paths.extend([ENTERPRISE_ODOO_ADDONS, MOUNT_ENTERPRISE_ADDONS]);
    }
    paths.push(MOUNT_CUSTOM_ADDONS);
    paths.join(",")
}

/// Renders the `[options]` section.
///
/// Fresh installs enable the database manager and pin no database;
/// preconfigured installs pin `db_name` and leave listing off.
pub fn render(edition: Edition, mode: InstallMode, db_name: &str) -> String {
    let mut out = String::from("[options]\n");
    let mut option = |key: &str, value: &str| {
        let _ = writeln!(out, "{key} = {value}");
    };
    option("addons_path", &addons_path(edition));
    option("db_host", "db");
    option("db_port", "5432");
    option("db_user", POSTGRES_USER);
    option("db_password", POSTGRES_PASSWORD);
    option("http_port", &DEFAULT_PORT.to_string());
    match mode {
        InstallMode::Fresh => {
            option("list_db", "True");
            option("admin_passwd", ADMIN_PASSWORD);
        }
        InstallMode::Preconfigured => {
            option("admin_passwd", ADMIN_PASSWORD);
            option("db_name", db_name);
        }
    }
    out
}

/// Writes `odoo.conf` into `etc_dir`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write(etc_dir: &Path, edition: Edition, mode: InstallMode, db_name: &str) -> Result<PathBuf> {
    let path = etc_dir.join("odoo.conf");
    std::fs::write(&path, render(edition, mode, db_name)).map_err(|e| OdoogenError::io(&path, e))?;
    tracing::debug!(path = %path.display(), ?mode, "odoo.conf written");
    Ok(path)
}
