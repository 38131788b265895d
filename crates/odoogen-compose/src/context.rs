//! Flat key set consumed by the instance templates.

use std::collections::BTreeMap;

use odoogen_common::constants::{POSTGRES_DB, POSTGRES_PASSWORD, POSTGRES_USER};
use odoogen_common::types::{Edition, OdooVersion};
use serde::{Deserialize, Serialize};

use crate::addons::MountSet;
use crate::naming::InstanceNames;

/// Command line passed to the Odoo container.
pub const ODOO_COMMAND: &str = "--config=/etc/odoo/odoo.conf";

/// Values available to every template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContext {
    /// Normalized version, e.g. `18.0`.
    pub odoo_version: String,
    /// `Community` or `Enterprise`.
    pub edition_name: String,
    /// Whether enterprise addons are part of the instance.
    pub is_enterprise: bool,
    /// Host port mapped to the Odoo HTTP port.
    pub external_port: u16,
    /// Instance database name.
    pub db_name: String,
    /// Maintenance database of the PostgreSQL service.
    pub postgres_db: String,
    /// PostgreSQL role.
    pub postgres_user: String,
    /// PostgreSQL password.
    pub postgres_password: String,
    /// Named volume of the PostgreSQL service.
    pub postgres_volume: String,
    /// Volume list of the Odoo service in compose short syntax.
    pub odoo_volumes: Vec<String>,
    /// Container command line.
    pub odoo_command: String,
    /// Top-level named volumes, all with default options.
    pub volumes: BTreeMap<String, Option<String>>,
    /// Host path of the enterprise addons mount.
    pub enterprise_path: Option<String>,
    /// Compose project name.
    pub project_name: String,
}

impl TemplateContext {
    /// Assembles the context of one instance.
    pub fn new(
        version: &OdooVersion,
        edition: Edition,
        port: u16,
        names: &InstanceNames,
        mounts: &MountSet,
        enterprise_path: Option<String>,
    ) -> Self {
        let volumes = [&names.volumes.odoo, &names.volumes.postgres]
            .into_iter()
            .map(|name| (name.clone(), None))
            .collect();
        Self {
            odoo_version: version.to_string(),
            edition_name: edition.display_name().to_string(),
            is_enterprise: edition.is_enterprise(),
            external_port: port,
            db_name: names.database.clone(),
            postgres_db: POSTGRES_DB.to_string(),
            postgres_user: POSTGRES_USER.to_string(),
            postgres_password: POSTGRES_PASSWORD.to_string(),
            postgres_volume: names.volumes.postgres.clone(),
            odoo_volumes: mounts.to_strings(),
            odoo_command: ODOO_COMMAND.to_string(),
            volumes,
            enterprise_path: enterprise_path.filter(|_| edition.is_enterprise()),
            project_name: names.project.clone(),
        }
    }
}
