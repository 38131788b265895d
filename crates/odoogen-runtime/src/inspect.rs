//! Read-back of a rendered compose file.

use std::path::Path;

use odoogen_common::error::{OdoogenError, Result};
use serde_yaml::Value;

/// Values the deployment needs from a compose file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeInfo {
    /// Host port of the first `odoo` service port mapping.
    pub port: Option<u16>,
    /// Compose project name.
    pub project_name: String,
}

/// Parses `compose_file` and extracts its [`ComposeInfo`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid YAML.
pub fn inspect(compose_file: &Path) -> Result<ComposeInfo> {
    let text = std::fs::read_to_string(compose_file).map_err(|e| OdoogenError::io(compose_file, e))?;
    let doc: Value = serde_yaml::from_str(&text)?;
    let instance_dir = compose_file.parent().unwrap_or_else(|| Path::new("."));
    Ok(ComposeInfo {
        port: published_port(&doc),
        project_name: project_name(&doc, instance_dir),
    })
}

/// Host side of `services.odoo.ports[0]`.
pub fn published_port(doc: &Value) -> Option<u16> {
    let first = doc.get("services")?.get("odoo")?.get("ports")?.get(0)?;
    match first {
        Value::String(mapping) => mapping.split(':').next()?.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        _ => None,
    }
}

/// Project name recovered from the `*_odoo_data` volume, or derived from the
/// instance directory name with `-` and `.` replaced by `_`.
pub fn project_name(doc: &Value, instance_dir: &Path) -> String {
    let from_volume = doc
        .get("volumes")
        .and_then(Value::as_mapping)
        .and_then(|volumes| {
            volumes
                .keys()
                .filter_map(Value::as_str)
                .find_map(|name| name.strip_suffix("_odoo_data"))
        });
    if let Some(project) = from_volume {
        return project.to_string();
    }
    let dir_name = std::fs::canonicalize(instance_dir)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .or_else(|| instance_dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    dir_name.replace(['-', '.'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).expect("yaml")
    }

    #[test]
    fn port_from_string_mapping() {
        let doc = yaml("services:\n  odoo:\n    ports:\n      - \"8070:8069\"\n");
        assert_eq!(published_port(&doc), Some(8070));
    }

    #[test]
    fn port_missing_is_none() {
        assert_eq!(published_port(&yaml("services:\n  db: {}\n")), None);
    }

    #[test]
    fn project_from_volume_suffix() {
        let doc = yaml("volumes:\n  odoo_180_community_8069_1_postgres_data:\n  odoo_180_community_8069_1_odoo_data:\n");
        assert_eq!(
            project_name(&doc, Path::new("/tmp/whatever")),
            "odoo_180_community_8069_1"
        );
    }

    #[test]
    fn project_falls_back_to_directory_name() {
        let doc = yaml("services: {}\n");
        assert_eq!(
            project_name(&doc, Path::new("/nonexistent/odoo-18.0-community_2")),
            "odoo_18_0_community_2"
        );
    }

    #[test]
    fn inspect_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docker-compose.yml");
        std::fs::write(
            &path,
            "services:\n  odoo:\n    ports:\n      - 9000:8069\nvolumes:\n  p_odoo_data: null\n",
        )
        .expect("write");
        let info = inspect(&path).expect("inspect");
        assert_eq!(info.port, Some(9000));
        assert_eq!(info.project_name, "p");
    }
}
