//! Collision-free instance naming.
//!
//! The only non-deterministic input is the numeric suffix, chosen once by
//! probing the output directory in [`InstanceNamer::directory_for`]. Every
//! derived name takes that suffix as an explicit argument.

use std::path::PathBuf;

use odoogen_common::types::{Edition, OdooVersion};

/// Docker volume names of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeNames {
    /// Volume holding the Odoo filestore and sessions.
    pub odoo: String,
    /// Volume holding the PostgreSQL cluster.
    pub postgres: String,
}

/// Every identifier derived for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceNames {
    /// Instance directory, free at the time it was chosen.
    pub directory: PathBuf,
    /// Suffix appended to the directory name, if any.
    pub suffix: Option<u32>,
    /// Database name.
    pub database: String,
    /// Compose project name.
    pub project: String,
    /// Volume names derived from the project name.
    pub volumes: VolumeNames,
}

/// Chooses instance directories under an output directory.
#[derive(Debug, Clone)]
pub struct InstanceNamer {
    output_dir: PathBuf,
}

impl InstanceNamer {
    /// Creates a namer probing `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the first free directory named `odoo-{version}-{edition}`,
    /// appending `_1`, `_2`, ... while the name is taken.
    pub fn directory_for(&self, version: &OdooVersion, edition: Edition) -> (PathBuf, Option<u32>) {
        let base = format!("odoo-{version}-{edition}");
        let mut candidate = self.output_dir.join(&base);
        let mut suffix = None;
        let mut next = 1_u32;
        while candidate.exists() {
            candidate = self.output_dir.join(format!("{base}_{next}"));
            suffix = Some(next);
            next += 1;
        }
        tracing::debug!(path = %candidate.display(), ?suffix, "instance directory chosen");
        (candidate, suffix)
    }

    /// Chooses the directory and derives every name from it.
    pub fn resolve(&self, version: &OdooVersion, edition: Edition, port: u16) -> InstanceNames {
        let (directory, suffix) = self.directory_for(version, edition);
        let project = project_name(version, edition, port, suffix);
        InstanceNames {
            directory,
            suffix,
            database: database_name(version, edition, port, suffix),
            volumes: volume_names(&project),
            project,
        }
    }
}

/// `odoo_{version with '.' as '_'}_{edition}_{port}[_{suffix}]`.
pub fn database_name(version: &OdooVersion, edition: Edition, port: u16, suffix: Option<u32>) -> String {
    with_suffix(
        format!("odoo_{}_{edition}_{port}", version.as_str().replace('.', "_")),
        suffix,
    )
}

/// `odoo_{version without '.'}_{edition}_{port}[_{suffix}]`.
pub fn project_name(version: &OdooVersion, edition: Edition, port: u16, suffix: Option<u32>) -> String {
    with_suffix(
        format!("odoo_{}_{edition}_{port}", version.as_str().replace('.', "")),
        suffix,
    )
}

/// Derives the volume names of a compose project.
pub fn volume_names(project: &str) -> VolumeNames {
    VolumeNames {
        odoo: format!("{project}_odoo_data"),
        postgres: format!("{project}_postgres_data"),
    }
}

fn with_suffix(name: String, suffix: Option<u32>) -> String {
    match suffix {
        Some(n) => format!("{name}_{n}"),
        None => name,
    }
}
