//! Version-keyed store of downloaded enterprise archives.
//!
//! Entries are plain files named `odoo-enterprise-<version>.tar.gz`. They are
//! never invalidated: a present file is always a hit.

use std::path::{Path, PathBuf};

use odoogen_common::error::{OdoogenError, Result};
use odoogen_common::types::OdooVersion;

/// On-disk archive cache.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root: PathBuf,
}

impl ArchiveCache {
    /// Opens the cache at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| OdoogenError::io(&root, e))?;
        tracing::info!(path = %root.display(), "opened enterprise archive cache");
        Ok(Self { root })
    }

    /// Returns the cache file location for a version.
    #[must_use]
    pub fn path(&self, version: &OdooVersion) -> PathBuf {
        self.root.join(format!("odoo-enterprise-{version}.tar.gz"))
    }

    /// Returns the temporary file a download streams into before it is
    /// moved to [`ArchiveCache::path`].
    #[must_use]
    pub fn partial_path(&self, version: &OdooVersion) -> PathBuf {
        self.root.join(format!("odoo-enterprise-{version}.tar.gz.part"))
    }

    /// Checks whether an archive for `version` is cached.
    #[must_use]
    pub fn has(&self, version: &OdooVersion) -> bool {
        self.path(version).is_file()
    }

    /// Moves a completed download into place.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    pub fn commit(&self, version: &OdooVersion) -> Result<PathBuf> {
        let partial = self.partial_path(version);
        let target = self.path(version);
        std::fs::rename(&partial, &target).map_err(|e| OdoogenError::io(&target, e))?;
        Ok(target)
    }

    /// Returns the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
