//! Volume mounts of the Odoo service and addon path resolution.

use std::fmt;
use std::path::{Path, PathBuf};

use odoogen_common::constants::{
    MOUNT_CUSTOM_ADDONS, MOUNT_ENTERPRISE, MOUNT_ENTERPRISE_ADDONS, MOUNT_EXTRA_ADDONS,
    ODOO_CONFIG_DIR, ODOO_DATA_DIR,
};
use odoogen_common::report::Reporter;
use walkdir::WalkDir;

/// Module manifest file names, current and legacy.
pub const MANIFEST_FILES: [&str; 2] = ["__manifest__.py", "__openerp__.py"];

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    /// `ro`
    ReadOnly,
    /// `rw`
    ReadWrite,
}

impl MountMode {
    /// Compose short-syntax suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
        }
    }
}

/// One `host:container[:mode]` entry of the Odoo service volume list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonMount {
    /// Host path or named volume.
    pub host: String,
    /// Mount point inside the container.
    pub container: String,
    /// Access mode, omitted for named volumes.
    pub mode: Option<MountMode>,
}

impl AddonMount {
    /// Creates a mount entry.
    pub fn new(host: impl Into<String>, container: impl Into<String>, mode: Option<MountMode>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            mode,
        }
    }
}

impl fmt::Display for AddonMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)?;
        if let Some(mode) = self.mode {
            write!(f, ":{}", mode.as_str())?;
        }
        Ok(())
    }
}

/// Ordered volume list of the Odoo service.
///
/// Container mount points are unique: setting a mount whose container path is
/// already present replaces that entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountSet {
    mounts: Vec<AddonMount>,
}

impl MountSet {
    /// Default mounts of every instance: data volume, config, extra and
    /// custom addons.
    pub fn base(odoo_volume: &str) -> Self {
        Self {
            mounts: vec![
                AddonMount::new(odoo_volume, ODOO_DATA_DIR, None),
                AddonMount::new("./odoo-data/etc", ODOO_CONFIG_DIR, None),
                AddonMount::new("./odoo-data/addons", MOUNT_EXTRA_ADDONS, Some(MountMode::ReadWrite)),
                AddonMount::new("./custom-addons", MOUNT_CUSTOM_ADDONS, Some(MountMode::ReadWrite)),
            ],
        }
    }

    /// Replaces the mount at the same container path, or appends.
    pub fn set(&mut self, mount: AddonMount) {
        match self.mounts.iter_mut().find(|m| m.container == mount.container) {
            Some(existing) => *existing = mount,
            None => self.mounts.push(mount),
        }
    }

    /// Adds the read-only mount of the whole enterprise directory.
    pub fn set_enterprise_root(&mut self) {
        self.set(AddonMount::new(
            "./enterprise",
            MOUNT_ENTERPRISE,
            Some(MountMode::ReadOnly),
        ));
    }

    /// Points the enterprise addons mount at `host`.
    pub fn set_enterprise_addons(&mut self, host: impl Into<String>) {
        self.set(AddonMount::new(
            host,
            MOUNT_ENTERPRISE_ADDONS,
            Some(MountMode::ReadWrite),
        ));
    }

    /// Returns the mount at `container`, if any.
    pub fn get(&self, container: &str) -> Option<&AddonMount> {
        self.mounts.iter().find(|m| m.container == container)
    }

    /// Returns the mounts in order.
    pub fn as_slice(&self) -> &[AddonMount] {
        &self.mounts
    }

    /// Renders every mount in compose short syntax.
    pub fn to_strings(&self) -> Vec<String> {
        self.mounts.iter().map(ToString::to_string).collect()
    }
}

/// Where the addons of an extracted tree were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddonLayout {
    /// `<root>/odoo/addons` exists.
    OdooAddons(PathBuf),
    /// Modules with manifests sit directly under the root.
    ModulesAtRoot(PathBuf),
    /// First directory named `addons` below the root.
    NestedAddons(PathBuf),
    /// Nothing recognizable; the root is used as is.
    Unrecognized(PathBuf),
}

impl AddonLayout {
    /// Directory to mount.
    pub fn path(&self) -> &Path {
        match self {
            Self::OdooAddons(p) | Self::ModulesAtRoot(p) | Self::NestedAddons(p) | Self::Unrecognized(p) => p,
        }
    }
}

/// Detects the addon layout of `root`, trying in order `odoo/addons`,
/// manifests one level down, any nested `addons` directory, then the root.
///
/// Nested candidates are visited depth-first in file-name order, so the
/// choice among several `addons` directories is stable across runs.
pub fn detect_layout(root: &Path) -> AddonLayout {
    let odoo_addons = root.join("odoo").join("addons");
    if odoo_addons.is_dir() {
        return AddonLayout::OdooAddons(odoo_addons);
    }
    if has_modules_at_root(root) {
        return AddonLayout::ModulesAtRoot(root.to_path_buf());
    }
    let nested = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_dir() && e.file_name() == "addons");
    match nested {
        Some(entry) => AddonLayout::NestedAddons(entry.into_path()),
        None => AddonLayout::Unrecognized(root.to_path_buf()),
    }
}

fn has_modules_at_root(root: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(root) else {
        return false;
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .any(|e| MANIFEST_FILES.iter().any(|m| e.path().join(m).is_file()))
}

/// Resolves addon mounts for one instance directory.
pub struct AddonPathResolver<'a> {
    instance_dir: &'a Path,
    reporter: &'a dyn Reporter,
}

impl<'a> AddonPathResolver<'a> {
    /// Creates a resolver for mounts relative to `instance_dir`.
    pub fn new(instance_dir: &'a Path, reporter: &'a dyn Reporter) -> Self {
        Self {
            instance_dir,
            reporter,
        }
    }

    /// Mounts the addons found under an extracted enterprise tree and
    /// returns the host path used, relative to the instance directory.
    pub fn mount_enterprise(&self, enterprise_dir: &Path, mounts: &mut MountSet) -> String {
        let layout = detect_layout(enterprise_dir);
        let host = self.relative_host(layout.path());
        match &layout {
            AddonLayout::OdooAddons(path) => self
                .reporter
                .success(&format!("Enterprise modules found in {}", path.display())),
            AddonLayout::ModulesAtRoot(path) => self
                .reporter
                .success(&format!("Enterprise modules found directly in {}", path.display())),
            AddonLayout::NestedAddons(_) => self
                .reporter
                .info(&format!("Addons directory found at {host}")),
            AddonLayout::Unrecognized(_) => self
                .reporter
                .warning("No addons directory found in the enterprise archive, mounting it whole"),
        }
        tracing::info!(?layout, host = %host, "enterprise addons mount resolved");
        mounts.set_enterprise_addons(host.clone());
        host
    }

    /// Mounts an external addons directory over the custom addons mount.
    ///
    /// Returns `false`, leaving `mounts` untouched, when `path` is not a
    /// directory.
    pub fn mount_external(&self, path: &Path, mounts: &mut MountSet) -> bool {
        if !path.is_dir() {
            self.reporter.warning(&format!(
                "External addons path '{}' does not exist",
                path.display()
            ));
            return false;
        }
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        mounts.set(AddonMount::new(
            absolute.display().to_string(),
            MOUNT_CUSTOM_ADDONS,
            Some(MountMode::ReadWrite),
        ));
        self.reporter
            .success(&format!("External addons mounted from {}", absolute.display()));
        true
    }

    fn relative_host(&self, path: &Path) -> String {
        match path.strip_prefix(self.instance_dir) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => format!("./{}", rel.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use odoogen_common::report::{Level, MemoryReporter};

    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, b"{}").expect("write");
    }

    #[test]
    fn base_mounts_in_order() {
        let mounts = MountSet::base("proj_odoo_data");
        assert_eq!(
            mounts.to_strings(),
            vec![
                "proj_odoo_data:/var/lib/odoo",
                "./odoo-data/etc:/etc/odoo",
                "./odoo-data/addons:/mnt/extra-addons:rw",
                "./custom-addons:/mnt/custom-addons:rw",
            ]
        );
    }

    #[test]
    fn set_replaces_by_container_path() {
        let mut mounts = MountSet::base("v");
        mounts.set_enterprise_addons("./enterprise");
        mounts.set_enterprise_addons("./enterprise/odoo/addons");
        let enterprise: Vec<_> = mounts
            .as_slice()
            .iter()
            .filter(|m| m.container == MOUNT_ENTERPRISE_ADDONS)
            .collect();
        assert_eq!(enterprise.len(), 1);
        assert_eq!(enterprise[0].host, "./enterprise/odoo/addons");
    }

    #[test]
    fn odoo_addons_wins_over_other_layouts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("odoo/addons")).expect("mkdir");
        touch(&root.join("sale_custom/__manifest__.py"));
        std::fs::create_dir_all(root.join("vendor/addons")).expect("mkdir");

        assert_eq!(detect_layout(root), AddonLayout::OdooAddons(root.join("odoo/addons")));
    }

    #[test]
    fn manifests_at_root_mount_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        touch(&root.join("web_studio/__manifest__.py"));
        std::fs::create_dir_all(root.join("vendor/addons")).expect("mkdir");

        assert_eq!(detect_layout(root), AddonLayout::ModulesAtRoot(root.to_path_buf()));
    }

    #[test]
    fn legacy_manifest_is_recognized() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("old_module/__openerp__.py"));
        assert!(matches!(detect_layout(dir.path()), AddonLayout::ModulesAtRoot(_)));
    }

    #[test]
    fn nested_addons_pick_first_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("b/addons")).expect("mkdir");
        std::fs::create_dir_all(root.join("a/deep/addons")).expect("mkdir");

        assert_eq!(
            detect_layout(root),
            AddonLayout::NestedAddons(root.join("a/deep/addons"))
        );
    }

    #[test]
    fn unrecognized_layout_falls_back_to_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("docs")).expect("mkdir");
        assert_eq!(
            detect_layout(dir.path()),
            AddonLayout::Unrecognized(dir.path().to_path_buf())
        );
    }

    #[test]
    fn mount_enterprise_uses_relative_host_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let instance = dir.path();
        let enterprise = instance.join("enterprise");
        std::fs::create_dir_all(enterprise.join("odoo/addons")).expect("mkdir");

        let reporter = MemoryReporter::new();
        let resolver = AddonPathResolver::new(instance, &reporter);
        let mut mounts = MountSet::base("v");
        let host = resolver.mount_enterprise(&enterprise, &mut mounts);

        assert_eq!(host, "./enterprise/odoo/addons");
        assert_eq!(
            mounts.get(MOUNT_ENTERPRISE_ADDONS).map(ToString::to_string).as_deref(),
            Some("./enterprise/odoo/addons:/mnt/enterprise-addons:rw")
        );
    }

    #[test]
    fn mount_enterprise_warns_on_unrecognized_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let enterprise = dir.path().join("enterprise");
        std::fs::create_dir_all(&enterprise).expect("mkdir");

        let reporter = MemoryReporter::new();
        let resolver = AddonPathResolver::new(dir.path(), &reporter);
        let mut mounts = MountSet::base("v");
        let host = resolver.mount_enterprise(&enterprise, &mut mounts);

        assert_eq!(host, "./enterprise");
        assert_eq!(reporter.at(Level::Warning).len(), 1);
    }

    #[test]
    fn external_path_replaces_custom_addons() {
        let dir = tempfile::tempdir().expect("tempdir");
        let external = dir.path().join("my-addons");
        std::fs::create_dir_all(&external).expect("mkdir");

        let reporter = MemoryReporter::new();
        let resolver = AddonPathResolver::new(dir.path(), &reporter);
        let mut mounts = MountSet::base("v");
        assert!(resolver.mount_external(&external, &mut mounts));

        let custom: Vec<_> = mounts
            .as_slice()
            .iter()
            .filter(|m| m.container == MOUNT_CUSTOM_ADDONS)
            .collect();
        assert_eq!(custom.len(), 1);
        let expected = std::fs::canonicalize(&external).expect("canonicalize");
        assert_eq!(custom[0].host, expected.display().to_string());
        assert_eq!(mounts.as_slice().len(), 4);
    }

    #[test]
    fn external_path_is_appended_when_no_default_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = MemoryReporter::new();
        let resolver = AddonPathResolver::new(dir.path(), &reporter);
        let mut mounts = MountSet::default();
        assert!(resolver.mount_external(dir.path(), &mut mounts));
        assert_eq!(mounts.as_slice().len(), 1);
    }

    #[test]
    fn missing_external_path_warns_and_adds_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = MemoryReporter::new();
        let resolver = AddonPathResolver::new(dir.path(), &reporter);
        let mut mounts = MountSet::base("v");
        let before = mounts.clone();

        assert!(!resolver.mount_external(&dir.path().join("missing"), &mut mounts));
        assert_eq!(mounts, before);
        assert_eq!(reporter.at(Level::Warning).len(), 1);
    }
}
