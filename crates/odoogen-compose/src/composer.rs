//! Instance generation pipeline.
//!
//! [`InstanceComposer::compose`] checks preconditions, lays out the instance
//! directory, writes `odoo.conf`, resolves addon mounts (fetching the
//! enterprise archive when a token is given) and assembles the template
//! context. [`InstanceComposer::generate`] additionally renders the files.

use std::path::{Path, PathBuf};

use odoogen_archive::cache::ArchiveCache;
use odoogen_archive::fetch::{ArchiveFetcher, FetchOutcome};
use odoogen_common::config::GeneratorConfig;
use odoogen_common::error::{OdoogenError, Result};
use odoogen_common::report::{Level, Reporter};
use odoogen_common::types::{Edition, InstallMode, OdooVersion};

use crate::addons::{AddonPathResolver, MountSet};
use crate::context::TemplateContext;
use crate::naming::{InstanceNamer, InstanceNames};
use crate::odoo_conf;
use crate::render::{self, RenderedFiles, TemplateRenderer};

/// Subdirectories created in every instance.
pub const INSTANCE_SUBDIRS: [&str; 5] = [
    "odoo-data/addons",
    "odoo-data/etc",
    "odoo-data/filestore",
    "postgresql",
    "custom-addons",
];

/// Directory receiving the enterprise sources.
pub const ENTERPRISE_DIR: &str = "enterprise";

/// Inputs of one generation.
#[derive(Debug, Clone, Default)]
pub struct ComposeRequest {
    /// Version as typed by the user, normalized by the composer.
    pub version: String,
    /// Edition to deploy.
    pub edition: Edition,
    /// Host port exposed for HTTP.
    pub port: u16,
    /// Directory mounted over the custom addons.
    pub addons_path: Option<PathBuf>,
    /// Token for the enterprise archive download.
    pub enterprise_token: Option<String>,
    /// Database initialization mode.
    pub install_mode: InstallMode,
}

impl ComposeRequest {
    /// Enterprise needs either a token or an external addons path.
    ///
    /// # Errors
    ///
    /// Returns [`OdoogenError::Precondition`] when both are missing.
    pub fn validate(&self) -> Result<()> {
        let has_token = self.enterprise_token.as_deref().is_some_and(|t| !t.is_empty());
        if self.edition.is_enterprise() && !has_token && self.addons_path.is_none() {
            return Err(OdoogenError::Precondition {
                message: "the enterprise edition needs an enterprise token or an addons path".into(),
            });
        }
        Ok(())
    }
}

/// A composed instance, ready for rendering.
#[derive(Debug, Clone)]
pub struct ComposedInstance {
    /// Normalized version.
    pub version: OdooVersion,
    /// Edition.
    pub edition: Edition,
    /// Exposed port.
    pub port: u16,
    /// Database initialization mode.
    pub install_mode: InstallMode,
    /// Directory and derived resource names.
    pub names: InstanceNames,
    /// Written `odoo.conf`.
    pub odoo_conf: PathBuf,
    /// Result of the enterprise archive fetch, when one was attempted.
    pub enterprise_fetch: Option<FetchOutcome>,
    /// Template context.
    pub context: TemplateContext,
}

impl ComposedInstance {
    /// Instance directory.
    pub fn directory(&self) -> &Path {
        &self.names.directory
    }
}

/// A composed instance with its rendered files.
#[derive(Debug, Clone)]
pub struct GeneratedInstance {
    /// Composition result.
    pub instance: ComposedInstance,
    /// Files written into the instance directory.
    pub files: RenderedFiles,
}

/// Drives instance generation.
pub struct InstanceComposer<'a> {
    config: &'a GeneratorConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> InstanceComposer<'a> {
    /// Creates a composer.
    pub fn new(config: &'a GeneratorConfig, reporter: &'a dyn Reporter) -> Self {
        Self { config, reporter }
    }

    /// Composes and renders an instance.
    ///
    /// # Errors
    ///
    /// Fails on an unmet precondition, a filesystem error, or a template
    /// error. Enterprise fetch failures only produce warnings.
    pub fn generate(&self, request: &ComposeRequest) -> Result<GeneratedInstance> {
        request.validate()?;
        let renderer = TemplateRenderer::new(self.config.templates_dir.as_deref())?;
        let instance = self.compose(request)?;

        self.reporter.section("Generating files");
        let files = render::write_instance_files(&renderer, instance.directory(), &instance.context, self.reporter)?;
        self.reporter
            .success(&format!("Generated {}", files.compose.display()));
        self.reporter.info(&format!(
            "Docker volumes: {}",
            instance
                .context
                .volumes
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ));
        Ok(GeneratedInstance { instance, files })
    }

    /// Lays out the instance and builds its template context.
    ///
    /// # Errors
    ///
    /// Fails on an unmet precondition or a filesystem error.
    pub fn compose(&self, request: &ComposeRequest) -> Result<ComposedInstance> {
        request.validate()?;

        let version = OdooVersion::normalize(&request.version);
        if !version.is_release_number() {
            self.reporter.warning(&format!(
                "'{version}' does not look like an Odoo version, continuing anyway"
            ));
        }
        let edition = request.edition;

        let output_dir = &self.config.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|e| OdoogenError::io(output_dir, e))?;
        let names = InstanceNamer::new(output_dir).resolve(&version, edition, request.port);
        create_dir(&names.directory)?;
        self.reporter.section(&format!(
            "Odoo {version} {}",
            edition.display_name()
        ));
        self.reporter.message(
            Level::Odoo,
            &format!("New instance in {}", names.directory.display()),
        );
        tracing::info!(
            dir = %names.directory.display(),
            db = %names.database,
            project = %names.project,
            "instance named"
        );

        for sub in INSTANCE_SUBDIRS {
            create_dir(&names.directory.join(sub))?;
        }
        let odoo_conf = odoo_conf::write(
            &names.directory.join("odoo-data/etc"),
            edition,
            request.install_mode,
            &names.database,
        )?;

        let mut mounts = MountSet::base(&names.volumes.odoo);
        let (enterprise_path, enterprise_fetch) =
            self.resolve_addons(request, &version, &names.directory, &mut mounts)?;

        let context = TemplateContext::new(
            &version,
            edition,
            request.port,
            &names,
            &mounts,
            enterprise_path,
        );

        Ok(ComposedInstance {
            version,
            edition,
            port: request.port,
            install_mode: request.install_mode,
            names,
            odoo_conf,
            enterprise_fetch,
            context,
        })
    }

    fn resolve_addons(
        &self,
        request: &ComposeRequest,
        version: &OdooVersion,
        instance_dir: &Path,
        mounts: &mut MountSet,
    ) -> Result<(Option<String>, Option<FetchOutcome>)> {
        let resolver = AddonPathResolver::new(instance_dir, self.reporter);

        if !request.edition.is_enterprise() {
            if let Some(path) = &request.addons_path {
                let _ = resolver.mount_external(path, mounts);
            }
            return Ok((None, None));
        }

        let enterprise_dir = instance_dir.join(ENTERPRISE_DIR);
        create_dir(&enterprise_dir)?;
        mounts.set_enterprise_root();

        let mut enterprise_path = None;
        let mut fetch = None;
        if let Some(token) = request.enterprise_token.as_deref().filter(|t| !t.is_empty()) {
            let outcome = self.fetch_enterprise(version, token, &enterprise_dir);
            if outcome.is_success() {
                self.reporter.success(&format!(
                    "Enterprise modules extracted into {}",
                    enterprise_dir.display()
                ));
                enterprise_path = Some(resolver.mount_enterprise(&enterprise_dir, mounts));
            } else {
                self.reporter.warning("The enterprise download failed.");
            }
            fetch = Some(outcome);
        }

        match &request.addons_path {
            Some(path) => {
                let _ = resolver.mount_external(path, mounts);
            }
            None if enterprise_path.is_none() => {
                self.reporter.warning("No enterprise addons path configured!");
            }
            None => {}
        }
        Ok((enterprise_path, fetch))
    }

    fn fetch_enterprise(&self, version: &OdooVersion, token: &str, target: &Path) -> FetchOutcome {
        let fetcher = ArchiveCache::open(&self.config.cache_dir)
            .and_then(|cache| ArchiveFetcher::new(cache, self.config.archive_host.clone(), self.reporter));
        match fetcher {
            Ok(fetcher) => fetcher.fetch(version, token, target),
            Err(e) => {
                tracing::warn!(cache = %self.config.cache_dir.display(), error = %e, "enterprise fetch unavailable");
                self.reporter
                    .error(&format!("Cannot prepare the enterprise download: {e}"));
                FetchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| OdoogenError::io(path, e))
}
