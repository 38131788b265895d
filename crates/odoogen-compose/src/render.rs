//! Template rendering and the generated file set of an instance.
//!
//! Templates are embedded in the binary. A templates directory can override
//! them; it must then provide every file in [`REQUIRED_TEMPLATES`].

use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use odoogen_common::error::{OdoogenError, Result};
use odoogen_common::report::Reporter;

use crate::context::TemplateContext;

/// Compose file template.
pub const COMPOSE_TEMPLATE: &str = "docker-compose.yml.j2";
/// README template.
pub const README_TEMPLATE: &str = "README.md.j2";
/// Module listing helper template.
pub const LIST_MODULES_TEMPLATE: &str = "list_modules.py.j2";
/// `.gitignore` of the custom addons directory.
pub const GITIGNORE_TEMPLATE: &str = "custom-addons.gitignore.j2";

/// Every template an instance needs.
pub const REQUIRED_TEMPLATES: [&str; 4] = [
    COMPOSE_TEMPLATE,
    README_TEMPLATE,
    LIST_MODULES_TEMPLATE,
    GITIGNORE_TEMPLATE,
];

const EMBEDDED: [(&str, &str); 4] = [
    (COMPOSE_TEMPLATE, include_str!("../templates/docker-compose.yml.j2")),
    (README_TEMPLATE, include_str!("../templates/README.md.j2")),
    (LIST_MODULES_TEMPLATE, include_str!("../templates/list_modules.py.j2")),
    (GITIGNORE_TEMPLATE, include_str!("../templates/custom-addons.gitignore.j2")),
];

/// Name of the helper script written next to the compose file.
pub const LIST_MODULES_SCRIPT: &str = "list_modules.py";

/// Renders instance templates.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Uses the templates embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if an embedded template does not parse.
    pub fn embedded() -> Result<Self> {
        let mut env = base_environment();
        for (name, source) in EMBEDDED {
            env.add_template(name, source).map_err(|e| template_error(name, &e))?;
        }
        Ok(Self { env })
    }

    /// Loads templates from `dir`.
    ///
    /// # Errors
    ///
    /// Returns a template error naming every required file missing from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_TEMPLATES
            .into_iter()
            .filter(|name| !dir.join(name).is_file())
            .collect();
        if !missing.is_empty() {
            return Err(OdoogenError::Template {
                name: missing.join(", "),
                message: format!("missing from {}", dir.display()),
            });
        }
        let mut env = base_environment();
        env.set_loader(minijinja::path_loader(dir));
        tracing::debug!(dir = %dir.display(), "using template override directory");
        Ok(Self { env })
    }

    /// Uses `dir` when given, the embedded templates otherwise.
    ///
    /// # Errors
    ///
    /// See [`TemplateRenderer::embedded`] and [`TemplateRenderer::from_dir`].
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        dir.map_or_else(Self::embedded, Self::from_dir)
    }

    /// Renders one template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing, malformed or references a
    /// key the context does not provide.
    pub fn render(&self, name: &str, ctx: &TemplateContext) -> Result<String> {
        let template = self.env.get_template(name).map_err(|e| template_error(name, &e))?;
        template.render(ctx).map_err(|e| template_error(name, &e))
    }

    /// Renders the compose file and normalizes it through a YAML round trip.
    ///
    /// # Errors
    ///
    /// Returns a template error, or a YAML error if the output is not valid
    /// YAML.
    pub fn render_compose(&self, ctx: &TemplateContext) -> Result<String> {
        let rendered = self.render(COMPOSE_TEMPLATE, ctx)?;
        let document: serde_yaml::Value = serde_yaml::from_str(&rendered)?;
        Ok(serde_yaml::to_string(&document)?)
    }
}

fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}

fn template_error(name: &str, err: &minijinja::Error) -> OdoogenError {
    OdoogenError::Template {
        name: name.to_string(),
        message: err.to_string(),
    }
}

/// Files written for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFiles {
    /// `docker-compose.yml`
    pub compose: PathBuf,
    /// `README.md`
    pub readme: PathBuf,
    /// `.env`
    pub env_file: PathBuf,
    /// `custom-addons/.gitignore`, when it could be written.
    pub gitignore: Option<PathBuf>,
    /// Module listing helper, when it could be written.
    pub list_modules: Option<PathBuf>,
}

/// Renders and writes every file of an instance into `instance_dir`.
///
/// The compose file, README and `.env` are required. The `.gitignore` and
/// the helper script are best effort and only reported on failure.
///
/// # Errors
///
/// Returns an error if a required file cannot be rendered or written.
pub fn write_instance_files(
    renderer: &TemplateRenderer,
    instance_dir: &Path,
    ctx: &TemplateContext,
    reporter: &dyn Reporter,
) -> Result<RenderedFiles> {
    let compose = instance_dir.join("docker-compose.yml");
    write_file(&compose, &renderer.render_compose(ctx)?)?;

    let readme = instance_dir.join("README.md");
    write_file(&readme, &renderer.render(README_TEMPLATE, ctx)?)?;

    let env_file = write_env_file(instance_dir, &ctx.project_name)?;

    let gitignore_path = instance_dir.join("custom-addons").join(".gitignore");
    let gitignore = match renderer
        .render(GITIGNORE_TEMPLATE, ctx)
        .and_then(|content| write_file(&gitignore_path, &content))
    {
        Ok(()) => Some(gitignore_path),
        Err(e) => {
            reporter.info(&format!("Note: could not create custom-addons/.gitignore: {e}"));
            None
        }
    };

    let script_path = instance_dir.join(LIST_MODULES_SCRIPT);
    let list_modules = match renderer
        .render(LIST_MODULES_TEMPLATE, ctx)
        .and_then(|content| write_file(&script_path, &content))
        .and_then(|()| make_executable(&script_path))
    {
        Ok(()) => {
            reporter.info(&format!("Module listing script created: {}", script_path.display()));
            Some(script_path)
        }
        Err(e) => {
            reporter.info(&format!("Note: could not create the module listing script: {e}"));
            None
        }
    };

    tracing::info!(path = %compose.display(), "instance files written");
    Ok(RenderedFiles {
        compose,
        readme,
        env_file,
        gitignore,
        list_modules,
    })
}

/// Writes `.env` pinning the compose project name.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_env_file(instance_dir: &Path, project_name: &str) -> Result<PathBuf> {
    let path = instance_dir.join(".env");
    write_file(&path, &format!("COMPOSE_PROJECT_NAME={project_name}\n"))?;
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| OdoogenError::io(path, e))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| OdoogenError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use odoogen_common::report::MemoryReporter;

    use super::*;

    fn context() -> TemplateContext {
        TemplateContext {
            odoo_version: "18.0".into(),
            edition_name: "Enterprise".into(),
            is_enterprise: true,
            external_port: 8070,
            db_name: "odoo_18_0_enterprise_8070".into(),
            postgres_db: "postgres".into(),
            postgres_user: "odoo".into(),
            postgres_password: "odoo".into(),
            postgres_volume: "odoo_180_enterprise_8070_postgres_data".into(),
            odoo_volumes: vec![
                "odoo_180_enterprise_8070_odoo_data:/var/lib/odoo".into(),
                "./odoo-data/etc:/etc/odoo".into(),
                "./enterprise/odoo/addons:/mnt/enterprise-addons:rw".into(),
            ],
            odoo_command: "--config=/etc/odoo/odoo.conf".into(),
            volumes: BTreeMap::from([
                ("odoo_180_enterprise_8070_odoo_data".to_string(), None),
                ("odoo_180_enterprise_8070_postgres_data".to_string(), None),
            ]),
            enterprise_path: Some("./enterprise/odoo/addons".into()),
            project_name: "odoo_180_enterprise_8070".into(),
        }
    }

    #[test]
    fn compose_renders_valid_yaml() {
        let renderer = TemplateRenderer::embedded().expect("renderer");
        let yaml = renderer.render_compose(&context()).expect("render");
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("parse");

        let odoo = &doc["services"]["odoo"];
        assert_eq!(odoo["image"].as_str(), Some("odoo:18.0"));
        assert_eq!(odoo["ports"][0].as_str(), Some("8070:8069"));
        assert_eq!(odoo["volumes"].as_sequence().map(Vec::len), Some(3));
        assert!(doc["volumes"]
            .as_mapping()
            .is_some_and(|m| m.contains_key("odoo_180_enterprise_8070_odoo_data")));
    }

    #[test]
    fn readme_mentions_enterprise_path() {
        let renderer = TemplateRenderer::embedded().expect("renderer");
        let readme = renderer.render(README_TEMPLATE, &context()).expect("render");
        assert!(readme.starts_with("# Odoo 18.0 Enterprise"));
        assert!(readme.contains("./enterprise/odoo/addons"));
    }

    #[test]
    fn override_dir_must_hold_every_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(COMPOSE_TEMPLATE), "services: {}\n").expect("write");

        let err = TemplateRenderer::from_dir(dir.path()).err().expect("missing templates");
        let message = err.to_string();
        assert!(message.contains(README_TEMPLATE));
        assert!(message.contains(GITIGNORE_TEMPLATE));
        assert!(!message.contains(COMPOSE_TEMPLATE));
    }

    #[test]
    fn override_dir_templates_are_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in REQUIRED_TEMPLATES {
            std::fs::write(dir.path().join(name), "project: {{ project_name }}\n").expect("write");
        }
        let renderer = TemplateRenderer::from_dir(dir.path()).expect("renderer");
        let out = renderer.render_compose(&context()).expect("render");
        assert_eq!(out, "project: odoo_180_enterprise_8070\n");
    }

    #[test]
    fn malformed_compose_is_a_yaml_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in REQUIRED_TEMPLATES {
            std::fs::write(dir.path().join(name), "key: [unclosed\n").expect("write");
        }
        let renderer = TemplateRenderer::from_dir(dir.path()).expect("renderer");
        assert!(matches!(
            renderer.render_compose(&context()),
            Err(OdoogenError::Yaml { .. })
        ));
    }

    #[test]
    fn unknown_key_is_a_template_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in REQUIRED_TEMPLATES {
            std::fs::write(dir.path().join(name), "{{ no_such_key }}\n").expect("write");
        }
        let renderer = TemplateRenderer::from_dir(dir.path()).expect("renderer");
        assert!(matches!(
            renderer.render(README_TEMPLATE, &context()),
            Err(OdoogenError::Template { .. })
        ));
    }

    #[test]
    fn writes_the_full_file_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("custom-addons")).expect("mkdir");
        let renderer = TemplateRenderer::embedded().expect("renderer");
        let reporter = MemoryReporter::new();

        let files = write_instance_files(&renderer, dir.path(), &context(), &reporter).expect("write");

        assert_eq!(
            std::fs::read_to_string(&files.env_file).expect("env"),
            "COMPOSE_PROJECT_NAME=odoo_180_enterprise_8070\n"
        );
        assert!(files.readme.is_file());
        assert!(files.gitignore.is_some());
        let script = files.list_modules.expect("script");
        let content = std::fs::read_to_string(&script).expect("script");
        assert!(content.contains("DB_NAME = \"odoo_18_0_enterprise_8070\""));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&script).expect("meta").permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn missing_custom_addons_dir_is_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let renderer = TemplateRenderer::embedded().expect("renderer");
        let reporter = MemoryReporter::new();

        let files = write_instance_files(&renderer, dir.path(), &context(), &reporter).expect("write");

        assert!(files.gitignore.is_none());
        assert!(files.compose.is_file());
    }
}
