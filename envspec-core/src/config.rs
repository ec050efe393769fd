//! # envspec Configuration Files
//!
//! An `envspec.toml` file declares a project's environment variables:
//!
//! ```toml
//! [project]
//! name = "shop"
//! revision = "1.0"
//! extends = ["../shared"]  # Optional, registered before this file
//!
//! [env]
//! API_URL = { type = "string", context = "client", access = "public", url = true }
//! STRIPE_KEY = { type = "string", context = "server", access = "secret", starts_with = "sk_" }
//! ```
//!
//! Extended projects act as earlier declaring sources: they are registered
//! first, in list order, so the extending file wins for any name it redeclares.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::{EnvSpecError, Result};
use crate::field::FieldDefinition;
use crate::registry::{Schema, SchemaRegistry};

/// The conventional file name of a project schema.
pub const MANIFEST: &str = "envspec.toml";

/// The root structure of an `envspec.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata including name, revision, and optional inheritance
    pub project: Project,
    /// Variable declarations, in file order
    #[serde(default)]
    pub env: toml::Table,
}

/// Project metadata and inheritance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Configuration format revision (currently must be "1.0")
    pub revision: String,
    /// Optional list of relative paths to other envspec projects to inherit from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<Vec<String>>,
}

impl Config {
    /// Loads `path`, its extended projects, and finalizes the merged schema.
    pub fn load(path: &Path) -> Result<Schema> {
        let root = Self::read(path)?;
        let mut registry = SchemaRegistry::new(root.project.name.clone());
        let mut chain = HashSet::new();
        Self::register_path(path, &mut registry, &mut chain)?;
        registry.finalize()
    }

    /// Every schema file [`Config::load`] reads for `path`: the file itself
    /// and each file reached through `extends`, in registration order.
    pub fn sources(path: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut chain = HashSet::new();
        Self::collect_sources(path, &mut files, &mut chain)?;
        Ok(files)
    }

    fn collect_sources(
        path: &Path,
        files: &mut Vec<PathBuf>,
        chain: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let canonical = path.canonicalize()?;
        if !chain.insert(canonical.clone()) {
            return Err(EnvSpecError::CircularDependency(format!(
                "Configuration file {} is part of a circular dependency chain",
                canonical.display()
            )));
        }

        let config = Self::read(path)?;
        let base_dir = canonical.parent().unwrap_or(Path::new("."));
        for extend in config.project.extends.iter().flatten() {
            Self::collect_sources(&base_dir.join(extend).join(MANIFEST), files, chain)?;
        }
        if !files.contains(&canonical) {
            files.push(canonical.clone());
        }

        chain.remove(&canonical);
        Ok(())
    }

    /// Finalizes a schema from this file alone. `extends` is not followed
    /// since there is no base path to resolve it from.
    pub fn into_schema(self) -> Result<Schema> {
        let mut registry = SchemaRegistry::new(self.project.name.clone());
        self.register_into(&mut registry)?;
        registry.finalize()
    }

    /// Parses every declaration and registers it as one source.
    ///
    /// Malformed declarations are reported to the registry so they show up in
    /// the aggregated finalize error.
    pub fn register_into(&self, registry: &mut SchemaRegistry) -> Result<()> {
        let mut fields = Vec::new();
        let mut issues = Vec::new();

        for (name, value) in &self.env {
            match value.as_table() {
                Some(table) => match FieldDefinition::from_toml(name, table) {
                    Ok(def) => fields.push(def),
                    Err(errs) => issues.extend(errs),
                },
                None => issues.push(crate::error::SchemaError::new(
                    name.clone(),
                    "declaration must be a table",
                )),
            }
        }

        debug!(
            "Registering {} fields from project '{}'",
            fields.len(),
            self.project.name
        );
        registry.report(issues)?;
        registry.register(fields)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            io::Error::new(e.kind(), format!("Failed to read {}: {}", path.display(), e))
        })?;
        content.parse()
    }

    fn register_path(
        path: &Path,
        registry: &mut SchemaRegistry,
        chain: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let canonical = path.canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to resolve path {}: {}", path.display(), e),
            )
        })?;

        if !chain.insert(canonical.clone()) {
            return Err(EnvSpecError::CircularDependency(format!(
                "Configuration file {} is part of a circular dependency chain",
                canonical.display()
            )));
        }

        let config = Self::read(path)?;
        if let Some(extends) = &config.project.extends {
            let base_dir = canonical.parent().unwrap_or(Path::new("."));
            for extend in extends {
                let extended = base_dir.join(extend).join(MANIFEST);
                if !extended.exists() {
                    return Err(EnvSpecError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Extended config file not found: {}", extended.display()),
                    )));
                }
                Self::register_path(&extended, registry, chain)?;
            }
        }
        config.register_into(registry)?;

        chain.remove(&canonical);
        Ok(())
    }
}

impl FromStr for Config {
    type Err = EnvSpecError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        if config.project.revision != "1.0" {
            return Err(EnvSpecError::UnsupportedRevision(config.project.revision));
        }
        Ok(config)
    }
}

impl Schema {
    /// Parses a serialized schema, as produced by [`Schema::to_toml_string`].
    pub fn from_toml_str(s: &str) -> Result<Schema> {
        s.parse::<Config>()?.into_schema()
    }

    /// Serializes the finalized schema in `envspec.toml` form, without `extends`.
    pub fn to_toml_string(&self) -> Result<String> {
        let mut env = toml::Table::new();
        for def in self.fields() {
            env.insert(def.name.clone(), toml::Value::Table(def.to_toml()));
        }
        let config = Config {
            project: Project {
                name: self.name().to_string(),
                revision: "1.0".to_string(),
                extends: None,
            },
            env,
        };
        Ok(toml::to_string(&config)?)
    }
}

/// Global user configuration for envspec.
///
/// Stored in the user's config directory; provides defaults for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    #[serde(default)]
    pub defaults: GlobalDefaults,
}

/// Default settings in the global configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlobalDefaults {
    /// Provider URI used by `envspec get` when none is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Mode used to pick `.env.{mode}` files when none is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl GlobalConfig {
    /// Gets the path to the global configuration file,
    /// typically `~/.config/envspec/config.toml` on Unix systems.
    pub fn path() -> std::result::Result<PathBuf, io::Error> {
        use directories::ProjectDirs;
        let dirs = ProjectDirs::from("", "", "envspec").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Loads the global user configuration, or `None` if it doesn't exist.
    pub fn load() -> Result<Option<Self>> {
        let config_path = Self::path()?;
        if !config_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&config_path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// Saves the global configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::path()?;

        // Ensure the parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }
}
