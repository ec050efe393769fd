#![allow(dead_code)]

use envspec::{Access, Config, Context, FieldDefinition, Schema, SchemaRegistry};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A shop project with one variable of each kind.
pub const SHOP_TOML: &str = r#"
[project]
name = "shop"
revision = "1.0"

[env]
SHOP_API_URL = { type = "string", context = "client", access = "public", url = true }
SHOP_LOG_LEVEL = { type = "enum", context = "server", access = "public", values = ["info", "debug"], default = "info" }
SHOP_API_PORT = { type = "number", context = "server", access = "secret", default = 7000, int = true }
SHOP_STRIPE_KEY = { type = "string", context = "server", access = "secret", starts_with = "sk_" }
"#;

/// Test helper for creating temporary directories with test configs
pub struct TestFixture {
    _temp_dir: TempDir,
    pub base_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_path,
        }
    }

    /// Writes `envspec.toml` and returns its path.
    pub fn write_schema(&self, content: &str) -> PathBuf {
        self.write_file("envspec.toml", content)
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.base_path.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn out_dir(&self) -> PathBuf {
        self.base_path.join("out")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn shop_schema() -> Schema {
    SHOP_TOML.parse::<Config>().unwrap().into_schema().unwrap()
}

/// A schema with a single required secret string.
pub fn session_schema() -> Schema {
    let mut registry = SchemaRegistry::new("sessions");
    registry
        .register([FieldDefinition::string(
            "SESSION_TOKEN",
            Context::Server,
            Access::Secret,
        )])
        .unwrap();
    registry.finalize().unwrap()
}
