//! Raw value sources available at build time.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

/// The dotenv files [`RawValues::from_dotenv_dir`] reads, lowest precedence
/// first. Paths are returned whether or not the files exist.
pub fn dotenv_family(dir: &Path, mode: Option<&str>) -> Vec<PathBuf> {
    let mut names = vec![".env".to_string(), ".env.local".to_string()];
    if let Some(mode) = mode {
        names.push(format!(".env.{}", mode));
        names.push(format!(".env.{}.local", mode));
    }
    names.into_iter().map(|name| dir.join(name)).collect()
}

/// A layered map of variable name to raw string.
///
/// Layers added later override earlier ones, so the usual order is
/// `.env` files, then the process environment, then explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct RawValues {
    values: HashMap<String, String>,
}

impl RawValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the `.env` family for `mode` from `dir`:
    /// `.env`, `.env.local`, `.env.{mode}`, `.env.{mode}.local`.
    ///
    /// Missing files are skipped.
    pub fn from_dotenv_dir(dir: &Path, mode: Option<&str>) -> Result<Self> {
        let mut raw = Self::new();
        for path in dotenv_family(dir, mode) {
            raw = raw.with_dotenv(&path)?;
        }
        Ok(raw)
    }

    /// Overlays the variables of one dotenv file, if it exists.
    pub fn with_dotenv(mut self, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(self);
        }
        debug!("Loading raw values from {}", path.display());
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            self.values.insert(key, value);
        }
        Ok(self)
    }

    /// Overlays the process environment. Non UTF-8 entries are skipped.
    pub fn with_process_env(mut self) -> Self {
        for (key, value) in env::vars_os() {
            if let (Ok(key), Ok(value)) = (key.into_string(), value.into_string()) {
                self.values.insert(key, value);
            }
        }
        self
    }

    /// Overlays explicit values, such as those given on the command line.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in overrides {
            self.values.insert(key.into(), value.into());
        }
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new().with_overrides(iter)
    }
}
