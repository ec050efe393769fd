use super::Provider;
use crate::{LookupError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

/// Configuration for the dotenv provider.
///
/// `dotenv://` reads `.env` in the working directory, `dotenv://config/.env`
/// a relative path and `dotenv:///etc/app/.env` an absolute one.
#[derive(Debug, Clone)]
pub struct DotEnvConfig {
    pub path: PathBuf,
}

impl Default for DotEnvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".env"),
        }
    }
}

impl TryFrom<&Url> for DotEnvConfig {
    type Error = LookupError;

    fn try_from(url: &Url) -> std::result::Result<Self, Self::Error> {
        if url.scheme() != "dotenv" {
            return Err(LookupError::InvalidProvider(format!(
                "Invalid scheme '{}' for dotenv provider",
                url.scheme()
            )));
        }

        // The host part is the first component of a relative path.
        let path = format!("{}{}", url.host_str().unwrap_or(""), url.path());
        if path.is_empty() || path == "/" {
            return Ok(Self::default());
        }
        Ok(Self {
            path: PathBuf::from(path),
        })
    }
}

/// Resolves variables from one dotenv file.
///
/// The file is read on first lookup and cached; a missing file resolves
/// every name as absent.
pub struct DotEnvProvider {
    config: DotEnvConfig,
    vars: OnceLock<std::result::Result<HashMap<String, String>, String>>,
}

crate::register_provider! {
    DotEnvProvider from DotEnvConfig {
        name: "dotenv",
        description: "Reads a .env file",
        schemes: ["dotenv"],
        examples: ["dotenv://.env", "dotenv:///etc/app/.env"],
    }
}

impl DotEnvProvider {
    pub fn new(config: DotEnvConfig) -> Self {
        Self {
            config,
            vars: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    fn load(&self) -> std::result::Result<HashMap<String, String>, String> {
        let path = &self.config.path;
        if !path.exists() {
            debug!("Dotenv file {} not found", path.display());
            return Ok(HashMap::new());
        }

        debug!("Loading dotenv file {}", path.display());
        let mut vars = HashMap::new();
        let iter = dotenvy::from_path_iter(path).map_err(describe)?;
        for item in iter {
            let (key, value) = item.map_err(describe)?;
            vars.insert(key, value);
        }
        Ok(vars)
    }
}

/// Parse errors carry the offending line, which may hold a secret.
fn describe(err: dotenvy::Error) -> String {
    match err {
        dotenvy::Error::LineParse(_, index) => format!("parse error at index {}", index),
        other => other.to_string(),
    }
}

impl Provider for DotEnvProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn get(&self, name: &str) -> Result<Option<String>> {
        match self.vars.get_or_init(|| self.load()) {
            Ok(vars) => Ok(vars.get(name).cloned()),
            Err(message) => Err(LookupError::Backend {
                provider: Self::NAME.to_string(),
                message: format!("{}: {}", self.config.path.display(), message),
            }),
        }
    }
}
