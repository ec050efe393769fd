use super::Provider;
use crate::{LookupError, Result};
use std::env;
use url::Url;

/// Configuration for the environment variables provider.
///
/// The provider reads the process environment directly, so there is nothing
/// to configure.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {}

impl TryFrom<&Url> for EnvConfig {
    type Error = LookupError;

    fn try_from(url: &Url) -> std::result::Result<Self, Self::Error> {
        if url.scheme() != "env" {
            return Err(LookupError::InvalidProvider(format!(
                "Invalid scheme '{}' for env provider",
                url.scheme()
            )));
        }

        Ok(Self::default())
    }
}

/// Resolves variables from the process environment.
///
/// This is what the development fallback reads when no resolver is bound;
/// binding it explicitly makes a deployed server read its environment too.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProvider;

crate::register_provider! {
    EnvProvider from EnvConfig {
        name: "env",
        description: "Process environment variables",
        schemes: ["env"],
        examples: ["env://"],
    }
}

impl EnvProvider {
    /// `EnvConfig` carries no settings; it is accepted for the registry.
    pub fn new(_config: EnvConfig) -> Self {
        Self
    }
}

impl Provider for EnvProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Variables whose value is not valid UTF-8 are reported as absent.
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(env::var(name).ok())
    }
}
