//! # Providers
//!
//! A provider is the backing store behind a resolver binding: it maps a
//! variable name to its raw string value. The runtime never interprets what a
//! provider returns; every value is cast and validated against the schema
//! afterwards.
//!
//! Providers are either plain closures wrapped in [`FnProvider`], or built-in
//! providers created from a URI:
//!
//! ```text
//! env://
//! dotenv://.env.production
//! dotenv:///etc/shop/secrets.env
//! ```
//!
//! ## Example
//!
//! ```
//! use envspec::provider::Provider;
//!
//! let provider = Box::<dyn Provider>::try_from("env://").unwrap();
//! assert_eq!(provider.name(), "env");
//! ```

use crate::{LookupError, Result};
use std::convert::TryFrom;
use std::fmt;
use url::Url;

pub mod dotenv;
pub mod env;
pub mod registry;

#[cfg(test)]
pub(crate) mod tests;

pub use dotenv::{DotEnvConfig, DotEnvProvider};
pub use env::{EnvConfig, EnvProvider};

/// Information about a registered provider.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// The canonical name of the provider (e.g., "env", "dotenv").
    pub name: &'static str,
    /// A human-readable description of what the provider does.
    pub description: &'static str,
    /// Example URIs showing how to configure this provider.
    pub examples: &'static [&'static str],
}

impl ProviderInfo {
    /// Formats the provider information for display, including examples if available.
    ///
    /// ```ignore
    /// // "dotenv: Reads a .env file (e.g., dotenv://.env)"
    /// info.display_with_examples()
    /// ```
    pub fn display_with_examples(&self) -> String {
        if self.examples.is_empty() {
            format!("{}: {}", self.name, self.description)
        } else {
            format!(
                "{}: {} (e.g., {})",
                self.name,
                self.description,
                self.examples.join(", ")
            )
        }
    }
}

pub use registry::providers;

/// A backing store that maps a variable name to a raw value.
///
/// Providers must be `Send + Sync`: one binding may serve many requests on
/// many worker threads at once.
///
/// # Implementation Guidelines
///
/// - Return `Ok(None)` when the variable is absent, not an error.
/// - Report store failures as [`LookupError::Backend`]; never block forever,
///   the caller owns any timeout around the backing call.
/// - Never log values.
pub trait Provider: Send + Sync {
    /// Retrieves the raw value of `name`.
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// Returns the name of this provider.
    ///
    /// This should match the name registered with the provider macro.
    fn name(&self) -> &'static str;
}

/// Adapts a closure `Fn(&str) -> Option<String>` into a [`Provider`].
pub struct FnProvider<F> {
    resolve: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

impl<F> Provider for FnProvider<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok((self.resolve)(name))
    }

    fn name(&self) -> &'static str {
        "fn"
    }
}

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProvider")
    }
}

impl TryFrom<String> for Box<dyn Provider> {
    type Error = LookupError;

    fn try_from(s: String) -> Result<Self> {
        Self::try_from(s.as_str())
    }
}

impl TryFrom<&str> for Box<dyn Provider> {
    type Error = LookupError;

    /// Creates a provider from a URI or a bare provider name.
    ///
    /// `env`, `env:` and `env://` are equivalent; `dotenv:.env.local` is
    /// shorthand for `dotenv://.env.local`.
    fn try_from(s: &str) -> Result<Self> {
        let (scheme, rest) = match s.find(':') {
            Some(pos) => (&s[..pos], &s[pos + 1..]),
            None => (s, ""),
        };

        if registry::by_scheme(scheme).is_none() {
            return Err(LookupError::ProviderNotFound(scheme.to_string()));
        }

        let url_string = match rest {
            "" => format!("{}://", scheme),
            s if s.starts_with("//") => format!("{}:{}", scheme, s),
            s => format!("{}://{}", scheme, s),
        };

        let url = Url::parse(&url_string)
            .map_err(|e| LookupError::InvalidProvider(format!("'{}': {}", s, e)))?;

        Self::try_from(&url)
    }
}

impl TryFrom<&Url> for Box<dyn Provider> {
    type Error = LookupError;

    fn try_from(url: &Url) -> Result<Self> {
        let registration = registry::by_scheme(url.scheme())
            .ok_or_else(|| LookupError::ProviderNotFound(url.scheme().to_string()))?;

        (registration.open)(url)
    }
}
