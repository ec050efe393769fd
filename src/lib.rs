//! envspec - Typed environment variables, public and secret, for every context
//!
//! Variables are declared once in `envspec.toml` with a type, a context
//! (`client` or `server`) and an access tier (`public` or `secret`):
//!
//! - public variables are validated and inlined as constants at build time;
//! - secret variables are resolved per request at runtime, through a resolver
//!   bound by the hosting adapter, and validated on the way out.
//!
//! Two modules are generated from the schema. `client` holds only public
//! client constants. `server` holds everything else and refuses to compile
//! into a client build.
//!
//! # Example
//!
//! ```ignore
//! envspec::define_env!("envspec.toml");
//!
//! fn main() -> Result<(), envspec::LookupError> {
//!     envspec::runtime::bind_resolver(|name| std::env::var(name).ok())?;
//!
//!     println!("Public URL: {}", client::API_URL);
//!     println!("Port: {}", server::api_port()?);
//!     Ok(())
//! }
//! ```
//!
//! Referencing a secret from the client surface fails to compile:
//!
//! ```compile_fail
//! envspec::define_env!(inline = r#"
//! [project]
//! name = "shop"
//! revision = "1.0"
//!
//! [env]
//! STRIPE_KEY = { type = "string", context = "server", access = "secret" }
//! "#);
//!
//! fn render() -> String {
//!     client::stripe_key().unwrap()
//! }
//! ```

// Internal modules
mod error;

pub mod build;
pub mod provider;
pub mod runtime;

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;

pub use envspec_core::{
    Access, Config, Constraint, Context, EnvSpecError, FieldDefinition, FieldType, GenerateOptions,
    InlinedValues, RawValues, Schema, SchemaRegistry, ValidationError, ValidationErrors, Value,
};

pub use error::{LookupError, Result};
pub use runtime::{EmbeddedSchema, RequestContext};

#[cfg(feature = "macros")]
pub use envspec_derive::define_env;

#[cfg(test)]
mod tests;
