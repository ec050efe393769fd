//! # envspec Core
//!
//! The build-time half of envspec: the data model for declared environment
//! variables, the field validator, the schema registry, `envspec.toml`
//! parsing, inlining of public values and generation of the typed accessor
//! modules.
//!
//! Data flows in one direction:
//!
//! ```text
//! envspec.toml + integrations ──► SchemaRegistry ──► Schema
//!                                                      │
//!               RawValues ──► InlinedValues ◄──────────┤
//!                                   │                  │
//!                                   └──► codegen ◄─────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use envspec_core::{Access, Context, FieldDefinition, InlinedValues, RawValues, SchemaRegistry};
//!
//! let mut registry = SchemaRegistry::new("shop");
//! registry
//!     .register([
//!         FieldDefinition::string("API_URL", Context::Client, Access::Public),
//!         FieldDefinition::number("API_PORT", Context::Server, Access::Secret).with_default(7000.0),
//!     ])
//!     .unwrap();
//! let schema = registry.finalize().unwrap();
//!
//! let raw: RawValues = [("API_URL", "https://shop.example")].into_iter().collect();
//! let inlined = InlinedValues::resolve(&schema, &raw).unwrap();
//! assert_eq!(inlined.value("API_URL").and_then(|v| v.as_str()), Some("https://shop.example"));
//! assert!(inlined.get("API_PORT").is_none());
//! ```

pub mod codegen;
pub mod config;
mod error;
pub mod field;
mod inline;
mod registry;
mod sources;
pub mod validate;

pub use codegen::{Declaration, Declarations, GenerateOptions, Generated, generate};
pub use config::{Config, GlobalConfig, GlobalDefaults, MANIFEST, Project};
pub use error::{
    EnvSpecError, Result, SchemaError, SchemaErrors, ValidationError, ValidationErrors,
};
pub use field::{Access, Constraint, Context, FieldDefinition, FieldType, Value};
pub use inline::InlinedValues;
pub use registry::{Schema, SchemaRegistry};
pub use sources::{RawValues, dotenv_family};
pub use validate::{ResolvedValue, ValueOrigin, validate};
