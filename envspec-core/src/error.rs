//! Error types shared by the schema, validation and generation phases

use std::fmt;
use thiserror::Error;

use crate::field::FieldType;

/// The main error type for build-time envspec operations
#[derive(Error, Debug)]
pub enum EnvSpecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Dotenv error: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "Unsupported envspec revision '{0}'. This version of envspec only supports revision '1.0'"
    )]
    UnsupportedRevision(String),
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),
    #[error("Invalid schema:\n{0}")]
    SchemaDefinition(SchemaErrors),
    #[error("Schema is already finalized; no further sources can be registered")]
    SchemaAlreadyFinalized,
    #[error("Invalid environment variables:\n{0}")]
    Validation(ValidationErrors),
    #[error("Access violation: {0}")]
    AccessViolation(String),
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// A type alias for `Result<T, EnvSpecError>`
pub type Result<T> = std::result::Result<T, EnvSpecError>;

/// A single problem with the shape of a field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub field: String,
    pub message: String,
}

impl SchemaError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every definition problem found while finalizing a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaErrors(pub Vec<SchemaError>);

impl SchemaErrors {
    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when some problem is reported for `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", err)?;
        }
        Ok(())
    }
}

/// A value failed to satisfy its field definition.
///
/// Messages never include the raw value, since it may belong to a secret.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{name} is required but not set")]
    MissingRequiredVariable { name: String },
    #[error("{name} is not a valid {expected}")]
    InvalidType { name: String, expected: FieldType },
    #[error("{name} violates `{constraint}`: {detail}")]
    ConstraintViolation {
        name: String,
        constraint: &'static str,
        detail: String,
    },
}

impl ValidationError {
    /// The name of the variable that failed.
    pub fn name(&self) -> &str {
        match self {
            ValidationError::MissingRequiredVariable { name }
            | ValidationError::InvalidType { name, .. }
            | ValidationError::ConstraintViolation { name, .. } => name,
        }
    }
}

/// Aggregated validation failures, one per variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", err)?;
        }
        Ok(())
    }
}
