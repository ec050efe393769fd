use envspec_core::{ValidationError, ValidationErrors};
use thiserror::Error;

/// Errors returned by runtime lookups and resolver registration.
///
/// A failed lookup only fails the caller that issued it. None of these
/// messages include a resolved value.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error(
        "No resolver configured for '{name}'. Bind a resolver at startup or run with ENVSPEC_MODE=development"
    )]
    NoResolverConfigured { name: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid secrets:\n{0}")]
    InvalidSecrets(ValidationErrors),
    #[error("Access violation: '{name}' cannot be resolved from client context")]
    AccessViolation { name: String },
    #[error("'{name}' cannot be read as {expected}")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("'{0}' is not a declared variable")]
    Undeclared(String),
    #[error("Provider '{provider}' failed: {message}")]
    Backend { provider: String, message: String },
    #[error("A process-wide resolver is already bound")]
    ResolverAlreadyBound,
    #[error("Adapter '{0}' is already registered")]
    AdapterAlreadyRegistered(String),
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),
    #[error("Invalid provider specification: {0}")]
    InvalidProvider(String),
    #[error("Embedded schema is invalid: {0}")]
    Schema(String),
}

/// A type alias for `Result<T, LookupError>`
pub type Result<T> = std::result::Result<T, LookupError>;
