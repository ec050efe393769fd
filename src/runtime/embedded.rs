use envspec_core::Schema;
use std::sync::OnceLock;

use crate::LookupError;

/// A finalized schema embedded in generated code as TOML text.
///
/// Parsing happens once, on first use. Generated server modules own one as
/// `SCHEMA` so secret lookups validate against exactly the schema they were
/// generated from.
pub struct EmbeddedSchema {
    source: &'static str,
    parsed: OnceLock<Result<Schema, String>>,
}

impl EmbeddedSchema {
    pub const fn new(source: &'static str) -> Self {
        Self {
            source,
            parsed: OnceLock::new(),
        }
    }

    pub fn schema(&self) -> Result<&Schema, LookupError> {
        self.parsed
            .get_or_init(|| Schema::from_toml_str(self.source).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| LookupError::Schema(e.clone()))
    }

    /// The serialized schema text.
    pub fn source(&self) -> &'static str {
        self.source
    }
}
