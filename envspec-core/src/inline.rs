//! Build-time inlining of public variables.

use std::collections::HashMap;
use tracing::debug;

use crate::error::{EnvSpecError, Result, ValidationErrors};
use crate::field::Value;
use crate::registry::Schema;
use crate::sources::RawValues;
use crate::validate::{ResolvedValue, ValueOrigin, validate};

/// Literal values for every public field, ready to be substituted into
/// generated code. Secret fields never appear here.
#[derive(Debug, Clone, Default)]
pub struct InlinedValues {
    values: Vec<ResolvedValue>,
    index: HashMap<String, usize>,
}

impl InlinedValues {
    /// Resolves and validates every public field of `schema` from `raw`.
    ///
    /// Fails closed: if any public field is invalid, all failures are
    /// returned together and no values are produced.
    pub fn resolve(schema: &Schema, raw: &RawValues) -> Result<Self> {
        let mut inlined = Self::default();
        let mut errors = Vec::new();

        for def in schema.public_fields() {
            match validate(def, raw.get(&def.name)) {
                Ok(value) => {
                    inlined.index.insert(def.name.clone(), inlined.values.len());
                    inlined
                        .values
                        .push(ResolvedValue::new(def.name.clone(), value, ValueOrigin::Build));
                }
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(EnvSpecError::Validation(ValidationErrors(errors)));
        }

        debug!("Inlined {} public variables", inlined.values.len());
        Ok(inlined)
    }

    /// The resolved entry for `name`, if it is a public field.
    pub fn get(&self, name: &str) -> Option<&ResolvedValue> {
        self.index.get(name).map(|&pos| &self.values[pos])
    }

    /// The literal for `name`; `None` for unknown names and absent optionals.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(|r| r.value.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
