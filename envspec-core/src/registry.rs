//! Schema registry: merges declaring sources into one finalized schema.

use std::collections::HashMap;
use tracing::debug;

use crate::error::{EnvSpecError, Result, SchemaError, SchemaErrors};
use crate::field::{Access, Context, FieldDefinition};
use crate::validate::check_definition;

/// Collects field definitions from integrations and the user, in order.
///
/// Registering a name that already exists replaces the earlier definition
/// entirely, keeping its original position. Nothing is merged field by field.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    name: String,
    fields: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
    issues: Vec<SchemaError>,
    finalized: bool,
}

impl SchemaRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Registers one declaring source.
    pub fn register<I>(&mut self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = FieldDefinition>,
    {
        if self.finalized {
            return Err(EnvSpecError::SchemaAlreadyFinalized);
        }

        for def in source {
            match self.index.get(&def.name) {
                Some(&pos) => {
                    debug!("Field '{}' redefined by a later source", def.name);
                    self.fields[pos] = def;
                }
                None => {
                    self.index.insert(def.name.clone(), self.fields.len());
                    self.fields.push(def);
                }
            }
        }
        Ok(())
    }

    /// Records a problem found while reading a source, reported at finalize.
    pub fn report(&mut self, issues: impl IntoIterator<Item = SchemaError>) -> Result<()> {
        if self.finalized {
            return Err(EnvSpecError::SchemaAlreadyFinalized);
        }
        self.issues.extend(issues);
        Ok(())
    }

    /// Runs every shape check and produces the immutable schema.
    ///
    /// All problems across all fields are aggregated into one error.
    pub fn finalize(&mut self) -> Result<Schema> {
        if self.finalized {
            return Err(EnvSpecError::SchemaAlreadyFinalized);
        }
        self.finalized = true;

        let mut errors = std::mem::take(&mut self.issues);
        for def in &self.fields {
            errors.extend(check_definition(def));
        }
        if !errors.is_empty() {
            return Err(EnvSpecError::SchemaDefinition(SchemaErrors(errors)));
        }

        debug!(
            "Finalized schema '{}' with {} fields",
            self.name,
            self.fields.len()
        );
        Ok(Schema {
            name: std::mem::take(&mut self.name),
            fields: std::mem::take(&mut self.fields),
            index: std::mem::take(&mut self.index),
        })
    }
}

/// The finalized, read-only mapping of name to field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// The project name the schema was declared under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&pos| &self.fields[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields exposed to client code: client context and public access.
    pub fn client_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_client_visible())
    }

    /// Fields exposed to server code only.
    pub fn server_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.context == Context::Server)
    }

    pub fn public_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.access == Access::Public)
    }

    pub fn secret_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.access == Access::Secret)
    }

    /// FNV-1a fingerprint of the schema contents, used to detect changes.
    pub fn fingerprint(&self) -> String {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in format!("{}{:?}", self.name, self.fields).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        format!("{:016x}", hash)
    }
}
