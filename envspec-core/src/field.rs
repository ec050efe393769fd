//! Field definitions: the declared shape of one environment variable.
//!
//! A field is declared in `envspec.toml` as an inline table under `[env]`:
//!
//! ```toml
//! [env]
//! API_URL  = { type = "string", context = "client", access = "public", url = true }
//! API_PORT = { type = "number", context = "server", access = "secret", default = 7000, int = true }
//! ```
//!
//! Constraint keys are kept in the order they are written; the validator
//! checks them in that order and reports the first one violated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchemaError;

/// The declared type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Enum,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Enum => "enum",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "enum" => Some(FieldType::Enum),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the value of a variable may be referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Client,
    Server,
}

impl Context {
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Client => "client",
            Context::Server => "server",
        }
    }
}

/// When the value of a variable is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Validated and inlined at build time.
    Public,
    /// Resolved per request at runtime, never embedded in build output.
    Secret,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Secret => "secret",
        }
    }
}

/// A typed value produced by casting a raw string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    /// A number whose field carries the `int` constraint.
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn to_toml(&self) -> toml::Value {
        match self {
            Value::String(s) => toml::Value::String(s.clone()),
            Value::Number(n) => toml::Value::Float(*n),
            Value::Integer(i) => toml::Value::Integer(*i),
            Value::Boolean(b) => toml::Value::Boolean(*b),
        }
    }
}

/// Renders the canonical string form, which casts back to an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// A per-type constraint on a field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    MinLength(usize),
    MaxLength(usize),
    Length(usize),
    Url,
    Includes(String),
    StartsWith(String),
    EndsWith(String),
    /// Exclusive minimum.
    Gt(f64),
    Min(f64),
    /// Exclusive maximum.
    Lt(f64),
    Max(f64),
    Int,
}

impl Constraint {
    /// The key used for this constraint in `envspec.toml` and in error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Length(_) => "length",
            Constraint::Url => "url",
            Constraint::Includes(_) => "includes",
            Constraint::StartsWith(_) => "starts_with",
            Constraint::EndsWith(_) => "ends_with",
            Constraint::Gt(_) => "gt",
            Constraint::Min(_) => "min",
            Constraint::Lt(_) => "lt",
            Constraint::Max(_) => "max",
            Constraint::Int => "int",
        }
    }

    /// The field type this constraint may be attached to.
    pub fn applies_to(&self) -> FieldType {
        match self {
            Constraint::MinLength(_)
            | Constraint::MaxLength(_)
            | Constraint::Length(_)
            | Constraint::Url
            | Constraint::Includes(_)
            | Constraint::StartsWith(_)
            | Constraint::EndsWith(_) => FieldType::String,
            Constraint::Gt(_)
            | Constraint::Min(_)
            | Constraint::Lt(_)
            | Constraint::Max(_)
            | Constraint::Int => FieldType::Number,
        }
    }

    fn to_toml(&self) -> toml::Value {
        match self {
            Constraint::MinLength(n) | Constraint::MaxLength(n) | Constraint::Length(n) => {
                toml::Value::Integer(*n as i64)
            }
            Constraint::Url | Constraint::Int => toml::Value::Boolean(true),
            Constraint::Includes(s) | Constraint::StartsWith(s) | Constraint::EndsWith(s) => {
                toml::Value::String(s.clone())
            }
            Constraint::Gt(n) | Constraint::Min(n) | Constraint::Lt(n) | Constraint::Max(n) => {
                toml::Value::Float(*n)
            }
        }
    }

    fn from_toml(key: &str, value: &toml::Value) -> Option<Result<Option<Self>, String>> {
        let length = |v: &toml::Value| match v {
            toml::Value::Integer(n) if *n >= 0 => Ok(*n as usize),
            _ => Err(format!("`{}` must be a non-negative integer", key)),
        };
        let text = |v: &toml::Value| match v {
            toml::Value::String(s) => Ok(s.clone()),
            _ => Err(format!("`{}` must be a string", key)),
        };
        let number = |v: &toml::Value| match v {
            toml::Value::Integer(n) => Ok(*n as f64),
            toml::Value::Float(n) if n.is_finite() => Ok(*n),
            _ => Err(format!("`{}` must be a finite number", key)),
        };
        // `url = false` and `int = false` are accepted and mean "no constraint".
        let flag = |v: &toml::Value, c: Constraint| match v {
            toml::Value::Boolean(true) => Ok(Some(c)),
            toml::Value::Boolean(false) => Ok(None),
            _ => Err(format!("`{}` must be a boolean", key)),
        };

        let parsed = match key {
            "min_length" => length(value).map(|n| Some(Constraint::MinLength(n))),
            "max_length" => length(value).map(|n| Some(Constraint::MaxLength(n))),
            "length" => length(value).map(|n| Some(Constraint::Length(n))),
            "url" => flag(value, Constraint::Url),
            "includes" => text(value).map(|s| Some(Constraint::Includes(s))),
            "starts_with" => text(value).map(|s| Some(Constraint::StartsWith(s))),
            "ends_with" => text(value).map(|s| Some(Constraint::EndsWith(s))),
            "gt" => number(value).map(|n| Some(Constraint::Gt(n))),
            "min" => number(value).map(|n| Some(Constraint::Min(n))),
            "lt" => number(value).map(|n| Some(Constraint::Lt(n))),
            "max" => number(value).map(|n| Some(Constraint::Max(n))),
            "int" => flag(value, Constraint::Int),
            _ => return None,
        };
        Some(parsed)
    }
}

/// One declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldType,
    pub context: Context,
    pub access: Access,
    pub optional: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Constraints in declaration order.
    pub constraints: Vec<Constraint>,
    /// Allowed values of an enum field, in declaration order.
    pub values: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldType, context: Context, access: Access) -> Self {
        Self {
            name: name.into(),
            kind,
            context,
            access,
            optional: false,
            default: None,
            description: None,
            constraints: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, context: Context, access: Access) -> Self {
        Self::new(name, FieldType::String, context, access)
    }

    pub fn number(name: impl Into<String>, context: Context, access: Access) -> Self {
        Self::new(name, FieldType::Number, context, access)
    }

    pub fn boolean(name: impl Into<String>, context: Context, access: Access) -> Self {
        Self::new(name, FieldType::Boolean, context, access)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, context: Context, access: Access, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut def = Self::new(name, FieldType::Enum, context, access);
        def.values = values.into_iter().map(Into::into).collect();
        def
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// A field is required unless it is optional or carries a default.
    pub fn required(&self) -> bool {
        !self.optional && self.default.is_none()
    }

    /// Whether the cast value is an integer rather than a float.
    pub fn is_integer(&self) -> bool {
        self.kind == FieldType::Number && self.constraints.contains(&Constraint::Int)
    }

    /// Whether the field appears on the client surface.
    pub fn is_client_visible(&self) -> bool {
        self.context == Context::Client && self.access == Access::Public
    }

    /// Parses the inline table declared for `name`.
    ///
    /// Every problem found in the table is returned, not only the first.
    pub fn from_toml(name: &str, table: &toml::Table) -> Result<Self, Vec<SchemaError>> {
        let mut errors = Vec::new();
        let mut err = |msg: String| errors.push(SchemaError::new(name, msg));

        let kind = match table.get("type") {
            Some(toml::Value::String(s)) => FieldType::parse(s).or_else(|| {
                err(format!(
                    "unknown type '{}' (expected string, number, boolean or enum)",
                    s
                ));
                None
            }),
            Some(_) => {
                err("`type` must be a string".into());
                None
            }
            None => {
                err("missing `type`".into());
                None
            }
        };

        let context = match table.get("context").and_then(|v| v.as_str()) {
            Some("client") => Some(Context::Client),
            Some("server") => Some(Context::Server),
            Some(other) => {
                err(format!("unknown context '{}' (expected client or server)", other));
                None
            }
            None => {
                err("missing or invalid `context`".into());
                None
            }
        };

        let access = match table.get("access").and_then(|v| v.as_str()) {
            Some("public") => Some(Access::Public),
            Some("secret") => Some(Access::Secret),
            Some(other) => {
                err(format!("unknown access '{}' (expected public or secret)", other));
                None
            }
            None => {
                err("missing or invalid `access`".into());
                None
            }
        };

        let mut optional = false;
        let mut description = None;
        let mut values = Vec::new();
        let mut constraints = Vec::new();

        for (key, value) in table {
            match key.as_str() {
                "type" | "context" | "access" | "default" => {}
                "optional" => match value {
                    toml::Value::Boolean(b) => optional = *b,
                    _ => err("`optional` must be a boolean".into()),
                },
                "description" => match value {
                    toml::Value::String(s) => description = Some(s.clone()),
                    _ => err("`description` must be a string".into()),
                },
                "values" => match value.as_array() {
                    Some(items) if items.iter().all(|v| v.is_str()) => {
                        values = items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect();
                    }
                    _ => err("`values` must be an array of strings".into()),
                },
                other => match Constraint::from_toml(other, value) {
                    Some(Ok(Some(c))) => constraints.push(c),
                    Some(Ok(None)) => {}
                    Some(Err(msg)) => err(msg),
                    None => err(format!("unknown key `{}`", other)),
                },
            }
        }

        let default = match (table.get("default"), kind) {
            (None, _) | (_, None) => None,
            (Some(v), Some(kind)) => match (kind, v) {
                (FieldType::String | FieldType::Enum, toml::Value::String(s)) => {
                    Some(Value::String(s.clone()))
                }
                (FieldType::Number, toml::Value::Integer(n)) => Some(Value::Number(*n as f64)),
                (FieldType::Number, toml::Value::Float(n)) if n.is_finite() => {
                    Some(Value::Number(*n))
                }
                (FieldType::Boolean, toml::Value::Boolean(b)) => Some(Value::Boolean(*b)),
                (kind, _) => {
                    err(format!("`default` must be a {}", kind));
                    None
                }
            },
        };

        match (kind, context, access) {
            (Some(kind), Some(context), Some(access)) if errors.is_empty() => Ok(Self {
                name: name.to_string(),
                kind,
                context,
                access,
                optional,
                default,
                description,
                constraints,
                values,
            }),
            _ => Err(errors),
        }
    }

    /// Renders the field as a table that [`FieldDefinition::from_toml`] reads back.
    pub fn to_toml(&self) -> toml::Table {
        let mut table = toml::Table::new();
        table.insert("type".into(), self.kind.as_str().into());
        table.insert("context".into(), self.context.as_str().into());
        table.insert("access".into(), self.access.as_str().into());
        if self.optional {
            table.insert("optional".into(), true.into());
        }
        if let Some(default) = &self.default {
            table.insert("default".into(), default.to_toml());
        }
        if let Some(description) = &self.description {
            table.insert("description".into(), description.clone().into());
        }
        if !self.values.is_empty() {
            table.insert(
                "values".into(),
                toml::Value::Array(self.values.iter().map(|v| v.clone().into()).collect()),
            );
        }
        for constraint in &self.constraints {
            table.insert(constraint.name().into(), constraint.to_toml());
        }
        table
    }
}
