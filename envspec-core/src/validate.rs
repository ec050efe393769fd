//! The field validator: casts raw strings and checks constraints.
//!
//! Two entry points exist. [`validate`] runs at value time, turning a raw
//! string (or its absence) into a typed [`Value`]. [`check_definition`] runs at
//! definition time and reports every problem with the shape of a field, so a
//! schema can be rejected before any value is looked at.

use std::collections::HashSet;
use url::Url;

use crate::error::{SchemaError, ValidationError};
use crate::field::{Access, Constraint, Context, FieldDefinition, FieldType, Value};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    /// Inlined into build output.
    Build,
    /// Looked up while serving a request.
    Request,
}

/// A validated value together with its name and origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub name: String,
    /// `None` when an optional field has no value.
    pub value: Option<Value>,
    pub origin: ValueOrigin,
}

impl ResolvedValue {
    pub fn new(name: impl Into<String>, value: Option<Value>, origin: ValueOrigin) -> Self {
        Self {
            name: name.into(),
            value,
            origin,
        }
    }
}

/// Casts and validates `raw` against `def`.
///
/// An absent value falls back to the default, then to `None` for optional
/// fields; anything else is `MissingRequiredVariable`. An empty string counts
/// as absent for every type except `string`.
pub fn validate(def: &FieldDefinition, raw: Option<&str>) -> Result<Option<Value>, ValidationError> {
    let raw = match raw {
        Some("") if def.kind != FieldType::String => None,
        other => other,
    };

    let Some(raw) = raw else {
        return match &def.default {
            Some(default) => check_value(def, default.clone()).map(Some),
            None if def.optional => Ok(None),
            None => Err(ValidationError::MissingRequiredVariable {
                name: def.name.clone(),
            }),
        };
    };

    let value = cast(def, raw)?;
    check_value(def, value).map(Some)
}

/// Casts a raw string to the field's type without applying constraints.
pub fn cast(def: &FieldDefinition, raw: &str) -> Result<Value, ValidationError> {
    let invalid = || ValidationError::InvalidType {
        name: def.name.clone(),
        expected: def.kind,
    };

    match def.kind {
        FieldType::String | FieldType::Enum => Ok(Value::String(raw.to_string())),
        FieldType::Number if def.is_integer() => parse_integer(raw)
            .map(Value::Integer)
            .or_else(|| parse_number(raw).map(Value::Number))
            .ok_or_else(invalid),
        FieldType::Number => parse_number(raw).map(Value::Number).ok_or_else(invalid),
        FieldType::Boolean => match raw {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Err(invalid()),
        },
    }
}

/// Strict, locale-independent decimal parse. Rejects whitespace, trailing
/// garbage, hexadecimal and non-finite spellings such as `inf` or `NaN`.
fn parse_number(raw: &str) -> Option<f64> {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
    if raw.is_empty() || !raw.chars().all(allowed) || !raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Exact parse for `int` fields, so values beyond 2^53 keep every digit.
fn parse_integer(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok()
}

/// Checks a typed value against enum membership and the constraints, in order.
fn check_value(def: &FieldDefinition, value: Value) -> Result<Value, ValidationError> {
    let violation = |constraint: &'static str, detail: String| ValidationError::ConstraintViolation {
        name: def.name.clone(),
        constraint,
        detail,
    };

    match (def.kind, &value) {
        (FieldType::String, Value::String(s)) => {
            for constraint in &def.constraints {
                check_string(constraint, s).map_err(|d| violation(constraint.name(), d))?;
            }
            Ok(value)
        }
        (FieldType::Enum, Value::String(s)) => {
            if def.values.iter().any(|v| v == s) {
                Ok(value)
            } else {
                Err(violation(
                    "values",
                    format!("expected one of {}", def.values.join(", ")),
                ))
            }
        }
        (FieldType::Number, Value::Integer(i)) if def.is_integer() => {
            let i = *i;
            for constraint in &def.constraints {
                check_integer(constraint, i).map_err(|d| violation(constraint.name(), d))?;
            }
            Ok(value)
        }
        (FieldType::Number, Value::Number(_) | Value::Integer(_)) => {
            let n = value.as_f64().unwrap_or_default();
            for constraint in &def.constraints {
                check_number(constraint, n).map_err(|d| violation(constraint.name(), d))?;
            }
            if def.is_integer() {
                if n.abs() >= i64::MAX as f64 {
                    return Err(violation("int", "out of range for an integer".into()));
                }
                Ok(Value::Integer(n as i64))
            } else {
                Ok(Value::Number(n))
            }
        }
        (FieldType::Boolean, Value::Boolean(_)) => Ok(value),
        _ => Err(ValidationError::InvalidType {
            name: def.name.clone(),
            expected: def.kind,
        }),
    }
}

fn check_string(constraint: &Constraint, s: &str) -> Result<(), String> {
    let len = s.chars().count();
    match constraint {
        Constraint::MinLength(min) if len < *min => {
            Err(format!("must be at least {} characters", min))
        }
        Constraint::MaxLength(max) if len > *max => {
            Err(format!("must be at most {} characters", max))
        }
        Constraint::Length(exact) if len != *exact => {
            Err(format!("must be exactly {} characters", exact))
        }
        Constraint::Url if Url::parse(s).is_err() => Err("must be a valid URL".into()),
        Constraint::Includes(needle) if !s.contains(needle.as_str()) => {
            Err(format!("must include '{}'", needle))
        }
        Constraint::StartsWith(prefix) if !s.starts_with(prefix.as_str()) => {
            Err(format!("must start with '{}'", prefix))
        }
        Constraint::EndsWith(suffix) if !s.ends_with(suffix.as_str()) => {
            Err(format!("must end with '{}'", suffix))
        }
        _ => Ok(()),
    }
}

fn check_number(constraint: &Constraint, n: f64) -> Result<(), String> {
    match constraint {
        Constraint::Gt(bound) if n <= *bound => Err(format!("must be greater than {}", bound)),
        Constraint::Min(bound) if n < *bound => {
            Err(format!("must be greater than or equal to {}", bound))
        }
        Constraint::Lt(bound) if n >= *bound => Err(format!("must be less than {}", bound)),
        Constraint::Max(bound) if n > *bound => {
            Err(format!("must be less than or equal to {}", bound))
        }
        Constraint::Int if n.fract() != 0.0 => Err("must be an integer".into()),
        _ => Ok(()),
    }
}

fn check_integer(constraint: &Constraint, i: i64) -> Result<(), String> {
    use std::cmp::Ordering::{Greater, Less};

    match constraint {
        Constraint::Gt(bound) if compare(i, *bound) != Greater => {
            Err(format!("must be greater than {}", bound))
        }
        Constraint::Min(bound) if compare(i, *bound) == Less => {
            Err(format!("must be greater than or equal to {}", bound))
        }
        Constraint::Lt(bound) if compare(i, *bound) != Less => {
            Err(format!("must be less than {}", bound))
        }
        Constraint::Max(bound) if compare(i, *bound) == Greater => {
            Err(format!("must be less than or equal to {}", bound))
        }
        _ => Ok(()),
    }
}

/// Compares an integer with a finite bound without rounding the integer.
fn compare(i: i64, bound: f64) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    // 2^63 is exactly representable; every i64 lies in [-2^63, 2^63).
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if bound >= LIMIT {
        return Ordering::Less;
    }
    if bound < -LIMIT {
        return Ordering::Greater;
    }
    let whole = bound.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0f64.partial_cmp(&(bound - whole)).unwrap_or(Ordering::Equal),
        unequal => unequal,
    }
}

/// Reports every definition-time problem with `def`.
pub fn check_definition(def: &FieldDefinition) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let mut err = |msg: String| errors.push(SchemaError::new(def.name.clone(), msg));

    if !is_valid_identifier(&def.name) {
        err(format!(
            "invalid name '{}': must be a valid identifier (alphanumeric and underscores, not starting with a number)",
            def.name
        ));
    }

    if def.access == Access::Secret && def.context == Context::Client {
        err("secret variables cannot be exposed to client context".into());
    }

    if def.optional && def.default.is_some() {
        err("a field with a default cannot also be optional".into());
    }

    for constraint in &def.constraints {
        if constraint.applies_to() != def.kind {
            err(format!(
                "`{}` does not apply to {} fields",
                constraint.name(),
                def.kind
            ));
        }
    }

    match def.kind {
        FieldType::Enum => {
            if def.values.is_empty() {
                err("enum fields must list at least one value in `values`".into());
            }
            let mut seen = HashSet::new();
            for v in &def.values {
                if !seen.insert(v.as_str()) {
                    err(format!("duplicate enum value '{}'", v));
                }
            }
        }
        _ if !def.values.is_empty() => err("`values` only applies to enum fields".into()),
        _ => {}
    }

    check_bounds(def, &mut err);

    // A default must itself be a valid value, which also covers enum membership.
    if let Some(default) = &def.default {
        if let Err(e) = check_value(def, default.clone()) {
            err(format!("invalid default: {}", e));
        }
    }

    errors
}

fn check_bounds(def: &FieldDefinition, err: &mut impl FnMut(String)) {
    let mut min_length = None;
    let mut max_length = None;
    let mut length = None;
    let mut lower: Option<(f64, bool)> = None;
    let mut upper: Option<(f64, bool)> = None;

    for constraint in &def.constraints {
        match constraint {
            Constraint::MinLength(n) => min_length = Some(*n),
            Constraint::MaxLength(n) => max_length = Some(*n),
            Constraint::Length(n) => length = Some(*n),
            Constraint::Gt(n) => lower = Some((*n, true)),
            Constraint::Min(n) => lower = Some((*n, false)),
            Constraint::Lt(n) => upper = Some((*n, true)),
            Constraint::Max(n) => upper = Some((*n, false)),
            _ => {}
        }
    }

    if let (Some(min), Some(max)) = (min_length, max_length) {
        if min > max {
            err(format!("min_length ({}) is greater than max_length ({})", min, max));
        }
    }
    if let Some(exact) = length {
        if min_length.is_some_and(|min| min > exact) || max_length.is_some_and(|max| max < exact) {
            err(format!("length ({}) contradicts min_length/max_length", exact));
        }
    }
    if let (Some((lo, lo_excl)), Some((hi, hi_excl))) = (lower, upper) {
        let empty = if lo_excl || hi_excl { lo >= hi } else { lo > hi };
        if empty {
            err(format!("lower bound ({}) is not below upper bound ({})", lo, hi));
        }
    }
}

/// Check if a string is a valid identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && s.chars().any(|c| c.is_ascii_alphanumeric())
}
