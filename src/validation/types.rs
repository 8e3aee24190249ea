//! Rule types and constraints for field validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The base type a rule accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Any JSON value.
    Any,
    /// UTF-8 strings.
    String,
    /// Integer or floating point numbers.
    Number,
    /// `true` / `false`.
    Boolean,
    /// JSON objects.
    Object,
    /// JSON arrays.
    Array,
}

impl RuleType {
    /// Check if a JSON value matches this rule type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (RuleType::Any, _) => true,
            (RuleType::String, Value::String(_)) => true,
            (RuleType::Number, Value::Number(_)) => true,
            (RuleType::Boolean, Value::Bool(_)) => true,
            (RuleType::Object, Value::Object(_)) => true,
            (RuleType::Array, Value::Array(_)) => true,
            _ => false,
        }
    }

    /// Name used as the prefix of violation kinds (`string.base`, `number.min`...).
    pub fn name(&self) -> &'static str {
        match self {
            RuleType::Any => "any",
            RuleType::String => "string",
            RuleType::Number => "number",
            RuleType::Boolean => "boolean",
            RuleType::Object => "object",
            RuleType::Array => "array",
        }
    }

    /// Noun phrase used in type mismatch messages.
    pub(crate) fn article(&self) -> &'static str {
        match self {
            RuleType::Any => "a value",
            RuleType::String => "a string",
            RuleType::Number => "a number",
            RuleType::Boolean => "a boolean",
            RuleType::Object => "an object",
            RuleType::Array => "an array",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Constraints applied after the type check passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Value must be present.
    Required,
    /// Minimum numeric value (inclusive).
    Min(f64),
    /// Maximum numeric value (inclusive).
    Max(f64),
    /// Number must have no fractional part.
    Integer,
    /// Minimum string length in characters, or minimum array item count.
    MinLength(usize),
    /// Maximum string length in characters, or maximum array item count.
    MaxLength(usize),
    /// Exact string length in characters, or exact array item count.
    Length(usize),
    /// Value must equal one of the listed values.
    Valid(Vec<Value>),
    /// String may only contain ASCII letters and digits.
    Alphanum,
    /// String must look like an email address.
    Email,
}

impl Constraint {
    /// Check if this is a REQUIRED constraint.
    pub fn is_required(&self) -> bool {
        matches!(self, Constraint::Required)
    }

    /// Short name of the constraint, used as the suffix of violation kinds.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Required => "required",
            Constraint::Min(_) | Constraint::MinLength(_) => "min",
            Constraint::Max(_) | Constraint::MaxLength(_) => "max",
            Constraint::Integer => "integer",
            Constraint::Length(_) => "length",
            Constraint::Valid(_) => "allowOnly",
            Constraint::Alphanum => "alphanum",
            Constraint::Email => "email",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Min(limit)
            | Constraint::Max(limit) => write!(f, "{}({})", self.name(), limit),
            Constraint::MinLength(limit)
            | Constraint::MaxLength(limit)
            | Constraint::Length(limit) => write!(f, "{}({})", self.name(), limit),
            Constraint::Valid(values) => write!(f, "valid({})", display_values(values)),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Render a list of allowed values as `a, b, c`.
pub(crate) fn display_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Basic email shape check: one `@`, non-empty local part, dotted domain.
pub(crate) fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = s.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };

    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
