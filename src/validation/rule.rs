//! The validation capability and the built-in rule implementation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::types::{display_values, looks_like_email, Constraint, RuleType};

/// Metadata tag marking a rule as the primary key of its schema.
pub const PRIMARY_TAG: &str = "isPrimary";

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Human-readable message, e.g. `"age" must be a number`.
    pub message: String,
    /// Path of the offending field.
    pub path: String,
    /// Violation kind, e.g. `number.base`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Extra details (the field key, limits, allowed values).
    pub context: Map<String, Value>,
}

impl Violation {
    fn new(path: &str, kind: String, message: String, extra: Option<(&str, Value)>) -> Self {
        let mut context = Map::new();
        context.insert("key".to_string(), Value::String(path.to_string()));
        if let Some((name, value)) = extra {
            context.insert(name.to_string(), value);
        }
        Self {
            message,
            path: path.to_string(),
            kind,
            context,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Capability every schema field rule must provide.
///
/// A rule checks a (possibly absent) value and reports every violation it
/// finds, and carries a list of metadata tags the schema engine can query.
pub trait Rule: fmt::Debug + Send + Sync {
    /// Validate `value` found at `path`. `None` means the field was never set.
    fn validate(&self, path: &str, value: Option<&Value>) -> Result<(), Vec<Violation>>;

    /// Metadata tags attached to this rule.
    fn metadata(&self) -> &[Value];

    /// Check whether any metadata tag marks this rule as the primary key.
    fn is_primary(&self) -> bool {
        self.metadata().iter().any(|meta| {
            meta.get(PRIMARY_TAG)
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
    }
}

/// Typed rule with constraints, built with the functions in [`crate::validation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// The accepted base type.
    pub rule_type: RuleType,
    /// Constraints checked after the type check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// Arbitrary metadata tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<Value>,
    /// Optional field description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validator {
    /// Create a rule accepting `rule_type` with no constraints.
    pub fn new(rule_type: RuleType) -> Self {
        Self {
            rule_type,
            constraints: Vec::new(),
            meta: Vec::new(),
            description: None,
        }
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Value must be present.
    pub fn required(self) -> Self {
        if self.is_required() {
            return self;
        }
        self.with_constraint(Constraint::Required)
    }

    /// Minimum numeric value.
    pub fn min(self, limit: f64) -> Self {
        self.with_constraint(Constraint::Min(limit))
    }

    /// Maximum numeric value.
    pub fn max(self, limit: f64) -> Self {
        self.with_constraint(Constraint::Max(limit))
    }

    /// Number must be an integer.
    pub fn integer(self) -> Self {
        self.with_constraint(Constraint::Integer)
    }

    /// Minimum string length or array size.
    pub fn min_length(self, limit: usize) -> Self {
        self.with_constraint(Constraint::MinLength(limit))
    }

    /// Maximum string length or array size.
    pub fn max_length(self, limit: usize) -> Self {
        self.with_constraint(Constraint::MaxLength(limit))
    }

    /// Exact string length or array size.
    pub fn length(self, limit: usize) -> Self {
        self.with_constraint(Constraint::Length(limit))
    }

    /// Restrict the value to an allow-list.
    pub fn valid<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with_constraint(Constraint::Valid(values.into_iter().map(Into::into).collect()))
    }

    /// Only ASCII letters and digits.
    pub fn alphanum(self) -> Self {
        self.with_constraint(Constraint::Alphanum)
    }

    /// Must look like an email address.
    pub fn email(self) -> Self {
        self.with_constraint(Constraint::Email)
    }

    /// Attach a metadata tag.
    pub fn meta(mut self, tag: Value) -> Self {
        self.meta.push(tag);
        self
    }

    /// Tag this rule as the primary key.
    pub fn primary(self) -> Self {
        self.meta(json!({ PRIMARY_TAG: true }))
    }

    /// Set the description.
    pub fn describe(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Check if this rule requires a value.
    pub fn is_required(&self) -> bool {
        self.constraints.iter().any(|c| c.is_required())
    }

    fn violation(&self, path: &str, suffix: &str, message: String, extra: Option<(&str, Value)>) -> Violation {
        let kind = format!("{}.{}", self.rule_type.name(), suffix);
        Violation::new(path, kind, format!("\"{}\" {}", path, message), extra)
    }

    fn check_constraint(&self, path: &str, value: &Value, constraint: &Constraint) -> Option<Violation> {
        match (constraint, value) {
            (Constraint::Required, _) => None,
            (Constraint::Min(limit), Value::Number(n)) => {
                let n = n.as_f64()?;
                (n < *limit).then(|| {
                    self.violation(
                        path,
                        "min",
                        format!("must be larger than or equal to {}", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::Max(limit), Value::Number(n)) => {
                let n = n.as_f64()?;
                (n > *limit).then(|| {
                    self.violation(
                        path,
                        "max",
                        format!("must be less than or equal to {}", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::Integer, Value::Number(n)) => {
                let is_integer = n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false);
                (!is_integer).then(|| {
                    self.violation(path, "integer", "must be an integer".to_string(), None)
                })
            }
            (Constraint::MinLength(limit), Value::String(s)) => {
                (s.chars().count() < *limit).then(|| {
                    self.violation(
                        path,
                        "min",
                        format!("length must be at least {} characters long", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::MaxLength(limit), Value::String(s)) => {
                (s.chars().count() > *limit).then(|| {
                    self.violation(
                        path,
                        "max",
                        format!("length must be less than or equal to {} characters long", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::Length(limit), Value::String(s)) => {
                (s.chars().count() != *limit).then(|| {
                    self.violation(
                        path,
                        "length",
                        format!("length must be {} characters long", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::MinLength(limit), Value::Array(items)) => {
                (items.len() < *limit).then(|| {
                    self.violation(
                        path,
                        "min",
                        format!("must contain at least {} items", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::MaxLength(limit), Value::Array(items)) => {
                (items.len() > *limit).then(|| {
                    self.violation(
                        path,
                        "max",
                        format!("must contain less than or equal to {} items", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::Length(limit), Value::Array(items)) => {
                (items.len() != *limit).then(|| {
                    self.violation(
                        path,
                        "length",
                        format!("must contain {} items", limit),
                        Some(("limit", json!(limit))),
                    )
                })
            }
            (Constraint::Valid(allowed), v) => {
                (!allowed.contains(v)).then(|| {
                    let kind = "any.allowOnly".to_string();
                    let message = format!("\"{}\" must be one of [{}]", path, display_values(allowed));
                    Violation::new(path, kind, message, Some(("valids", Value::Array(allowed.clone()))))
                })
            }
            (Constraint::Alphanum, Value::String(s)) => {
                (!s.chars().all(|c| c.is_ascii_alphanumeric())).then(|| {
                    self.violation(
                        path,
                        "alphanum",
                        "must only contain alpha-numeric characters".to_string(),
                        Some(("value", value.clone())),
                    )
                })
            }
            (Constraint::Email, Value::String(s)) => {
                (!looks_like_email(s)).then(|| {
                    self.violation(
                        path,
                        "email",
                        "must be a valid email".to_string(),
                        Some(("value", value.clone())),
                    )
                })
            }
            // constraint does not apply to this value shape
            _ => None,
        }
    }
}

impl Rule for Validator {
    fn validate(&self, path: &str, value: Option<&Value>) -> Result<(), Vec<Violation>> {
        let value = match value {
            Some(v) => v,
            None if self.is_required() => {
                let message = format!("\"{}\" is required", path);
                return Err(vec![Violation::new(path, "any.required".to_string(), message, None)]);
            }
            None => return Ok(()),
        };

        if !self.rule_type.matches(value) {
            return Err(vec![self.violation(
                path,
                "base",
                format!("must be {}", self.rule_type.article()),
                None,
            )]);
        }

        let violations: Vec<Violation> = self
            .constraints
            .iter()
            .filter_map(|c| self.check_constraint(path, value, c))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn metadata(&self) -> &[Value] {
        &self.meta
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule_type)?;
        for constraint in &self.constraints {
            write!(f, ".{}", constraint)?;
        }
        Ok(())
    }
}
