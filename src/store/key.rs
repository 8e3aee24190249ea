//! Primary key values as the stores see them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{StoreError, StoreResult};

/// largest integer an `f64` represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A record's primary key.
///
/// Strings and numbers stay distinct: `"1"` and `1` address different
/// records. Numbers are canonical, so `1` and `1.0` address the same one.
/// Serializes as the bare JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Number(Number),
    Text(String),
}

impl PrimaryKey {
    /// Read a key from a JSON value. Only strings and numbers are keys.
    pub fn from_value(value: &Value) -> StoreResult<Self> {
        match value {
            Value::String(s) => Ok(PrimaryKey::Text(s.clone())),
            Value::Number(n) => Ok(PrimaryKey::Number(canonical(n))),
            other => Err(StoreError::InvalidKey(other.to_string())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::Number(n) => Value::Number(n.clone()),
            PrimaryKey::Text(s) => Value::String(s.clone()),
        }
    }
}

/// integral floats collapse to integers so `1.0` and `1` compare equal
fn canonical(n: &Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Number::from(f as i64),
        _ => n.clone(),
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Number(n) => write!(f, "{}", n),
            PrimaryKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PrimaryKey {
    fn from(s: &str) -> Self {
        PrimaryKey::Text(s.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(s: String) -> Self {
        PrimaryKey::Text(s)
    }
}

impl From<i64> for PrimaryKey {
    fn from(n: i64) -> Self {
        PrimaryKey::Number(Number::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(value: Value) -> PrimaryKey {
        PrimaryKey::from_value(&value).unwrap()
    }

    #[test]
    fn test_numbers_are_canonical() {
        assert_eq!(key(json!(1)), key(json!(1.0)));
        assert_eq!(key(json!(-3)), key(json!(-3.0)));
        assert_eq!(key(json!(0)), key(json!(-0.0)));
        assert_ne!(key(json!(1)), key(json!(1.5)));
        assert_eq!(key(json!(1.0)).to_string(), "1");
        assert_eq!(key(json!(1.5)).to_string(), "1.5");
    }

    #[test]
    fn test_strings_and_numbers_stay_apart() {
        assert_ne!(key(json!("1")), key(json!(1)));
        assert_eq!(key(json!("p1")), PrimaryKey::from("p1"));
        assert_eq!(key(json!(7)), PrimaryKey::from(7i64));
    }

    #[test]
    fn test_rejects_other_values() {
        assert!(matches!(PrimaryKey::from_value(&json!(null)), Err(StoreError::InvalidKey(_))));
        assert!(matches!(PrimaryKey::from_value(&json!(true)), Err(StoreError::InvalidKey(_))));
        assert!(matches!(PrimaryKey::from_value(&json!({"a": 1})), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_serializes_as_bare_value() {
        assert_eq!(serde_json::to_value(key(json!(2.0))).unwrap(), json!(2));
        assert_eq!(serde_json::to_value(PrimaryKey::from("p1")).unwrap(), json!("p1"));

        let back: PrimaryKey = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(back, PrimaryKey::from(3i64));
        let back: PrimaryKey = serde_json::from_value(json!("3")).unwrap();
        assert_eq!(back, PrimaryKey::from("3"));
        assert_eq!(key(json!("x")).to_value(), json!("x"));
    }
}
