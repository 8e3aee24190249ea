//! Model schema definitions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::validation::Rule;

/// One schema entry.
#[derive(Debug, Clone)]
pub enum Field {
    /// A field backed by a validation rule.
    Rule(Arc<dyn Rule>),
    /// A value that carries no validation. Rejected by the schema engine.
    Unvalidated(Value),
}

impl Field {
    /// Wrap a rule.
    pub fn rule(rule: impl Rule + 'static) -> Self {
        Field::Rule(Arc::new(rule))
    }

    /// The rule, if this field has one.
    pub fn as_rule(&self) -> Option<&dyn Rule> {
        match self {
            Field::Rule(rule) => Some(rule.as_ref()),
            Field::Unvalidated(_) => None,
        }
    }
}

/// A mapping of field name to rule.
///
/// Fields are kept in name order. Cloning is cheap: rules are shared.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field validated by `rule`.
    pub fn field(mut self, name: impl Into<String>, rule: impl Rule + 'static) -> Self {
        self.fields.insert(name.into(), Field::rule(rule));
        self
    }

    /// Add a field holding a plain value with no validation.
    pub fn unvalidated(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), Field::Unvalidated(value));
        self
    }

    /// Insert or replace a field, returning the previous entry.
    pub fn insert(&mut self, name: impl Into<String>, field: Field) -> Option<Field> {
        self.fields.insert(name.into(), field)
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Check if a field is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Field names in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation;
    use serde_json::json;

    #[test]
    fn test_builder_and_lookup() {
        let schema = Schema::new()
            .field("name", validation::string())
            .field("id", validation::primary_string())
            .unvalidated("extra", json!(5));

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.field_names(), vec!["extra", "id", "name"]);
        assert!(schema.get("id").and_then(Field::as_rule).is_some());
        assert!(schema.get("extra").and_then(Field::as_rule).is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut schema = Schema::new().unvalidated("age", json!("number"));
        let previous = schema.insert("age", Field::rule(validation::number()));

        assert!(matches!(previous, Some(Field::Unvalidated(_))));
        assert!(schema.get("age").and_then(Field::as_rule).is_some());

        assert!(schema.remove("age").is_some());
        assert!(schema.is_empty());
    }

    #[test]
    fn test_clone_shares_rules() {
        let schema = Schema::new().field("id", validation::primary_string());
        let copy = schema.clone();

        match (schema.get("id"), copy.get("id")) {
            (Some(Field::Rule(a)), Some(Field::Rule(b))) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected rule fields"),
        }
    }
}
