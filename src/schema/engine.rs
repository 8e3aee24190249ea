//! Schema introspection and instance validation.
//!
//! Both passes read the schema live: nothing is cached between `init` and
//! `save`, so a schema changed after initialisation is checked in its
//! current shape.

use serde_json::Value;

use super::schema::{Field, Schema};
use crate::error::{OdmError, OdmResult, SchemaError, ValidationError};
use crate::store::Document;
use crate::validation::{Rule, Violation};

/// Output of [`validate_instance`]: everything the upsert step needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInstance {
    /// Name of the primary key field.
    pub primary_key: String,
    /// The instance's primary key value.
    pub key: Value,
    /// Declared fields only, taken from the instance.
    pub document: Document,
}

/// Check the schema's shape and return the primary key field name.
///
/// Fails if any field has no rule, if more than one field is tagged as the
/// primary key, or if none is.
pub fn validate_schema(schema: &Schema) -> Result<String, SchemaError> {
    let rules = collect_rules(schema)?;
    find_primary_key(&rules)
}

/// Validate instance values against the schema.
///
/// Repeats the schema shape checks, requires the primary key value, projects
/// the instance onto the declared fields and runs every rule, collecting all
/// violations.
pub fn validate_instance(schema: &Schema, values: &Document) -> OdmResult<ValidatedInstance> {
    let rules = collect_rules(schema)?;
    let primary_key = find_primary_key(&rules)?;

    let key = values.get(&primary_key).cloned().ok_or_else(|| {
        ValidationError::new(format!("Property '{}' is required", primary_key))
    })?;

    // allow-list projection: undeclared instance fields never reach the store
    let document: Document = rules
        .iter()
        .filter_map(|(name, _)| values.get(*name).map(|v| (name.to_string(), v.clone())))
        .collect();

    let violations: Vec<Violation> = rules
        .iter()
        .filter_map(|(name, rule)| rule.validate(name, document.get(*name)).err())
        .flatten()
        .collect();

    if !violations.is_empty() {
        return Err(OdmError::Validation(ValidationError::from_violations(violations)));
    }

    Ok(ValidatedInstance {
        primary_key,
        key,
        document,
    })
}

fn collect_rules(schema: &Schema) -> Result<Vec<(&str, &dyn Rule)>, SchemaError> {
    schema
        .iter()
        .map(|(name, field)| match field {
            Field::Rule(rule) => Ok((name, rule.as_ref())),
            Field::Unvalidated(_) => Err(SchemaError::new(format!("'{}' has no validation", name))),
        })
        .collect()
}

fn find_primary_key(rules: &[(&str, &dyn Rule)]) -> Result<String, SchemaError> {
    let mut primary: Option<&str> = None;

    for (name, rule) in rules {
        if !rule.is_primary() {
            continue;
        }
        if primary.is_some() {
            return Err(SchemaError::new("Primary key already exists"));
        }
        primary = Some(name);
    }

    primary
        .map(str::to_string)
        .ok_or_else(|| SchemaError::new("Primary key is not defined"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::validation;
    use serde_json::json;

    fn person_schema() -> Schema {
        Schema::new()
            .field("id", validation::primary_string())
            .field("name", validation::string())
            .field("age", validation::number().integer())
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_validate_schema_finds_primary_key() {
        assert_eq!(validate_schema(&person_schema()).unwrap(), "id");
    }

    #[test]
    fn test_validate_schema_missing_primary_key() {
        let schema = Schema::new().field("name", validation::string());
        let err = validate_schema(&schema).unwrap_err();
        assert_eq!(err.message(), "Primary key is not defined");

        let err = validate_schema(&Schema::new()).unwrap_err();
        assert_eq!(err.message(), "Primary key is not defined");
    }

    #[test]
    fn test_validate_schema_duplicate_primary_key() {
        let schema = Schema::new()
            .field("a", validation::primary_string())
            .field("b", validation::primary_number());

        let err = validate_schema(&schema).unwrap_err();
        assert_eq!(err.message(), "Primary key already exists");
    }

    #[test]
    fn test_validate_schema_rejects_unvalidated_field() {
        let schema = Schema::new()
            .field("id", validation::primary_string())
            .unvalidated("notes", json!("free text"));

        let err = validate_schema(&schema).unwrap_err();
        assert_eq!(err.message(), "'notes' has no validation");
    }

    #[test]
    fn test_validate_instance_projects_declared_fields() {
        let values = doc(json!({
            "id": "p1",
            "name": "Ada",
            "undeclared": true
        }));

        let validated = validate_instance(&person_schema(), &values).unwrap();

        assert_eq!(validated.primary_key, "id");
        assert_eq!(validated.key, json!("p1"));
        assert_eq!(validated.document, doc(json!({"id": "p1", "name": "Ada"})));
    }

    #[test]
    fn test_validate_instance_requires_primary_key_value() {
        let values = doc(json!({"name": "Ada"}));
        let err = validate_instance(&person_schema(), &values).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "Property 'id' is required");
    }

    #[test]
    fn test_validate_instance_collects_all_violations() {
        let values = doc(json!({
            "id": "p1",
            "name": 42,
            "age": "old"
        }));

        let err = validate_instance(&person_schema(), &values).unwrap_err();
        let details = match &err {
            OdmError::Validation(e) => e.details().to_vec(),
            other => panic!("unexpected error: {other}"),
        };

        let paths: Vec<_> = details.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["age", "name"]);
        assert_eq!(details[0].kind, "number.base");
        assert_eq!(details[1].kind, "string.base");
    }

    #[test]
    fn test_validate_instance_repeats_schema_checks() {
        let schema = person_schema().unvalidated("extra", json!(1));
        let values = doc(json!({"id": "p1"}));

        let err = validate_instance(&schema, &values).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.message(), "'extra' has no validation");
    }
}
