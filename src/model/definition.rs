//! Caller-supplied model descriptions.

use crate::schema::Schema;

/// The definition handed to [`Repository::register`](crate::Repository::register).
///
/// The schema slot is optional: registering a definition without one is
/// rejected by the repository.
#[derive(Debug, Clone, Default)]
pub struct ModelDefinition {
    schema: Option<Schema>,
}

impl ModelDefinition {
    pub fn new(schema: Schema) -> Self {
        Self { schema: Some(schema) }
    }

    /// A definition with no schema.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub(crate) fn into_schema(self) -> Option<Schema> {
        self.schema
    }
}

impl From<Schema> for ModelDefinition {
    fn from(schema: Schema) -> Self {
        Self::new(schema)
    }
}

/// Model names are non-empty and ASCII-alphabetic only.
pub(crate) fn is_valid_model_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation;

    #[test]
    fn test_model_names() {
        assert!(is_valid_model_name("person"));
        assert!(is_valid_model_name("BlogPost"));
        assert!(!is_valid_model_name(""));
        assert!(!is_valid_model_name("blog_post"));
        assert!(!is_valid_model_name("person2"));
        assert!(!is_valid_model_name("café"));
    }

    #[test]
    fn test_definition_schema_slot() {
        assert!(ModelDefinition::empty().schema().is_none());

        let definition: ModelDefinition = Schema::new().field("id", validation::primary_string()).into();
        assert_eq!(definition.schema().map(Schema::len), Some(1));
    }
}
