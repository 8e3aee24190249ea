//! Validation rules for schema fields.
//!
//! A schema maps each field to something implementing [`Rule`]. The built-in
//! [`Validator`] covers the usual value shapes; callers may implement `Rule`
//! for their own checks.
//!
//! ```
//! use gitodm::validation;
//!
//! let id = validation::primary_string();
//! let age = validation::number().integer().min(0.0);
//! let email = validation::string().email().required();
//! # let _ = (id, age, email);
//! ```

mod rule;
mod types;

pub use rule::{Rule, Validator, Violation, PRIMARY_TAG};
pub use types::{Constraint, RuleType};

/// A rule accepting any value.
pub fn any() -> Validator {
    Validator::new(RuleType::Any)
}

/// A rule accepting strings.
pub fn string() -> Validator {
    Validator::new(RuleType::String)
}

/// A rule accepting numbers.
pub fn number() -> Validator {
    Validator::new(RuleType::Number)
}

/// A rule accepting booleans.
pub fn boolean() -> Validator {
    Validator::new(RuleType::Boolean)
}

/// A rule accepting objects.
pub fn object() -> Validator {
    Validator::new(RuleType::Object)
}

/// A rule accepting arrays.
pub fn array() -> Validator {
    Validator::new(RuleType::Array)
}

/// A required string tagged as the primary key.
pub fn primary_string() -> Validator {
    string().required().primary()
}

/// A required number tagged as the primary key.
pub fn primary_number() -> Validator {
    number().required().primary()
}
