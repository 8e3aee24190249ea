//! type-safe wrappers around git primitives and store names.

use std::fmt;
use std::path::PathBuf;

use git2::Oid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::PrimaryKey;

/// newtypes over `git2::Oid`, so a blob ID is never passed where a commit ID
/// is expected
macro_rules! object_id {
    ($($(#[$doc:meta])* $name:ident),+ $(,)?) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Oid);

        impl $name {
            pub(crate) fn new(oid: Oid) -> Self {
                Self(oid)
            }

            pub(crate) fn raw(&self) -> Oid {
                self.0
            }

            /// abbreviated hex form
            pub fn short(&self) -> String {
                let mut hex = self.0.to_string();
                hex.truncate(7);
                hex
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    )+};
}

object_id! {
    /// commit identifier
    CommitId,
    /// blob identifier
    BlobId,
    /// tree identifier
    TreeId,
}

/// shared rules for database and table names
///
/// - 1-64 characters
/// - alphanumeric, underscores, hyphens only
/// - must start with a letter or underscore
/// - cannot be a reserved name
fn validate_name(name: &str, reserved: &[&str]) -> Result<(), InvalidNameError> {
    let first_char = name.chars().next().ok_or(InvalidNameError::Empty)?;

    if name.len() > 64 {
        return Err(InvalidNameError::TooLong(name.len()));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(InvalidNameError::InvalidStart(first_char));
    }

    for (i, c) in name.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && c != '_' && c != '-' {
            return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
        }
    }

    if reserved.contains(&name.to_lowercase().as_str()) {
        return Err(InvalidNameError::Reserved(name.to_string()));
    }

    Ok(())
}

/// a validated database name; each database is a directory under the store root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        validate_name(&name, &[])?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated table name.
///
/// Table names become directory names in the git tree, so they are
/// restricted to prevent path traversal and clashes with store metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName(String);

impl TableName {
    /// directory holding per-table options
    pub const META_DIR: &'static str = "_tables";

    const RESERVED: &'static [&'static str] = &[Self::META_DIR, "_git"];

    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        validate_name(&name, Self::RESERVED)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A record key, stored as the blob file name `{table}/{name}.json`.
///
/// Keys made of ASCII letters, digits, `_` and `-` are used verbatim. Any
/// other string is hex-encoded behind a `~`, and numbers are written behind
/// a `=`, so every key maps to exactly one file name and back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey(PrimaryKey);

impl RecordKey {
    /// longest key in bytes
    pub const MAX_LEN: usize = 512;

    pub fn new(key: impl Into<PrimaryKey>) -> Result<Self, InvalidNameError> {
        let key = key.into();
        if let PrimaryKey::Text(text) = &key {
            if text.is_empty() {
                return Err(InvalidNameError::Empty);
            }
            if text.len() > Self::MAX_LEN {
                return Err(InvalidNameError::TooLong(text.len()));
            }
        }
        Ok(Self(key))
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        &self.0
    }

    /// file name of the record blob inside its table directory
    pub fn file_name(&self) -> String {
        match &self.0 {
            PrimaryKey::Number(n) => format!("={}.json", n),
            PrimaryKey::Text(text) if is_plain(text) => format!("{}.json", text),
            PrimaryKey::Text(text) => format!("~{}.json", hex::encode(text)),
        }
    }

    /// the key a blob file name was written for, if it is one
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let key = if let Some(number) = stem.strip_prefix('=') {
            PrimaryKey::Number(serde_json::from_str(number).ok()?)
        } else if let Some(encoded) = stem.strip_prefix('~') {
            PrimaryKey::Text(String::from_utf8(hex::decode(encoded).ok()?).ok()?)
        } else if is_plain(stem) {
            PrimaryKey::Text(stem.to_string())
        } else {
            return None;
        };
        Self::new(key).ok()
    }
}

fn is_plain(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full path to a record in the repository.
///
/// Format: `{table}/{key}.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPath {
    pub table: TableName,
    pub key: RecordKey,
}

impl RecordPath {
    pub fn new(table: TableName, key: RecordKey) -> Self {
        Self { table, key }
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.key.file_name())
    }
}

/// a branch name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    pub const MAIN: &'static str = "main";

    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    /// full ref path, e.g. `refs/heads/main`
    pub fn as_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// author/committer info for store commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSignature {
    pub name: String,
    pub email: String,
}

impl GitSignature {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    pub(crate) fn to_git2_signature(&self) -> Result<git2::Signature<'static>, git2::Error> {
        git2::Signature::now(&self.name, &self.email)
    }
}

impl Default for GitSignature {
    fn default() -> Self {
        Self::new("gitodm", "gitodm@localhost")
    }
}

/// a database name, table name or record key that cannot be used
/// as a path inside the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidNameError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name too long: {0} characters")]
    TooLong(usize),

    #[error("name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character '{char}' at position {position}")]
    InvalidCharacter { char: char, position: usize },

    #[error("'{0}' is a reserved name")]
    Reserved(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_valid() {
        assert!(TableName::new("person").is_ok());
        assert!(TableName::new("user_accounts").is_ok());
        assert!(TableName::new("User123").is_ok());
        assert!(TableName::new("_private").is_ok());
        assert!(TableName::new("my-table").is_ok());
    }

    #[test]
    fn test_table_name_invalid() {
        assert_eq!(TableName::new(""), Err(InvalidNameError::Empty));
        assert_eq!(TableName::new("123users"), Err(InvalidNameError::InvalidStart('1')));
        assert!(TableName::new("users/admin").is_err());
        assert!(TableName::new("../escape").is_err());
        assert!(matches!(TableName::new("_tables"), Err(InvalidNameError::Reserved(_))));
        assert!(TableName::new("a".repeat(65)).is_err());
    }

    #[test]
    fn test_database_name() {
        assert!(DatabaseName::new("test_db").is_ok());
        assert!(DatabaseName::new("app-2").is_ok());
        assert!(DatabaseName::new(".git").is_err());
        assert!(DatabaseName::new("a b").is_err());
    }

    #[test]
    fn test_record_key() {
        assert!(RecordKey::new("p1").is_ok());
        assert_eq!(RecordKey::new(""), Err(InvalidNameError::Empty));
        assert!(matches!(
            RecordKey::new("a".repeat(RecordKey::MAX_LEN + 1)),
            Err(InvalidNameError::TooLong(_))
        ));
        assert_eq!(RecordKey::new(7i64).unwrap().to_string(), "7");
    }

    #[test]
    fn test_record_key_file_names() {
        let plain = RecordKey::new("550e8400-e29b_41d4").unwrap();
        assert_eq!(plain.file_name(), "550e8400-e29b_41d4.json");

        assert_eq!(RecordKey::new("a b").unwrap().file_name(), "~612062.json");
        assert_eq!(RecordKey::new("1").unwrap().file_name(), "1.json");
        assert_eq!(RecordKey::new(1i64).unwrap().file_name(), "=1.json");

        for key in ["p1", "Ada Lovelace", "ada@example.com", "p/1", "élan", "..", ".hidden", "~x", "=1"] {
            let key = RecordKey::new(key).unwrap();
            let name = key.file_name();
            assert!(!name.contains('/'), "{name}");
            assert!(!name.starts_with('.'), "{name}");
            assert_eq!(RecordKey::from_file_name(&name), Some(key));
        }

        let number = RecordKey::new(PrimaryKey::from_value(&serde_json::json!(-12.5)).unwrap()).unwrap();
        assert_eq!(number.file_name(), "=-12.5.json");
        assert_eq!(RecordKey::from_file_name("=-12.5.json"), Some(number));
    }

    #[test]
    fn test_foreign_file_names_are_skipped() {
        assert_eq!(RecordKey::from_file_name("notes.txt"), None);
        assert_eq!(RecordKey::from_file_name("a b.json"), None);
        assert_eq!(RecordKey::from_file_name("~zz.json"), None);
        assert_eq!(RecordKey::from_file_name("=abc.json"), None);
    }

    #[test]
    fn test_record_path() {
        let path = RecordPath::new(TableName::new("person").unwrap(), RecordKey::new("p1").unwrap());
        assert_eq!(path.to_string(), "person/p1.json");
        assert_eq!(path.to_path_buf(), PathBuf::from("person/p1.json"));
    }

    #[test]
    fn test_branch_name() {
        let branch = BranchName::main();
        assert_eq!(branch.as_ref_path(), "refs/heads/main");
        assert_eq!(branch.as_str(), BranchName::MAIN);
    }
}
