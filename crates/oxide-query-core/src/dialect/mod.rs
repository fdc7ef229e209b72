//! SQL Dialect support.
//!
//! Different engines disagree on quoting and on which words are reserved.
//! Identifiers produced by this crate are always validated plain names, so a
//! dialect only has to quote the ones that collide with a keyword.

use std::borrow::Cow;
use std::fmt;

use crate::error::SchemaError;

/// Keywords reserved by ANSI SQL and every common engine.
pub const RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHECK",
    "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END",
    "ESCAPE", "EXCEPT", "EXISTS", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN",
    "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE",
    "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY",
    "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO", "UNION", "UNIQUE",
    "UPDATE", "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

/// Returns whether `word` is in [`RESERVED_WORDS`], ignoring case.
#[must_use]
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the parameter placeholder style.
    fn parameter_placeholder(&self) -> &'static str {
        "?"
    }

    /// Returns whether `word` must be quoted when used as an identifier.
    fn is_reserved(&self, word: &str) -> bool {
        is_reserved_word(word)
    }

    /// Quotes an identifier if it is a reserved word.
    fn quote_identifier<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.is_reserved(name) {
            let quote = self.identifier_quote();
            Cow::Owned(format!("{quote}{name}{quote}"))
        } else {
            Cow::Borrowed(name)
        }
    }

    /// Appends an identifier to `out`, quoting it if needed.
    fn write_identifier(&self, out: &mut String, name: &str) {
        out.push_str(&self.quote_identifier(name));
    }
}

/// ANSI dialect: double-quoted identifiers and `?` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }
}

/// Checks that `name` is usable as a table, column or alias name.
///
/// Names must be non-empty, consist of ASCII letters, digits and
/// underscores, and must not start with a digit.
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_owned()))
    }
}
