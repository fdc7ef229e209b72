//! SQLite dialect implementation.

use oxide_query_core::dialect::{is_reserved_word, Dialect};

/// Keywords SQLite reserves beyond the common set.
const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT", "AUTOINCREMENT", "CONFLICT", "GLOB", "IGNORE", "INDEXED", "ISNULL", "NOTNULL",
    "PRAGMA", "RAISE", "REGEXP", "REPLACE", "VACUUM",
];

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '"' // SQLite also accepts backticks, but double quotes are standard
    }

    fn is_reserved(&self, word: &str) -> bool {
        is_reserved_word(word) || SQLITE_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.parameter_placeholder(), "?");
    }

    #[test]
    fn test_sqlite_keywords_are_quoted() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.quote_identifier("replace"), "\"replace\"");
        assert_eq!(dialect.quote_identifier("Order"), "\"Order\"");
        assert_eq!(dialect.quote_identifier("Artist"), "Artist");
    }
}
