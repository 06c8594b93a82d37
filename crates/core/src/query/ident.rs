use std::sync::LazyLock;

use regex::Regex;

use super::QueryError;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier regex is valid")
});

/// Validates a table or column name, optionally qualified as `table.column`.
pub fn validate_identifier(name: &str) -> Result<&str, QueryError> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

/// Validates an entry of a select list, which also accepts `*` and `COUNT(*)`.
pub fn validate_column(name: &str) -> Result<&str, QueryError> {
    match name {
        "*" | "COUNT(*)" => Ok(name),
        _ => validate_identifier(name),
    }
}
