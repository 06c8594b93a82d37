use thiserror::Error;

/// Errors raised while lowering a query to SQL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No table selected")]
    NoTable,
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("Invalid operator: '{0}'")]
    InvalidOperator(String),
    #[error("Cannot {0} an empty record")]
    EmptyRecord(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_identifier_display() {
        let error = QueryError::InvalidIdentifier("id; DROP TABLE posts".to_string());
        assert_eq!(error.to_string(), "Invalid identifier: 'id; DROP TABLE posts'");
    }

    #[test]
    fn test_empty_record_display() {
        assert_eq!(
            QueryError::EmptyRecord("insert").to_string(),
            "Cannot insert an empty record"
        );
    }
}
