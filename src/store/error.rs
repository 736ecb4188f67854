use thiserror::Error;

use crate::sheets::SheetsError;

/// Row store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid value for field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("{0}")]
    NotFound(String),

    /// The sheet's header lacks a column the operation has to write.
    #[error("Table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error(transparent)]
    Sheets(#[from] SheetsError),
}

impl StoreError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError::NotFound(message.into())
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        StoreError::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Names of the fields a validation error is about.
    pub fn fields(&self) -> Vec<String> {
        match self {
            StoreError::MissingFields(fields) => fields.clone(),
            StoreError::InvalidField { field, .. } => vec![field.clone()],
            _ => Vec::new(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::MissingFields(_) | StoreError::InvalidField { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_fields() {
        let err = StoreError::MissingFields(vec!["customerName".into(), "customerPhone".into()]);
        assert_eq!(err.to_string(), "Missing required fields: customerName, customerPhone");
        assert_eq!(err.fields().len(), 2);

        let err = StoreError::invalid("status", "must be one of pending, processing");
        assert!(err.to_string().contains("'status'"));
        assert!(err.is_validation());
    }
}
