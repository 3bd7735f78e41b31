//! Error types for memdb operations

use crate::Value;
use thiserror::Error;

/// Table and column level errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Unique constraint violated on column {column}: {value} already present (rows {existing:?})")]
    UniqueConstraintViolation {
        column: String,
        value: Value,
        existing: Vec<Value>,
    },

    #[error("Column {column} does not exist")]
    UnknownColumn { column: String },

    #[error("Column {column} already exists")]
    ColumnAlreadyExists { column: String },

    #[error("Column {column} cannot be modified: {reason}")]
    ProtectedColumn { column: String, reason: String },

    #[error("No matching rows found for {predicate}")]
    NoMatchingRows { predicate: String },

    #[error("Invalid order {token:?}: expected unordered, ascending or descending")]
    InvalidOrder { token: String },

    #[error("Row {key} does not exist")]
    RowAbsent { key: Value },

    #[error("Invalid primary key: {reason}")]
    InvalidPrimaryKey { reason: String },

    #[error("Primary key column {column} cannot be updated")]
    PrimaryKeyImmutable { column: String },

    #[error("Automatic primary keys exhausted")]
    KeySpaceExhausted,
}

/// Table registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Table with name {name} already exists in the database")]
    TableAlreadyExists { name: String },

    #[error("Table {name} not found")]
    TableNotFound { name: String },

    #[error("Lock poisoned for table {name}")]
    LockPoisoned { name: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Input validation errors (JSON conversion, predicate construction).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported value: {reason}")]
    UnsupportedValue { reason: String },

    #[error("Invalid predicate: {reason}")]
    InvalidPredicate { reason: String },
}

/// Row export errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("Export I/O failed: {reason}")]
    Io { reason: String },

    #[error("Export serialization failed for table {table}: {reason}")]
    Serialization { table: String, reason: String },
}

/// Master error type for all memdb errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MemdbError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Result type alias for memdb operations.
pub type MemdbResult<T> = Result<T, MemdbError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_names_value_and_rows() {
        let err = TableError::UniqueConstraintViolation {
            column: "email".to_string(),
            value: Value::from("a@b.c"),
            existing: vec![Value::Int(7)],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("email"));
        assert!(msg.contains("a@b.c"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_invalid_order_display() {
        let err = TableError::InvalidOrder {
            token: "sideways".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("sideways"));
        assert!(msg.contains("ascending"));
    }

    #[test]
    fn test_registry_error_display_already_exists() {
        let err = RegistryError::TableAlreadyExists {
            name: "users".to_string(),
        };
        assert!(format!("{}", err).contains("users"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "primary_key_field".to_string(),
            value: "".to_string(),
            reason: "must not be empty".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("primary_key_field"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_memdb_error_from_variants() {
        let table = MemdbError::from(TableError::KeySpaceExhausted);
        assert!(matches!(table, MemdbError::Table(_)));

        let registry = MemdbError::from(RegistryError::TableNotFound {
            name: "t".to_string(),
        });
        assert!(matches!(registry, MemdbError::Registry(_)));

        let config = MemdbError::from(ConfigError::MissingRequired {
            field: "primary_key_field".to_string(),
        });
        assert!(matches!(config, MemdbError::Config(_)));

        let validation = MemdbError::from(ValidationError::UnsupportedValue {
            reason: "array".to_string(),
        });
        assert!(matches!(validation, MemdbError::Validation(_)));

        let export = MemdbError::from(ExportError::Io {
            reason: "broken pipe".to_string(),
        });
        assert!(matches!(export, MemdbError::Export(_)));
    }
}
