//! Configuration types

use crate::{ConfigError, Value};
use serde::{Deserialize, Serialize};

/// Per-table behavior switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Column holding the row identifier.
    pub primary_key_field: String,
    /// Materialize unknown predicate columns as empty columns instead of
    /// failing. Insert and update assignments always create columns.
    pub auto_create_on_query: bool,
    /// First key handed out to rows inserted without a primary key.
    pub first_auto_key: i64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            primary_key_field: "id".to_string(),
            auto_create_on_query: false,
            first_auto_key: 1,
        }
    }
}

/// `true`/`1`/`yes`/`on` in any case; anything else is `false`.
fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

impl TableConfig {
    pub fn new(primary_key_field: impl Into<String>) -> Self {
        Self {
            primary_key_field: primary_key_field.into(),
            ..Self::default()
        }
    }

    /// Load overrides from `MEMDB_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            primary_key_field: std::env::var("MEMDB_PRIMARY_KEY_FIELD")
                .unwrap_or(defaults.primary_key_field),
            auto_create_on_query: std::env::var("MEMDB_AUTO_CREATE_ON_QUERY")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.auto_create_on_query),
            first_auto_key: std::env::var("MEMDB_FIRST_AUTO_KEY")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.first_auto_key),
        }
    }

    pub fn with_auto_create_on_query(mut self, enabled: bool) -> Self {
        self.auto_create_on_query = enabled;
        self
    }

    pub fn with_first_auto_key(mut self, key: i64) -> Self {
        self.first_auto_key = key;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_key_field.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "primary_key_field".to_string(),
            });
        }
        if self.primary_key_field.trim() != self.primary_key_field {
            return Err(ConfigError::InvalidValue {
                field: "primary_key_field".to_string(),
                value: self.primary_key_field.clone(),
                reason: "must not have leading or trailing whitespace".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for an explicitly created column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    /// Value reported for rows without an explicit cell.
    pub default: Value,
    /// Reject a second row holding the same value.
    pub unique: bool,
}

impl ColumnSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique() -> Self {
        Self {
            unique: true,
            ..Self::default()
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
