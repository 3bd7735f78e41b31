//! memdb Core - Value, Predicate, Config and Error Types
//!
//! Pure data structures shared by the storage engine and its callers.
//! This crate contains no table logic.

pub mod config;
pub mod error;
pub mod filter;
pub mod value;

pub use config::{ColumnSpec, TableConfig};
pub use error::{
    ConfigError, ExportError, MemdbError, MemdbResult, RegistryError, TableError,
    ValidationError,
};
pub use filter::{Constraint, Order, Predicate, QueryOptions};
pub use value::{row_from_json, Row, Value};
