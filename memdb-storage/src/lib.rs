//! memdb Storage - Indexed In-Memory Tables
//!
//! [`Table`] keeps rows as primary keys plus cells spread over [`Column`]s,
//! each with a forward (key to value) and an inverse (value to keys) index.
//! [`Database`] is the registry that names tables and exports them through
//! a [`RowSink`].

pub mod column;
pub mod database;
pub mod export;
pub mod rows;
pub mod table;

pub use column::Column;
pub use database::{read_table, write_table, Database, SharedTable};
pub use export::{JsonLinesSink, RowSink};
pub use rows::Rows;
pub use table::Table;

// Re-export core types for convenience
pub use memdb_core::{
    row, row_from_json, ColumnSpec, Constraint, MemdbError, MemdbResult, Order, Predicate,
    QueryOptions, Row, TableConfig, TableError, Value,
};
