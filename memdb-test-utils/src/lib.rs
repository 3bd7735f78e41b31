//! memdb Test Utilities
//!
//! Centralized test infrastructure for the memdb workspace:
//! - Proptest generators for values, rows and operation scripts
//! - Test fixtures for common table scenarios
//! - Custom assertions for index and error validation
//! - A recording export sink and tracing setup for tests

// Re-export storage types from their source crate
pub use memdb_storage::{
    read_table, write_table, Column, Database, JsonLinesSink, RowSink, Rows, SharedTable, Table,
};

// Re-export core types for convenience
pub use memdb_core::{
    row, row_from_json, ColumnSpec, ConfigError, Constraint, ExportError, MemdbError,
    MemdbResult, Order, Predicate, QueryOptions, RegistryError, Row, TableConfig, TableError,
    ValidationError, Value,
};

use std::collections::BTreeMap;
use std::sync::Once;

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a test-friendly subscriber filtered by `RUST_LOG` (default `warn`).
/// Safe to call from every test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// RECORDING SINK
// ============================================================================

/// Export sink that keeps everything it receives.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingSink {
    /// Table name to primary key field.
    pub primary_keys: BTreeMap<String, String>,
    /// Table name to batches in arrival order.
    pub batches: BTreeMap<String, Vec<Vec<Row>>>,
    pub finished: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows received for `table`, batches flattened.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.batches
            .get(table)
            .map(|batches| batches.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn batch_sizes(&self, table: &str) -> Vec<usize> {
        self.batches
            .get(table)
            .map(|batches| batches.iter().map(Vec::len).collect())
            .unwrap_or_default()
    }
}

impl RowSink for RecordingSink {
    fn begin_table(&mut self, table: &str, primary_key_field: &str) -> MemdbResult<()> {
        self.primary_keys
            .insert(table.to_string(), primary_key_field.to_string());
        self.batches.entry(table.to_string()).or_default();
        Ok(())
    }

    fn write_batch(&mut self, table: &str, rows: &[Row]) -> MemdbResult<()> {
        self.batches
            .entry(table.to_string())
            .or_default()
            .push(rows.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> MemdbResult<()> {
        self.finished = true;
        Ok(())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating memdb values, rows and scripts.

    use super::*;
    use proptest::prelude::*;

    /// Column names drawn from a small pool so rows overlap.
    pub const COLUMNS: [&str; 4] = ["a", "b", "c", "d"];

    /// Generate any cell value, including `NaN` floats.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            any::<f64>().prop_map(Value::Float),
            "[a-z]{0,8}".prop_map(Value::Text),
        ]
    }

    /// Generate a value from a narrow domain so that buckets collide.
    pub fn arb_small_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            (0i64..4).prop_map(Value::Int),
            "[xy]".prop_map(Value::Text),
        ]
    }

    /// Generate a non-null primary key.
    pub fn arb_key() -> impl Strategy<Value = Value> {
        prop_oneof![
            (0i64..32).prop_map(Value::Int),
            "k[0-9]".prop_map(Value::Text),
        ]
    }

    /// Generate a column name from [`COLUMNS`].
    pub fn arb_column() -> impl Strategy<Value = String> {
        prop::sample::select(COLUMNS.to_vec()).prop_map(str::to_string)
    }

    /// Generate a row over [`COLUMNS`] without a primary key.
    pub fn arb_row() -> impl Strategy<Value = Row> {
        prop::collection::btree_map(arb_column(), arb_small_value(), 0..COLUMNS.len())
    }

    /// Generate a constraint over small values.
    pub fn arb_constraint() -> impl Strategy<Value = Constraint> {
        prop_oneof![
            arb_small_value().prop_map(Constraint::Eq),
            prop::collection::vec(arb_small_value(), 0..3).prop_map(Constraint::In),
        ]
    }

    /// Generate a predicate over [`COLUMNS`].
    pub fn arb_predicate() -> impl Strategy<Value = Predicate> {
        prop::collection::vec((arb_column(), arb_constraint()), 0..3).prop_map(|parts| {
            let mut predicate = Predicate::new();
            for (column, constraint) in parts {
                predicate.push(column, constraint);
            }
            predicate
        })
    }

    /// One step of a table operation script.
    #[derive(Debug, Clone)]
    pub enum TableOp {
        Insert(Row),
        InsertWithKey(Value, Row),
        Update(Predicate, Row),
        Delete(Predicate),
    }

    pub fn arb_table_op() -> impl Strategy<Value = TableOp> {
        prop_oneof![
            arb_row().prop_map(TableOp::Insert),
            (arb_key(), arb_row()).prop_map(|(key, row)| TableOp::InsertWithKey(key, row)),
            (arb_predicate(), arb_row()).prop_map(|(p, row)| TableOp::Update(p, row)),
            arb_predicate().prop_map(TableOp::Delete),
        ]
    }

    /// Apply `op` leniently: constraint errors are expected outcomes here.
    pub fn apply(table: &mut Table, op: &TableOp) -> MemdbResult<usize> {
        let lenient = QueryOptions::lenient();
        match op {
            TableOp::Insert(row) => table.insert(row.clone()).map(|_| 1),
            TableOp::InsertWithKey(key, row) => {
                let mut row = row.clone();
                row.insert(table.primary_key_field().to_string(), key.clone());
                table.insert(row).map(|_| 1)
            }
            TableOp::Update(predicate, assignments) => {
                table.update_with(predicate, assignments, lenient)
            }
            TableOp::Delete(predicate) => table.delete_with(predicate, lenient),
        }
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built tables for common test scenarios.

    use super::*;

    /// 100 rows keyed by `normal` with `squared` and `cubed` columns.
    pub fn squares_table() -> Table {
        let mut table = Table::new("normal").expect("fixture table");
        for i in 0..100i64 {
            table
                .insert(row! { "normal" => i, "squared" => i * i, "cubed" => i * i * i })
                .expect("fixture insert");
        }
        table
    }

    /// Rows `{1, "a"}`, `{2, "b"}`, `{3, "a"}` keyed by `id`.
    pub fn names_table() -> Table {
        let mut table = Table::new("id").expect("fixture table");
        for (id, name) in [(1, "a"), (2, "b"), (3, "a")] {
            table
                .insert(row! { "id" => id, "name" => name })
                .expect("fixture insert");
        }
        table
    }

    /// Three rows with a `score` column defaulting to 0; only row 2 sets it.
    pub fn scored_table() -> Table {
        let mut table = Table::new("id").expect("fixture table");
        table
            .create_column("score", ColumnSpec::new().with_default(0))
            .expect("fixture column");
        table.insert(row! { "id" => 1 }).expect("fixture insert");
        table
            .insert(row! { "id" => 2, "score" => 5 })
            .expect("fixture insert");
        table.insert(row! { "id" => 3 }).expect("fixture insert");
        table
    }

    /// Registry holding `names` and `squares` tables.
    pub fn sample_database() -> Database {
        let mut db = Database::new();
        let names = db.create_table("names", "id").expect("fixture table");
        let squares = db.create_table("squares", "normal").expect("fixture table");

        let mut guard = write_table("names", &names).expect("fixture lock");
        *guard = names_table();
        drop(guard);
        let mut guard = write_table("squares", &squares).expect("fixture lock");
        *guard = squares_table();
        drop(guard);
        db
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for memdb-specific validation.

    use super::*;

    /// Assert that every column index agrees with the live key set.
    pub fn assert_indexes_consistent(table: &Table) {
        assert!(table.is_consistent(), "table indexes are inconsistent: {:?}", table);
    }

    /// Assert that rows carry exactly `expected` primary keys, in order.
    pub fn assert_keys(rows: Rows<'_>, primary_key_field: &str, expected: &[Value]) {
        let keys: Vec<Value> = rows.map(|row| row[primary_key_field].clone()).collect();
        assert_eq!(keys, expected, "unexpected primary keys");
    }

    /// Assert that a result is a unique constraint violation on `column`.
    pub fn assert_unique_violation<T: std::fmt::Debug>(result: &MemdbResult<T>, column: &str) {
        match result {
            Err(MemdbError::Table(TableError::UniqueConstraintViolation {
                column: actual, ..
            })) => assert_eq!(actual, column),
            other => panic!("expected unique violation on {column}, got {other:?}"),
        }
    }

    /// Assert that a result is an unknown column error.
    pub fn assert_unknown_column<T: std::fmt::Debug>(result: &MemdbResult<T>, column: &str) {
        match result {
            Err(MemdbError::Table(TableError::UnknownColumn { column: actual })) => {
                assert_eq!(actual, column)
            }
            other => panic!("expected unknown column {column}, got {other:?}"),
        }
    }

    /// Assert that a result is a registry error.
    pub fn assert_registry_error<T: std::fmt::Debug>(result: &MemdbResult<T>) {
        assert!(
            matches!(result, Err(MemdbError::Registry(_))),
            "Expected registry error, got {:?}",
            result
        );
    }
}
