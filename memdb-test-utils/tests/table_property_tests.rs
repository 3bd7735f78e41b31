//! Property-Based Tests for Table Indexing
//!
//! **Property 1: Index Consistency**
//!
//! For any script of inserts, updates and deletes, every column's forward
//! and inverse maps agree with each other and with the live key set.
//!
//! **Property 2: Query Exactness**
//!
//! For any predicate, `find` returns exactly the live rows whose
//! materialized values satisfy every constraint, defaults included.
//!
//! **Property 3: Unique Atomicity**
//!
//! A rejected insert changes nothing; a unique column never holds the same
//! value under two keys.

use memdb_test_utils::assertions::assert_indexes_consistent;
use memdb_test_utils::generators::*;
use memdb_test_utils::*;
use proptest::prelude::*;

// ============================================================================
// HELPERS
// ============================================================================

/// Brute-force evaluation of `predicate` over materialized rows.
fn brute_force(table: &Table, predicate: &Predicate) -> Vec<Value> {
    let known: Vec<&str> = table.columns().collect();
    table
        .all(Order::Ascending)
        .filter(|row| {
            predicate
                .iter()
                .filter(|(name, _)| known.contains(name))
                .all(|(name, constraint)| constraint.accepts(&row[name]))
        })
        .map(|row| row[table.primary_key_field()].clone())
        .collect()
}

fn run_script(ops: &[TableOp]) -> Table {
    let mut table = Table::new("id").unwrap();
    for op in ops {
        let _ = apply(&mut table, op);
    }
    table
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// **Property 1: Index Consistency**
    #[test]
    fn prop_indexes_consistent_after_script(
        ops in prop::collection::vec(arb_table_op(), 0..40),
    ) {
        init_test_tracing();
        let table = run_script(&ops);
        prop_assert!(table.is_consistent());
        prop_assert_eq!(table.all(Order::Ascending).count(), table.len());
    }

    /// **Property 2: Query Exactness**
    #[test]
    fn prop_find_matches_brute_force(
        ops in prop::collection::vec(arb_table_op(), 0..30),
        predicate in arb_predicate(),
    ) {
        let mut table = run_script(&ops);
        let expected = brute_force(&table, &predicate);

        let found: Vec<Value> = table
            .find_with(&predicate, QueryOptions::lenient())
            .map_err(|e| TestCaseError::fail(e.to_string()))?
            .map(|row| row["id"].clone())
            .collect();
        prop_assert_eq!(found, expected);
    }

    /// **Property 2: Query Exactness** (descending order)
    #[test]
    fn prop_descending_reverses_ascending(
        ops in prop::collection::vec(arb_table_op(), 0..30),
    ) {
        let table = run_script(&ops);
        let mut ascending: Vec<Row> = table.all(Order::Ascending).collect();
        ascending.reverse();
        let descending: Vec<Row> = table.all(Order::Descending).collect();
        prop_assert_eq!(ascending, descending);
    }

    /// **Property 3: Unique Atomicity**
    #[test]
    fn prop_rejected_insert_changes_nothing(
        rows in prop::collection::vec(arb_row(), 1..30),
    ) {
        let mut table = Table::new("id").unwrap();
        table
            .create_column("a", ColumnSpec::unique())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        for row in rows {
            let before: Vec<Row> = table.all(Order::Ascending).collect();
            if table.insert(row).is_err() {
                let after: Vec<Row> = table.all(Order::Ascending).collect();
                prop_assert_eq!(before, after);
            }
        }

        let column = table.column("a").map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(column.distinct_values(), column.len());
        prop_assert!(table.is_consistent());
    }

    /// **Property 3: Unique Atomicity** (updates)
    #[test]
    fn prop_unique_survives_updates(
        rows in prop::collection::vec(arb_row(), 1..20),
        updates in prop::collection::vec((arb_predicate(), arb_small_value()), 0..20),
    ) {
        let mut table = Table::new("id").unwrap();
        table
            .create_column("b", ColumnSpec::unique())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        for row in rows {
            let _ = table.insert(row);
        }
        for (predicate, value) in updates {
            let assignments = row! { "b" => value };
            let _ = table.update_with(&predicate, &assignments, QueryOptions::lenient());
        }

        let column = table.column("b").map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(column.distinct_values(), column.len());
        assert_indexes_consistent(&table);
    }
}
