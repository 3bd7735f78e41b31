//! Fuzz test for table mutations
//!
//! Interprets the input as a script of inserts, updates and deletes over a
//! table with one unique column, and checks after every step that the
//! column indexes still agree with the live key set.
//!
//! Run with: cargo +nightly fuzz run table_ops_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use memdb_storage::{ColumnSpec, Order, Predicate, QueryOptions, Row, Table, Value};

const COLUMNS: [&str; 3] = ["a", "b", "u"];

fn value(byte: u8) -> Value {
    match byte % 5 {
        0 => Value::Null,
        1 => Value::Bool(byte & 0x80 != 0),
        2 => Value::Int(i64::from(byte >> 4)),
        3 => Value::Float(f64::from(byte >> 5) / 2.0),
        _ => Value::Text(((b'a' + (byte >> 5)) as char).to_string()),
    }
}

fn column(byte: u8) -> &'static str {
    COLUMNS[usize::from(byte) % COLUMNS.len()]
}

fuzz_target!(|data: &[u8]| {
    let Ok(mut table) = Table::new("id") else {
        return;
    };
    if table.create_column("u", ColumnSpec::unique()).is_err() {
        return;
    }
    let lenient = QueryOptions::lenient();

    for step in data.chunks_exact(4) {
        let (op, col, v1, v2) = (step[0], step[1], step[2], step[3]);
        let before = table.len();
        match op % 4 {
            0 => {
                let mut row = Row::new();
                row.insert(column(col).to_string(), value(v1));
                row.insert(column(col >> 2).to_string(), value(v2));
                if table.insert(row).is_ok() {
                    assert_eq!(table.len(), before + 1);
                } else {
                    assert_eq!(table.len(), before);
                }
            }
            1 => {
                let mut row = Row::new();
                row.insert("id".to_string(), value(v1));
                row.insert(column(col).to_string(), value(v2));
                let _ = table.insert(row);
            }
            2 => {
                let predicate = Predicate::eq(column(col), value(v1));
                let mut assignments = Row::new();
                assignments.insert(column(col >> 2).to_string(), value(v2));
                let _ = table.update_with(&predicate, &assignments, lenient);
                assert_eq!(table.len(), before);
            }
            _ => {
                let predicate = Predicate::is_in(column(col), [value(v1), value(v2)]);
                if let Ok(removed) = table.delete_with(&predicate, lenient) {
                    assert_eq!(table.len(), before - removed);
                }
            }
        }
        assert!(table.is_consistent(), "indexes diverged after op {}", op % 4);
    }

    assert_eq!(table.all(Order::Descending).count(), table.len());
});
