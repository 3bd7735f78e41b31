//! Fuzz test for JSON row decoding
//!
//! Any JSON document must either decode into a row or fail with a
//! validation error; decoded rows must insert or fail cleanly.
//!
//! Run with: cargo +nightly fuzz run row_json_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use memdb_storage::{Table, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(row) = memdb_storage::row_from_json(json) else {
        return;
    };

    let Ok(mut table) = Table::new("id") else {
        return;
    };
    let null_key = matches!(row.get("id"), Some(Value::Null));
    match table.insert(row) {
        Ok(key) => {
            assert!(!null_key);
            assert!(table.get(&key).is_ok());
        }
        Err(_) => assert!(table.is_empty()),
    }
    assert!(table.is_consistent());
});
