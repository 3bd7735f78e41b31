//! Table registry.
//!
//! Each table sits behind its own `RwLock`; there is no locking inside a
//! table, so the lock is the unit of isolation between threads.

use crate::{RowSink, Table};
use memdb_core::{ConfigError, MemdbResult, Order, RegistryError, Row, TableConfig};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// A table shared between the registry and its callers.
pub type SharedTable = Arc<RwLock<Table>>;

/// Named collection of tables.
#[derive(Debug, Default)]
pub struct Database {
    tables: BTreeMap<String, SharedTable>,
    template: TableConfig,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose implicitly created tables use `template`.
    pub fn with_table_config(template: TableConfig) -> MemdbResult<Self> {
        template.validate()?;
        Ok(Self {
            tables: BTreeMap::new(),
            template,
        })
    }

    /// Create a table keyed by `primary_key_field`, other settings from the template.
    pub fn create_table(
        &mut self,
        name: &str,
        primary_key_field: &str,
    ) -> MemdbResult<SharedTable> {
        let config = TableConfig {
            primary_key_field: primary_key_field.to_string(),
            ..self.template.clone()
        };
        self.create_table_with(name, config)
    }

    pub fn create_table_with(
        &mut self,
        name: &str,
        config: TableConfig,
    ) -> MemdbResult<SharedTable> {
        if self.tables.contains_key(name) {
            return Err(RegistryError::TableAlreadyExists {
                name: name.to_string(),
            }
            .into());
        }
        let table = Arc::new(RwLock::new(Table::with_config(config)?));
        self.tables.insert(name.to_string(), Arc::clone(&table));
        debug!(table = %name, "table created");
        Ok(table)
    }

    pub fn table(&self, name: &str) -> MemdbResult<SharedTable> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| {
                RegistryError::TableNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Look up `name`, creating it from the template when absent.
    pub fn table_or_create(&mut self, name: &str) -> MemdbResult<SharedTable> {
        if let Some(table) = self.tables.get(name) {
            return Ok(Arc::clone(table));
        }
        self.create_table_with(name, self.template.clone())
    }

    /// Remove a table and release its contents.
    ///
    /// Handles still held by callers keep the table alive until dropped.
    pub fn drop_table(&mut self, name: &str) -> MemdbResult<()> {
        let shared = self
            .tables
            .remove(name)
            .ok_or_else(|| RegistryError::TableNotFound {
                name: name.to_string(),
            })?;
        match Arc::try_unwrap(shared) {
            Ok(lock) => {
                let table = lock.into_inner().map_err(|_| RegistryError::LockPoisoned {
                    name: name.to_string(),
                })?;
                table.release();
            }
            Err(_) => debug!(table = %name, "table still referenced after drop"),
        }
        debug!(table = %name, "table dropped");
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Hand every table's rows to `sink` in key order, `chunk_size` rows per
    /// batch. Returns the number of rows exported.
    pub fn export<S: RowSink>(&self, sink: &mut S, chunk_size: usize) -> MemdbResult<usize> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size".to_string(),
                value: chunk_size.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        let mut exported = 0;
        for (name, shared) in &self.tables {
            let table = read_table(name, shared)?;
            sink.begin_table(name, table.primary_key_field())?;

            let mut batch: Vec<Row> = Vec::with_capacity(chunk_size.min(table.len()));
            for row in table.all(Order::Ascending) {
                batch.push(row);
                if batch.len() == chunk_size {
                    sink.write_batch(name, &batch)?;
                    exported += batch.len();
                    batch.clear();
                }
            }
            if !batch.is_empty() {
                sink.write_batch(name, &batch)?;
                exported += batch.len();
            }
            debug!(table = %name, rows = table.len(), "table exported");
        }
        sink.finish()?;
        Ok(exported)
    }
}

/// Acquire a table for reading.
pub fn read_table<'a>(
    name: &str,
    table: &'a SharedTable,
) -> MemdbResult<RwLockReadGuard<'a, Table>> {
    table.read().map_err(|_| {
        RegistryError::LockPoisoned {
            name: name.to_string(),
        }
        .into()
    })
}

/// Acquire a table for writing.
pub fn write_table<'a>(
    name: &str,
    table: &'a SharedTable,
) -> MemdbResult<RwLockWriteGuard<'a, Table>> {
    table.write().map_err(|_| {
        RegistryError::LockPoisoned {
            name: name.to_string(),
        }
        .into()
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonLinesSink;
    use memdb_core::{row, MemdbError, Predicate, QueryOptions};

    #[test]
    fn test_create_and_lookup() {
        let mut db = Database::new();
        let users = db.create_table("users", "pk").unwrap();
        write_table("users", &users)
            .unwrap()
            .insert(row! { "name" => "a" })
            .unwrap();

        let again = db.table("users").unwrap();
        assert_eq!(read_table("users", &again).unwrap().len(), 1);
        assert_eq!(read_table("users", &again).unwrap().primary_key_field(), "pk");
        assert_eq!(db.table_names(), vec!["users".to_string()]);
    }

    #[test]
    fn test_select_under_read_guard() {
        let mut db = Database::new();
        let users = db.create_table("users", "id").unwrap();
        write_table("users", &users)
            .unwrap()
            .insert_many([row! { "name" => "a" }, row! { "name" => "b" }])
            .unwrap();

        let first = read_table("users", &users).unwrap();
        let second = read_table("users", &users).unwrap();
        let rows: Vec<Row> = first
            .select(&Predicate::eq("name", "b"), QueryOptions::strict())
            .unwrap()
            .collect();
        assert_eq!(rows, vec![row! { "id" => 2, "name" => "b" }]);
        assert_eq!(second.all(Order::Ascending).count(), 2);
    }

    #[test]
    fn test_duplicate_table_name() {
        let mut db = Database::new();
        db.create_table("t", "id").unwrap();
        let err = db.create_table("t", "id").unwrap_err();
        assert!(matches!(
            err,
            MemdbError::Registry(RegistryError::TableAlreadyExists { .. })
        ));
    }

    #[test]
    fn test_table_or_create_uses_template() {
        let mut db = Database::with_table_config(TableConfig::new("pk")).unwrap();
        let t = db.table_or_create("auto").unwrap();
        assert_eq!(read_table("auto", &t).unwrap().primary_key_field(), "pk");
        assert_eq!(db.len(), 1);

        db.table_or_create("auto").unwrap();
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_drop_table() {
        let mut db = Database::new();
        db.create_table("gone", "id").unwrap();
        db.drop_table("gone").unwrap();

        assert!(db.is_empty());
        assert!(matches!(
            db.table("gone").unwrap_err(),
            MemdbError::Registry(RegistryError::TableNotFound { .. })
        ));
        assert!(db.drop_table("gone").is_err());
    }

    #[test]
    fn test_export_json_lines() {
        let mut db = Database::new();
        let t = db.create_table("b_table", "id").unwrap();
        {
            let mut table = write_table("b_table", &t).unwrap();
            table.insert(row! { "id" => 2, "x" => "two" }).unwrap();
            table.insert(row! { "id" => 1, "x" => "one" }).unwrap();
            table.delete(&Predicate::eq("id", 2)).unwrap();
        }
        db.create_table("a_table", "k").unwrap();

        let mut sink = JsonLinesSink::new(Vec::new());
        assert_eq!(db.export(&mut sink, 1000).unwrap(), 1);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "{\"table\":\"b_table\",\"primary_key\":\"id\",\"row\":{\"id\":1,\"x\":\"one\"}}\n"
        );
    }

    #[test]
    fn test_export_rejects_zero_chunk() {
        let db = Database::new();
        let mut sink = JsonLinesSink::new(Vec::new());
        assert!(matches!(
            db.export(&mut sink, 0).unwrap_err(),
            MemdbError::Config(_)
        ));
    }
}
