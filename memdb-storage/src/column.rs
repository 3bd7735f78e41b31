//! Per-column storage with a forward and an inverse index.
//!
//! A [`Column`] keeps two maps that are always exact inverses of each other:
//! `cells` (primary key to explicit value) and `values` (value to the set of
//! primary keys holding it). Rows that never received a value for the column
//! appear in neither map and report the column default instead.

use memdb_core::{ColumnSpec, TableError, Value};
use std::collections::{BTreeSet, HashMap};

static NO_KEYS: BTreeSet<Value> = BTreeSet::new();

/// One attribute of a table across all rows.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    default: Value,
    unique: bool,
    cells: HashMap<Value, Value>,
    values: HashMap<Value, BTreeSet<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, spec: ColumnSpec) -> Self {
        Self {
            name: name.into(),
            default: spec.default,
            unique: spec.unique,
            cells: HashMap::new(),
            values: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Validate that `key` may hold `value` without writing anything.
    ///
    /// Fails only for unique columns where another key already holds
    /// `value`; a key re-asserting its own value is accepted.
    pub fn check(&self, key: &Value, value: &Value) -> Result<(), TableError> {
        if !self.unique {
            return Ok(());
        }
        match self.values.get(value) {
            Some(holders) if holders.iter().any(|holder| holder != key) => {
                Err(TableError::UniqueConstraintViolation {
                    column: self.name.clone(),
                    value: value.clone(),
                    existing: holders.iter().cloned().collect(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Store `value` for `key`, enforcing uniqueness.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), TableError> {
        self.check(&key, &value)?;
        self.set(key, value);
        Ok(())
    }

    /// Store `value` for `key` without validation, moving the key out of the
    /// bucket of any value it held before.
    pub(crate) fn set(&mut self, key: Value, value: Value) {
        if let Some(previous) = self.cells.insert(key.clone(), value.clone()) {
            if previous == value {
                return;
            }
            self.unlink(&key, &previous);
        }
        self.values.entry(value).or_default().insert(key);
    }

    /// Remove the explicit value for `key`, returning it.
    ///
    /// Returns `None` when the key has no explicit cell in this column.
    pub fn drop(&mut self, key: &Value) -> Option<Value> {
        let value = self.cells.remove(key)?;
        self.unlink(key, &value);
        Some(value)
    }

    fn unlink(&mut self, key: &Value, value: &Value) {
        if let Some(holders) = self.values.get_mut(value) {
            holders.remove(key);
            if holders.is_empty() {
                self.values.remove(value);
            }
        }
    }

    /// Keys whose explicit value equals `value`.
    ///
    /// Rows relying on the default are not included.
    pub fn find(&self, value: &Value) -> &BTreeSet<Value> {
        self.values.get(value).unwrap_or(&NO_KEYS)
    }

    /// Explicit value for `key`, or the column default.
    pub fn find_value(&self, key: &Value) -> &Value {
        self.cells.get(key).unwrap_or(&self.default)
    }

    /// Explicit value for `key`, if any.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.cells.get(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.cells.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.cells.keys()
    }

    /// Number of distinct explicit values.
    pub fn distinct_values(&self) -> usize {
        self.values.len()
    }

    /// Number of explicit cells, not the number of live rows.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check that the forward and inverse maps mirror each other and that
    /// unique columns never share a bucket.
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.cells.iter().all(|(key, value)| {
            self.values
                .get(value)
                .is_some_and(|holders| holders.contains(key))
        });
        let inverse_ok = self.values.iter().all(|(value, holders)| {
            !holders.is_empty()
                && (!self.unique || holders.len() == 1)
                && holders
                    .iter()
                    .all(|key| self.cells.get(key) == Some(value))
        });
        let indexed: usize = self.values.values().map(BTreeSet::len).sum();
        forward_ok && inverse_ok && indexed == self.cells.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(column: &Column, value: impl Into<Value>) -> Vec<Value> {
        column.find(&value.into()).iter().cloned().collect()
    }

    #[test]
    fn test_insert_indexes_both_directions() {
        let mut column = Column::new("b", ColumnSpec::default());
        column.insert(Value::Int(1), Value::Int(2)).unwrap();
        column.insert(Value::Int(2), Value::Int(2)).unwrap();

        assert_eq!(keys(&column, 2), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(column.find_value(&Value::Int(1)), &Value::Int(2));
        assert_eq!(column.len(), 2);
        assert_eq!(column.distinct_values(), 1);
        assert!(column.is_consistent());
    }

    #[test]
    fn test_unique_rejects_second_holder() {
        let mut column = Column::new("a", ColumnSpec::unique());
        column.insert(Value::Int(1), Value::Int(1)).unwrap();

        let err = column.insert(Value::Int(2), Value::Int(1)).unwrap_err();
        assert_eq!(
            err,
            TableError::UniqueConstraintViolation {
                column: "a".to_string(),
                value: Value::Int(1),
                existing: vec![Value::Int(1)],
            }
        );
        assert!(!column.contains_key(&Value::Int(2)));
        assert!(column.is_consistent());
    }

    #[test]
    fn test_unique_accepts_same_key_same_value() {
        let mut column = Column::new("a", ColumnSpec::unique());
        column.insert(Value::Int(1), Value::from("x")).unwrap();
        assert!(column.check(&Value::Int(1), &Value::from("x")).is_ok());
    }

    #[test]
    fn test_drop_removes_empty_bucket() {
        let mut column = Column::new("b", ColumnSpec::default());
        column.insert(Value::Int(1), Value::Int(5)).unwrap();

        assert_eq!(column.drop(&Value::Int(1)), Some(Value::Int(5)));
        assert!(column.find(&Value::Int(5)).is_empty());
        assert_eq!(column.distinct_values(), 0);
        assert!(column.is_empty());
    }

    #[test]
    fn test_drop_absent_key_is_none() {
        let mut column = Column::new("b", ColumnSpec::default());
        assert_eq!(column.drop(&Value::Int(9)), None);
    }

    #[test]
    fn test_overwrite_moves_key_between_buckets() {
        let mut column = Column::new("b", ColumnSpec::default());
        column.insert(Value::Int(1), Value::Int(5)).unwrap();
        column.insert(Value::Int(2), Value::Int(5)).unwrap();
        column.insert(Value::Int(1), Value::Int(6)).unwrap();

        assert_eq!(keys(&column, 5), vec![Value::Int(2)]);
        assert_eq!(keys(&column, 6), vec![Value::Int(1)]);
        assert!(column.is_consistent());
    }

    #[test]
    fn test_find_value_falls_back_to_default() {
        let column = Column::new("score", ColumnSpec::new().with_default(0));
        assert_eq!(column.find_value(&Value::Int(42)), &Value::Int(0));
        assert!(column.find(&Value::Int(0)).is_empty());
    }
}
