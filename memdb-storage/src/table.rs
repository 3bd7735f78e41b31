//! Tables: rows scattered across indexed columns.
//!
//! A row has no object of its own. It is a primary key in the live key set
//! plus whatever explicit cells the columns hold for that key. Queries are
//! answered from the columns' inverse indexes and intersected per
//! constraint; rows are only assembled when they are read.

use crate::{Column, Rows};
use memdb_core::{
    ColumnSpec, Constraint, MemdbResult, Order, Predicate, QueryOptions, Row, TableConfig,
    TableError, Value,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

/// In-memory table with per-column secondary indexes.
#[derive(Debug, Clone)]
pub struct Table {
    config: TableConfig,
    columns: BTreeMap<String, Column>,
    keys: BTreeSet<Value>,
    /// Next automatic key; `None` once `i64::MAX` has been used.
    next_key: Option<i64>,
}

impl Default for Table {
    fn default() -> Self {
        Self::build(TableConfig::default())
    }
}

impl Table {
    /// Create a table identified by `primary_key_field`, other settings default.
    ///
    /// The field is validated like any other configuration, so an empty or
    /// padded name is rejected.
    pub fn new(primary_key_field: impl Into<String>) -> MemdbResult<Self> {
        Self::with_config(TableConfig::new(primary_key_field))
    }

    /// Create a table from a validated configuration.
    pub fn with_config(config: TableConfig) -> MemdbResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TableConfig) -> Self {
        let primary_key_field = config.primary_key_field.clone();
        let mut columns = BTreeMap::new();
        columns.insert(
            primary_key_field.clone(),
            Column::new(primary_key_field, ColumnSpec::unique()),
        );
        Self {
            next_key: Some(config.first_auto_key),
            config,
            columns,
            keys: BTreeSet::new(),
        }
    }

    pub fn primary_key_field(&self) -> &str {
        &self.config.primary_key_field
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.keys.iter()
    }

    /// Column names in sorted order, primary key included.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.columns
            .get(name)
            .ok_or_else(|| TableError::UnknownColumn {
                column: name.to_string(),
            })
    }

    // === Schema ===

    /// Create a column with an explicit default and uniqueness.
    pub fn create_column(&mut self, name: impl Into<String>, spec: ColumnSpec) -> MemdbResult<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(TableError::ColumnAlreadyExists { column: name }.into());
        }
        debug!(column = %name, default = %spec.default, unique = spec.unique, "column created");
        self.columns.insert(name.clone(), Column::new(name, spec));
        Ok(())
    }

    /// Remove a column and every cell it holds.
    pub fn drop_column(&mut self, name: &str) -> MemdbResult<Column> {
        if name == self.config.primary_key_field {
            return Err(TableError::ProtectedColumn {
                column: name.to_string(),
                reason: "the primary key column identifies rows".to_string(),
            }
            .into());
        }
        let column = self
            .columns
            .remove(name)
            .ok_or_else(|| TableError::UnknownColumn {
                column: name.to_string(),
            })?;
        debug!(column = %name, cells = column.len(), "column dropped");
        Ok(column)
    }

    fn column_mut(&mut self, name: String) -> &mut Column {
        self.columns.entry(name).or_insert_with_key(|name| {
            debug!(column = %name, "column created implicitly");
            Column::new(name.clone(), ColumnSpec::default())
        })
    }

    // === Insert ===

    /// Insert a row and return its primary key.
    ///
    /// A row without the primary key field gets the next free integer key,
    /// which is also written into the row. Every unique column is checked
    /// before anything is written, so a failed insert leaves no trace.
    pub fn insert(&mut self, mut row: Row) -> MemdbResult<Value> {
        let primary_key_field = self.config.primary_key_field.clone();
        let key = match row.get(&primary_key_field) {
            Some(Value::Null) => {
                return Err(TableError::InvalidPrimaryKey {
                    reason: format!("{} must not be null", primary_key_field),
                }
                .into())
            }
            Some(key) => key.clone(),
            None => {
                let key = Value::Int(self.next_free_key()?);
                row.insert(primary_key_field.clone(), key.clone());
                key
            }
        };

        if self.keys.contains(&key) {
            warn!(column = %primary_key_field, key = %key, "duplicate primary key rejected");
            return Err(TableError::UniqueConstraintViolation {
                column: primary_key_field,
                value: key.clone(),
                existing: vec![key],
            }
            .into());
        }
        for (name, value) in &row {
            if let Some(column) = self.columns.get(name) {
                if let Err(err) = column.check(&key, value) {
                    warn!(column = %name, value = %value, "unique constraint rejected insert");
                    return Err(err.into());
                }
            }
        }

        for (name, value) in row {
            self.column_mut(name).set(key.clone(), value);
        }
        self.keys.insert(key.clone());
        self.advance_key_hint(&key);
        trace!(key = %key, "row inserted");
        Ok(key)
    }

    /// Insert rows in order, each atomically. Stops at the first failure;
    /// rows inserted before it remain.
    pub fn insert_many<I>(&mut self, rows: I) -> MemdbResult<Vec<Value>>
    where
        I: IntoIterator<Item = Row>,
    {
        rows.into_iter().map(|row| self.insert(row)).collect()
    }

    /// Insert `row` unless a live row already agrees with it on every
    /// column in `match_columns`. Returns `None` when such a row exists.
    pub fn insert_ignore<S: AsRef<str>>(
        &mut self,
        row: Row,
        match_columns: &[S],
    ) -> MemdbResult<Option<Value>> {
        let mut predicate = Predicate::new();
        for name in match_columns {
            let name = name.as_ref();
            let Some(column) = self.columns.get(name) else {
                // Every live row reads Null from a column the table has never seen.
                if row.get(name).map_or(true, Value::is_null) {
                    continue;
                }
                return self.insert(row).map(Some);
            };
            let value = row
                .get(name)
                .unwrap_or_else(|| column.default_value())
                .clone();
            predicate = predicate.and_eq(name, value);
        }

        if !self.matching_keys(&predicate, false).is_empty() {
            trace!(predicate = %predicate, "matching row present, insert skipped");
            return Ok(None);
        }
        self.insert(row).map(Some)
    }

    fn next_free_key(&self) -> Result<i64, TableError> {
        let mut candidate = self.next_key.ok_or(TableError::KeySpaceExhausted)?;
        while self.keys.contains(&Value::Int(candidate)) {
            candidate = candidate
                .checked_add(1)
                .ok_or(TableError::KeySpaceExhausted)?;
        }
        Ok(candidate)
    }

    /// Keep automatic keys ahead of every integer key ever stored.
    fn advance_key_hint(&mut self, key: &Value) {
        if let (Value::Int(key), Some(next)) = (key, self.next_key) {
            if *key >= next {
                self.next_key = key.checked_add(1);
            }
        }
    }

    // === Query ===

    /// Rows matching every constraint of `predicate`.
    ///
    /// Fails with `UnknownColumn` for constraints on columns the table does
    /// not have, unless the table auto-creates columns on query.
    pub fn find(&mut self, predicate: &Predicate) -> MemdbResult<Rows<'_>> {
        self.find_with(predicate, QueryOptions::strict())
    }

    pub fn find_with(
        &mut self,
        predicate: &Predicate,
        options: QueryOptions,
    ) -> MemdbResult<Rows<'_>> {
        let keys = self.resolve(predicate, options)?;
        trace!(predicate = %predicate, matched = keys.len(), "find resolved");
        Ok(Rows::new(self, keys.into_iter().collect()))
    }

    /// Read-only [`Table::find_with`], usable through a shared borrow.
    ///
    /// Unknown columns follow the same policy, except that with
    /// `auto_create_on_query` they are evaluated as empty columns (every row
    /// reads `Null`) instead of being created.
    pub fn select(&self, predicate: &Predicate, options: QueryOptions) -> MemdbResult<Rows<'_>> {
        if !options.ignore_unknown_columns && !self.config.auto_create_on_query {
            if let Some(name) = predicate
                .columns()
                .find(|name| !self.columns.contains_key(*name))
            {
                return Err(TableError::UnknownColumn {
                    column: name.to_string(),
                }
                .into());
            }
        }
        let keys = self.matching_keys(predicate, !options.ignore_unknown_columns);
        trace!(predicate = %predicate, matched = keys.len(), "select resolved");
        Ok(Rows::new(self, keys.into_iter().collect()))
    }

    /// Every live row. `Unordered` and `Ascending` both follow key order.
    pub fn all(&self, order: Order) -> Rows<'_> {
        let mut keys: Vec<Value> = self.keys.iter().cloned().collect();
        if order == Order::Descending {
            keys.reverse();
        }
        Rows::new(self, keys)
    }

    /// [`Table::all`] with the order given as a token such as `"desc"`.
    pub fn all_by(&self, order: &str) -> MemdbResult<Rows<'_>> {
        Ok(self.all(order.parse::<Order>()?))
    }

    /// Materialize the row stored under `key`.
    pub fn get(&self, key: &Value) -> Result<Row, TableError> {
        if !self.keys.contains(key) {
            return Err(TableError::RowAbsent { key: key.clone() });
        }
        Ok(self.materialize(key))
    }

    pub(crate) fn materialize(&self, key: &Value) -> Row {
        let mut row: Row = self
            .columns
            .iter()
            .map(|(name, column)| (name.clone(), column.find_value(key).clone()))
            .collect();
        row.insert(self.config.primary_key_field.clone(), key.clone());
        row
    }

    /// Apply the unknown-column policy, then compute the matching keys.
    fn resolve(
        &mut self,
        predicate: &Predicate,
        options: QueryOptions,
    ) -> MemdbResult<BTreeSet<Value>> {
        for name in predicate.columns() {
            if self.columns.contains_key(name) || options.ignore_unknown_columns {
                continue;
            }
            if !self.config.auto_create_on_query {
                return Err(TableError::UnknownColumn {
                    column: name.to_string(),
                }
                .into());
            }
            self.column_mut(name.to_string());
        }
        Ok(self.matching_keys(predicate, false))
    }

    /// Intersect per-constraint candidates; no constraints at all selects
    /// every live key. A constraint on an absent column is skipped, or with
    /// `absent_reads_null` treated as a column where every row holds `Null`.
    fn matching_keys(&self, predicate: &Predicate, absent_reads_null: bool) -> BTreeSet<Value> {
        let mut matched: Option<BTreeSet<Value>> = None;
        for (name, constraint) in predicate.iter() {
            let candidates = match self.columns.get(name) {
                Some(column) => self.candidates(column, constraint),
                None if absent_reads_null && constraint.accepts(&Value::Null) => {
                    self.keys.clone()
                }
                None if absent_reads_null => BTreeSet::new(),
                None => continue,
            };
            let narrowed = match matched {
                None => candidates,
                Some(acc) => acc.intersection(&candidates).cloned().collect(),
            };
            if narrowed.is_empty() {
                return narrowed;
            }
            matched = Some(narrowed);
        }
        matched.unwrap_or_else(|| self.keys.clone())
    }

    /// Keys satisfying one constraint. A constraint that accepts the column
    /// default also admits every live key without an explicit cell.
    fn candidates(&self, column: &Column, constraint: &Constraint) -> BTreeSet<Value> {
        let mut keys: BTreeSet<Value> = constraint
            .values()
            .iter()
            .flat_map(|value| column.find(value).iter().cloned())
            .collect();
        if constraint.accepts(column.default_value()) {
            keys.extend(
                self.keys
                    .iter()
                    .filter(|key| !column.contains_key(key))
                    .cloned(),
            );
        }
        keys
    }

    // === Delete ===

    /// Delete matching rows; fails with `NoMatchingRows` when none match.
    pub fn delete(&mut self, predicate: &Predicate) -> MemdbResult<usize> {
        self.delete_with(predicate, QueryOptions::strict())
    }

    pub fn delete_with(&mut self, predicate: &Predicate, options: QueryOptions) -> MemdbResult<usize> {
        let keys = self.resolve(predicate, options)?;
        if keys.is_empty() && !options.allow_no_match {
            return Err(TableError::NoMatchingRows {
                predicate: predicate.to_string(),
            }
            .into());
        }

        for key in &keys {
            self.keys.remove(key);
            for column in self.columns.values_mut() {
                column.drop(key);
            }
        }
        debug!(predicate = %predicate, count = keys.len(), "rows deleted");
        Ok(keys.len())
    }

    // === Update ===

    /// Overwrite `assignments` on every matching row and return how many
    /// rows matched. Zero matches is not an error.
    pub fn update(&mut self, predicate: &Predicate, assignments: &Row) -> MemdbResult<usize> {
        self.update_with(predicate, assignments, QueryOptions::strict())
    }

    pub fn update_with(
        &mut self,
        predicate: &Predicate,
        assignments: &Row,
        options: QueryOptions,
    ) -> MemdbResult<usize> {
        if assignments.contains_key(&self.config.primary_key_field) {
            return Err(TableError::PrimaryKeyImmutable {
                column: self.config.primary_key_field.clone(),
            }
            .into());
        }

        let keys = self.resolve(predicate, options)?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.check_unique_assignments(&keys, assignments)?;

        for (name, value) in assignments {
            let column = self.column_mut(name.clone());
            for key in &keys {
                column.set(key.clone(), value.clone());
            }
        }
        debug!(predicate = %predicate, count = keys.len(), "rows updated");
        Ok(keys.len())
    }

    fn check_unique_assignments(
        &self,
        keys: &BTreeSet<Value>,
        assignments: &Row,
    ) -> Result<(), TableError> {
        for (name, value) in assignments {
            let Some(column) = self.columns.get(name) else {
                continue;
            };
            if !column.is_unique() {
                continue;
            }
            let outside: Vec<Value> = column
                .find(value)
                .iter()
                .filter(|holder| !keys.contains(*holder))
                .cloned()
                .collect();
            if keys.len() > 1 || !outside.is_empty() {
                warn!(column = %name, value = %value, "unique constraint rejected update");
                let existing = if outside.is_empty() {
                    keys.iter().cloned().collect()
                } else {
                    outside
                };
                return Err(TableError::UniqueConstraintViolation {
                    column: name.clone(),
                    value: value.clone(),
                    existing,
                });
            }
        }
        Ok(())
    }

    // === Lifecycle ===

    /// Release every structure held by the table.
    pub fn release(self) {
        debug!(
            primary_key = %self.config.primary_key_field,
            rows = self.keys.len(),
            columns = self.columns.len(),
            "table released"
        );
    }

    /// Check every column index and the live key set against each other.
    pub fn is_consistent(&self) -> bool {
        let Some(primary) = self.columns.get(&self.config.primary_key_field) else {
            return false;
        };
        primary.len() == self.keys.len()
            && self.keys.iter().all(|key| primary.contains_key(key))
            && self.columns.values().all(|column| {
                column.is_consistent() && column.keys().all(|key| self.keys.contains(key))
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
