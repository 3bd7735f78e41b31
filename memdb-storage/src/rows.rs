//! Lazy row iteration over a fixed key set.

use crate::Table;
use memdb_core::{Row, Value};
use std::iter::FusedIterator;

/// Rows produced by [`Table::find`] and [`Table::all`].
///
/// The matching keys are collected before the first row is yielded; each
/// row is assembled from the columns on demand. The iterator borrows the
/// table, so the table cannot change while rows are being read.
#[derive(Debug)]
pub struct Rows<'a> {
    table: &'a Table,
    keys: std::vec::IntoIter<Value>,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(table: &'a Table, keys: Vec<Value>) -> Self {
        Self {
            table,
            keys: keys.into_iter(),
        }
    }

    /// Primary keys not yet yielded.
    pub fn remaining_keys(&self) -> &[Value] {
        self.keys.as_slice()
    }
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.keys.next().map(|key| self.table.materialize(&key))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl DoubleEndedIterator for Rows<'_> {
    fn next_back(&mut self) -> Option<Row> {
        self.keys.next_back().map(|key| self.table.materialize(&key))
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl FusedIterator for Rows<'_> {}
