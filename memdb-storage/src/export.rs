//! Row export sinks.
//!
//! The registry hands every table's rows to a [`RowSink`] in batches. The
//! sink decides what the rows become; [`JsonLinesSink`] writes one JSON
//! object per row.

use memdb_core::{ExportError, MemdbResult, Row};
use serde::Serialize;
use std::io::Write;

/// Destination for exported rows.
pub trait RowSink {
    /// Called once per table before its first batch.
    fn begin_table(&mut self, table: &str, primary_key_field: &str) -> MemdbResult<()>;

    /// Receive the next batch of rows for `table`.
    fn write_batch(&mut self, table: &str, rows: &[Row]) -> MemdbResult<()>;

    /// Called after the last table.
    fn finish(&mut self) -> MemdbResult<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    table: &'a str,
    primary_key: &'a str,
    row: &'a Row,
}

/// Writes `{"table": ..., "primary_key": ..., "row": {...}}` lines.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    primary_key_field: String,
    lines: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            primary_key_field: String::new(),
            lines: 0,
        }
    }

    /// Lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RowSink for JsonLinesSink<W> {
    fn begin_table(&mut self, _table: &str, primary_key_field: &str) -> MemdbResult<()> {
        self.primary_key_field = primary_key_field.to_string();
        Ok(())
    }

    fn write_batch(&mut self, table: &str, rows: &[Row]) -> MemdbResult<()> {
        for row in rows {
            let line = JsonLine {
                table,
                primary_key: &self.primary_key_field,
                row,
            };
            serde_json::to_writer(&mut self.writer, &line).map_err(|e| {
                ExportError::Serialization {
                    table: table.to_string(),
                    reason: e.to_string(),
                }
            })?;
            self.writer.write_all(b"\n").map_err(|e| ExportError::Io {
                reason: e.to_string(),
            })?;
            self.lines += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> MemdbResult<()> {
        self.writer.flush().map_err(|e| {
            ExportError::Io {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
