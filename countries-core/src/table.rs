//! Plain-text table for arbitrary records.
//!
//! Columns are the union of keys over all records, in the order they are
//! first seen. A record without a column gets an empty cell.

use std::fmt;

use serde_json::Value;

use crate::model::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// `None` for an empty input: nothing is rendered, not even a header.
    pub fn from_records(records: &[Record]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        Some(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                self.rows
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(col.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_line(f, &self.columns, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_line(f, &rule, &widths)?;
        for row in &self.rows {
            write_line(f, row, &widths)?;
        }
        Ok(())
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let padded: Vec<String> =
        cells.iter().zip(widths).map(|(cell, w)| format!("{cell:<w$}", w = *w)).collect();
    writeln!(f, "| {} |", padded.join(" | "))
}

/// Empty string for no records.
pub fn render(records: &[Record]) -> String {
    Table::from_records(records).map(|t| t.to_string()).unwrap_or_default()
}
