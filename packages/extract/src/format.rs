//! Rendering extraction records for display and download.
//!
//! Three output shapes: a column-aligned markdown pipe table for the chat
//! transcript, a pretty-printed JSON dump of the full raw response, and a
//! flat CSV of the records. The table and CSV share the same column set,
//! the union of keys across records in first-seen order.

use indexmap::IndexSet;
use serde_json::Value;

use crate::client::Record;
use crate::error::{FormatError, FormatResult};

/// Union of record keys in first-seen order.
fn columns(records: &[Record]) -> Vec<String> {
    let mut set: IndexSet<String> = IndexSet::new();
    for record in records {
        for key in record.keys() {
            set.insert(key.clone());
        }
    }
    set.into_iter().collect()
}

/// Plain text for one cell. Strings are rendered bare (no quotes), scalars
/// via their JSON form, nested values as compact JSON, and nulls as empty.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Escape literal pipes so cell content cannot add or remove columns.
fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Render records as a column-aligned markdown pipe table.
///
/// Row order preserves input order; missing keys render as empty cells;
/// an empty record list renders as an empty string.
pub fn to_markdown_table(records: &[Record]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let columns = columns(records);
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|col| {
                    record
                        .get(col)
                        .map(|v| escape_pipes(&cell_text(v)))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    // Pad each column to its widest cell, header included.
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let mut out = String::new();
    render_row(&mut out, &columns, &widths);
    out.push('|');
    for width in &widths {
        out.push(' ');
        out.extend(std::iter::repeat('-').take(*width));
        out.push_str(" |");
    }
    out.push('\n');
    for row in &rows {
        render_row(&mut out, row, &widths);
    }
    // No trailing newline on the last row.
    out.pop();
    out
}

fn render_row(out: &mut String, cells: &[String], widths: &[usize]) {
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        out.push(' ');
        out.push_str(cell);
        out.extend(std::iter::repeat(' ').take(pad));
        out.push_str(" |");
    }
    out.push('\n');
}

/// Serialize the full raw API response with stable two-space indentation.
pub fn to_json_pretty(raw: &Value) -> FormatResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(raw)?)
}

/// Serialize records as CSV: header row from the union column set, one row
/// per record in input order, no index column.
pub fn to_csv(records: &[Record]) -> FormatResult<Vec<u8>> {
    let columns = columns(records);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&columns)?;
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|col| record.get(col).map(cell_text).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| FormatError::CsvIntoInner(e.to_string()))
}
