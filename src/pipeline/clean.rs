use tracing::info;

use crate::constants::{CATEGORIES_COLUMN, CATEGORY_SEPARATOR};
use crate::error::{EtlError, Result};
use crate::table::{Table, Value};

/// Expands the compound `categories` column into one integer column per
/// category and drops exact-duplicate rows.
///
/// Column names come from the first row's tokens with every non-alphabetic
/// character stripped; values come from each row's tokens positionally with
/// every non-digit character stripped. Token order and count are assumed
/// uniform across rows, so a row whose token count differs from the first
/// row's is rejected instead of silently misaligning columns.
///
/// A table with no `categories` column is already expanded; it passes
/// through with only deduplication applied, which makes cleaning its own
/// output a no-op.
pub fn clean(table: Table) -> Result<Table> {
    let cat_idx = match table.column_index(CATEGORIES_COLUMN) {
        Some(idx) => idx,
        None => return Ok(table.deduplicate()),
    };

    let Table { columns, rows } = table;

    let names = match rows.first() {
        Some(row) => category_names(&row[cat_idx])?,
        None => Vec::new(),
    };

    let mut out_columns: Vec<String> = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != cat_idx)
        .map(|(_, name)| name.clone())
        .collect();
    out_columns.extend(names.iter().cloned());

    let mut out_rows: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
    for (row_idx, row) in rows.into_iter().enumerate() {
        let values = category_values(&row[cat_idx], names.len(), row_idx)?;
        let mut out_row: Vec<Value> = row
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != cat_idx)
            .map(|(_, cell)| cell)
            .collect();
        out_row.extend(values.into_iter().map(Value::Integer));
        out_rows.push(out_row);
    }

    let before = out_rows.len();
    let cleaned = Table {
        columns: out_columns,
        rows: out_rows,
    }
    .deduplicate();
    info!(
        "Expanded {} category columns, removed {} duplicate rows, {} rows remain",
        names.len(),
        before - cleaned.row_count(),
        cleaned.row_count()
    );
    Ok(cleaned)
}

fn categories_text(cell: &Value, row_idx: usize) -> Result<&str> {
    cell.as_str().ok_or_else(|| EtlError::Format {
        message: format!("row {row_idx} `categories` value is not text"),
    })
}

/// Column names from the first row's tokens. Names are the tokens with all
/// non-alphabetic characters removed; a name that strips to nothing or
/// collides with an earlier one is a schema error.
fn category_names(cell: &Value) -> Result<Vec<String>> {
    let text = categories_text(cell, 0)?;
    let mut names: Vec<String> = Vec::new();
    for token in text.split(CATEGORY_SEPARATOR) {
        let name: String = token.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        if name.is_empty() {
            return Err(EtlError::Schema {
                message: format!("category token `{token}` strips to an empty column name"),
            });
        }
        if names.contains(&name) {
            return Err(EtlError::Schema {
                message: format!("category tokens collide on column name `{name}`"),
            });
        }
        names.push(name);
    }
    Ok(names)
}

/// Integer values from one row's tokens, matched to columns by position.
fn category_values(cell: &Value, expected: usize, row_idx: usize) -> Result<Vec<i64>> {
    let text = categories_text(cell, row_idx)?;
    let tokens: Vec<&str> = text.split(CATEGORY_SEPARATOR).collect();
    if tokens.len() != expected {
        return Err(EtlError::Format {
            message: format!(
                "row {row_idx} has {} category tokens, expected {expected}",
                tokens.len()
            ),
        });
    }

    let mut values = Vec::with_capacity(tokens.len());
    for token in tokens {
        let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(EtlError::Format {
                message: format!("category token `{token}` in row {row_idx} has no numeric value"),
            });
        }
        let value = digits.parse::<i64>().map_err(|_| EtlError::Format {
            message: format!(
                "category token `{token}` in row {row_idx} overflows an integer value"
            ),
        })?;
        values.push(value);
    }
    Ok(values)
}
