use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, info};

use crate::constants::MESSAGES_TABLE;
use crate::error::{EtlError, Result};
use crate::table::{Table, Value};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// SQLite destination store for the cleaned message table.
///
/// Opening creates the database file if it does not exist. The handle is
/// passed into the write path explicitly so tests can substitute an
/// in-memory store.
pub struct MessageStore {
    conn: Connection,
}

impl MessageStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!("Opened destination store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Writes `table` as the `DisasterMessages` table, replacing any
    /// previous version wholesale. No synthetic row-index column is added.
    ///
    /// Replacement drops and recreates the table inside one transaction. If
    /// the destination name is taken by a non-table object (a view or an
    /// index), the write is refused with a schema-conflict error instead of
    /// clobbering it.
    pub fn save(&mut self, table: &Table) -> Result<()> {
        if let Some(kind) = self.existing_object_kind(MESSAGES_TABLE)? {
            if kind != "table" {
                return Err(EtlError::SchemaConflict {
                    name: MESSAGES_TABLE.to_string(),
                    kind,
                });
            }
        }

        let column_defs: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} {}", quote_ident(name), column_type(table, i)))
            .collect();
        let placeholders: Vec<String> = (1..=table.columns.len())
            .map(|i| format!("?{i}"))
            .collect();

        let tx = self.conn.transaction()?;
        tx.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_ident(MESSAGES_TABLE)),
            [],
        )?;
        tx.execute(
            &format!(
                "CREATE TABLE {} ({})",
                quote_ident(MESSAGES_TABLE),
                column_defs.join(", ")
            ),
            [],
        )?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_ident(MESSAGES_TABLE),
                placeholders.join(", ")
            ))?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!(
            "Wrote {} rows to table {}",
            table.row_count(),
            MESSAGES_TABLE
        );
        Ok(())
    }

    /// Reads a stored table back into memory, preserving column order.
    pub fn read_table(&self, name: &str) -> Result<Table> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(name)))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut out_rows: Vec<Vec<Value>> = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let cell = match row.get_ref(i)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(v) => Value::Integer(v),
                    ValueRef::Real(v) => Value::Real(v),
                    ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
                    // The pipeline never writes blobs.
                    ValueRef::Blob(_) => Value::Null,
                };
                cells.push(cell);
            }
            out_rows.push(cells);
        }

        Ok(Table {
            columns,
            rows: out_rows,
        })
    }

    fn existing_object_kind(&self, name: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type FROM sqlite_master WHERE name = ?1")?;
        let mut rows = stmt.query(params![name])?;
        if let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            Ok(Some(kind))
        } else {
            Ok(None)
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite column affinity over every cell: INTEGER when all non-null cells
/// are integers, REAL when all are numeric, TEXT otherwise (including
/// all-null and empty columns).
fn column_type(table: &Table, idx: usize) -> &'static str {
    let mut any = false;
    let mut all_integer = true;
    let mut all_numeric = true;
    for row in &table.rows {
        match &row[idx] {
            Value::Null => continue,
            Value::Integer(_) => any = true,
            Value::Real(_) => {
                any = true;
                all_integer = false;
            }
            Value::Text(_) => {
                any = true;
                all_integer = false;
                all_numeric = false;
            }
        }
    }
    if !any || !all_numeric {
        "TEXT"
    } else if all_integer {
        "INTEGER"
    } else {
        "REAL"
    }
}
