use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{EtlError, Result};

/// A single typed cell value.
///
/// Empty input fields become `Null` (they surface as SQL NULL later); every
/// other field is narrowed per column by the inference pass in
/// [`Table::from_csv_path`].
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// The text payload, if this cell is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

// Equality and hashing compare reals by bit pattern so exact-duplicate
// detection stays well defined (a NaN cell equals itself).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::Integer(v) => {
                state.write_u8(1);
                v.hash(state);
            }
            Value::Real(v) => {
                state.write_u8(2);
                v.to_bits().hash(state);
            }
            Value::Text(v) => {
                state.write_u8(3);
                v.hash(state);
            }
        }
    }
}

/// Row-oriented in-memory table: ordered column names plus one row of cells
/// per input record, every row exactly as wide as the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Reads a delimited file with a header row into a typed table.
    ///
    /// A missing or unreadable path is reported as `FileNotFound`; malformed
    /// delimited text (including ragged records) as `Parse`.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => EtlError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => EtlError::Io(e),
        })?;

        let mut reader = csv::Reader::from_reader(file);
        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            raw_rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        let rows = infer_columns(columns.len(), raw_rows);
        debug!(
            "Read {} rows x {} columns from {}",
            rows.len(),
            columns.len(),
            path.display()
        );
        Ok(Self { columns, rows })
    }

    /// Position of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Inner join on `key`, which must be present on both sides.
    ///
    /// Duplicate key values on either side produce the cartesian expansion
    /// for that key. Left row order is preserved; within one key, right rows
    /// follow their file order. The result carries all left columns followed
    /// by the right side's non-key columns; a non-key name present on both
    /// sides is suffixed `_x` (left) and `_y` (right).
    pub fn inner_join(&self, other: &Table, key: &str) -> Result<Table> {
        let left_key = self.column_index(key).ok_or_else(|| EtlError::Schema {
            message: format!("join column `{key}` missing from the left table"),
        })?;
        let right_key = other.column_index(key).ok_or_else(|| EtlError::Schema {
            message: format!("join column `{key}` missing from the right table"),
        })?;

        let right_kept: Vec<usize> = (0..other.columns.len())
            .filter(|&i| i != right_key)
            .collect();

        let left_nonkey: HashSet<&str> = self
            .columns
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != left_key)
            .map(|(_, name)| name.as_str())
            .collect();
        let right_nonkey: HashSet<&str> = right_kept
            .iter()
            .map(|&i| other.columns[i].as_str())
            .collect();

        let mut columns = Vec::with_capacity(self.columns.len() + right_kept.len());
        for (i, name) in self.columns.iter().enumerate() {
            if i != left_key && right_nonkey.contains(name.as_str()) {
                columns.push(format!("{name}_x"));
            } else {
                columns.push(name.clone());
            }
        }
        for &i in &right_kept {
            let name = &other.columns[i];
            if left_nonkey.contains(name.as_str()) {
                columns.push(format!("{name}_y"));
            } else {
                columns.push(name.clone());
            }
        }

        let mut right_index: HashMap<&Value, Vec<usize>> = HashMap::new();
        for (idx, row) in other.rows.iter().enumerate() {
            right_index.entry(&row[right_key]).or_default().push(idx);
        }

        let mut rows = Vec::new();
        for left_row in &self.rows {
            if let Some(matches) = right_index.get(&left_row[left_key]) {
                for &ridx in matches {
                    let mut row = left_row.clone();
                    for &i in &right_kept {
                        row.push(other.rows[ridx][i].clone());
                    }
                    rows.push(row);
                }
            }
        }

        debug!(
            "Inner join on `{}`: {} x {} -> {} rows",
            key,
            self.rows.len(),
            other.rows.len(),
            rows.len()
        );
        Ok(Table { columns, rows })
    }

    /// Removes rows that are exact duplicates across every column, keeping
    /// the first occurrence of each.
    pub fn deduplicate(mut self) -> Table {
        let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
        self
    }
}

/// Column-wise type narrowing over raw string fields: a column is integer if
/// every non-empty field parses as `i64`, real if every non-empty field
/// parses as `f64`, and text otherwise. Empty fields become `Null` in every
/// column.
fn infer_columns(width: usize, raw_rows: Vec<Vec<String>>) -> Vec<Vec<Value>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Kind {
        Integer,
        Real,
        Text,
    }

    let mut kinds = vec![Kind::Integer; width];
    for row in &raw_rows {
        for (i, field) in row.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            if kinds[i] == Kind::Integer && field.parse::<i64>().is_err() {
                kinds[i] = Kind::Real;
            }
            if kinds[i] == Kind::Real && field.parse::<f64>().is_err() {
                kinds[i] = Kind::Text;
            }
        }
    }

    raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(kinds.iter())
                .map(|(field, kind)| {
                    if field.is_empty() {
                        return Value::Null;
                    }
                    match kind {
                        Kind::Integer => field
                            .parse::<i64>()
                            .map(Value::Integer)
                            .unwrap_or_else(|_| Value::Text(field)),
                        Kind::Real => field
                            .parse::<f64>()
                            .map(Value::Real)
                            .unwrap_or_else(|_| Value::Text(field)),
                        Kind::Text => Value::Text(field),
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_csv_load_infers_column_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "id,score,note\n1,0.5,hello\n2,1.5,\n").unwrap();

        let t = Table::from_csv_path(&path).unwrap();
        assert_eq!(t.columns, vec!["id", "score", "note"]);
        assert_eq!(
            t.rows,
            vec![
                vec![
                    Value::Integer(1),
                    Value::Real(0.5),
                    Value::Text("hello".to_string())
                ],
                vec![Value::Integer(2), Value::Real(1.5), Value::Null],
            ]
        );
    }

    #[test]
    fn test_csv_load_mixed_column_falls_back_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "id\n7\nseven\n").unwrap();

        let t = Table::from_csv_path(&path).unwrap();
        assert_eq!(t.rows[0][0], Value::Text("7".to_string()));
        assert_eq!(t.rows[1][0], Value::Text("seven".to_string()));
    }

    #[test]
    fn test_csv_load_missing_file() {
        let err = Table::from_csv_path("no/such/file.csv").unwrap_err();
        assert!(matches!(err, EtlError::FileNotFound { .. }));
    }

    #[test]
    fn test_csv_load_ragged_record_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "id,message\n1,Help\n2,Water,extra\n").unwrap();

        let err = Table::from_csv_path(&path).unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)));
    }

    #[test]
    fn test_inner_join_suffixes_colliding_columns() {
        let left = table(
            &["id", "note"],
            vec![vec![Value::Integer(1), Value::Text("left".to_string())]],
        );
        let right = table(
            &["id", "note"],
            vec![vec![Value::Integer(1), Value::Text("right".to_string())]],
        );

        let joined = left.inner_join(&right, "id").unwrap();
        assert_eq!(joined.columns, vec!["id", "note_x", "note_y"]);
        assert_eq!(
            joined.rows,
            vec![vec![
                Value::Integer(1),
                Value::Text("left".to_string()),
                Value::Text("right".to_string())
            ]]
        );
    }

    #[test]
    fn test_inner_join_expands_duplicate_keys() {
        let left = table(
            &["id", "message"],
            vec![
                vec![Value::Integer(1), Value::Text("a".to_string())],
                vec![Value::Integer(1), Value::Text("b".to_string())],
            ],
        );
        let right = table(
            &["id", "label"],
            vec![
                vec![Value::Integer(1), Value::Text("x".to_string())],
                vec![Value::Integer(1), Value::Text("y".to_string())],
            ],
        );

        let joined = left.inner_join(&right, "id").unwrap();
        // Two left rows times two right rows for the shared key.
        assert_eq!(joined.row_count(), 4);
        assert_eq!(
            joined.rows[0],
            vec![
                Value::Integer(1),
                Value::Text("a".to_string()),
                Value::Text("x".to_string())
            ]
        );
    }

    #[test]
    fn test_inner_join_drops_unmatched_rows() {
        let left = table(
            &["id", "message"],
            vec![
                vec![Value::Integer(1), Value::Text("kept".to_string())],
                vec![Value::Integer(9), Value::Text("dropped".to_string())],
            ],
        );
        let right = table(&["id"], vec![vec![Value::Integer(1)]]);

        let joined = left.inner_join(&right, "id").unwrap();
        assert_eq!(joined.row_count(), 1);
        assert_eq!(joined.rows[0][1], Value::Text("kept".to_string()));
    }

    #[test]
    fn test_inner_join_requires_key_on_both_sides() {
        let left = table(&["id"], vec![]);
        let right = table(&["other"], vec![]);

        let err = left.inner_join(&right, "id").unwrap_err();
        assert!(matches!(err, EtlError::Schema { .. }));
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let t = table(
            &["id", "note"],
            vec![
                vec![Value::Integer(1), Value::Text("a".to_string())],
                vec![Value::Integer(2), Value::Text("b".to_string())],
                vec![Value::Integer(1), Value::Text("a".to_string())],
            ],
        );

        let deduped = t.deduplicate();
        assert_eq!(deduped.row_count(), 2);
        assert_eq!(deduped.rows[0][0], Value::Integer(1));
        assert_eq!(deduped.rows[1][0], Value::Integer(2));
    }

    #[test]
    fn test_null_cells_compare_equal_for_dedup() {
        let t = table(
            &["id", "note"],
            vec![
                vec![Value::Integer(1), Value::Null],
                vec![Value::Integer(1), Value::Null],
            ],
        );
        assert_eq!(t.deduplicate().row_count(), 1);
    }
}
