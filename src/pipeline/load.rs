use std::path::Path;

use tracing::info;

use crate::constants::ID_COLUMN;
use crate::error::{EtlError, Result};
use crate::table::Table;

/// Loads the messages and categories files and inner-joins them on `id`.
///
/// Rows whose `id` has no partner in the other file are dropped. Both inputs
/// must carry an `id` column; a side missing it is a schema error naming the
/// offending input.
pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(messages_path: P, categories_path: Q) -> Result<Table> {
    let messages = Table::from_csv_path(messages_path)?;
    let categories = Table::from_csv_path(categories_path)?;

    if messages.column_index(ID_COLUMN).is_none() {
        return Err(EtlError::Schema {
            message: format!("messages input has no `{ID_COLUMN}` column"),
        });
    }
    if categories.column_index(ID_COLUMN).is_none() {
        return Err(EtlError::Schema {
            message: format!("categories input has no `{ID_COLUMN}` column"),
        });
    }

    info!(
        "Loaded {} message rows and {} category rows",
        messages.row_count(),
        categories.row_count()
    );

    let joined = messages.inner_join(&categories, ID_COLUMN)?;
    info!("Join on `{}` produced {} rows", ID_COLUMN, joined.row_count());
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::fs;

    #[test]
    fn test_load_joins_on_id() {
        let dir = tempfile::tempdir().unwrap();
        let messages = dir.path().join("messages.csv");
        let categories = dir.path().join("categories.csv");
        fs::write(&messages, "id,message\n1,Need water\n2,All fine\n").unwrap();
        fs::write(&categories, "id,categories\n1,related-1;offer-0\n").unwrap();

        let joined = load(&messages, &categories).unwrap();
        assert_eq!(joined.columns, vec!["id", "message", "categories"]);
        assert_eq!(joined.row_count(), 1);
        assert_eq!(joined.rows[0][0], Value::Integer(1));
    }

    #[test]
    fn test_load_missing_id_column_names_the_input() {
        let dir = tempfile::tempdir().unwrap();
        let messages = dir.path().join("messages.csv");
        let categories = dir.path().join("categories.csv");
        fs::write(&messages, "id,message\n1,Need water\n").unwrap();
        fs::write(&categories, "ident,categories\n1,related-1\n").unwrap();

        let err = load(&messages, &categories).unwrap_err();
        match err {
            EtlError::Schema { message } => assert!(message.contains("categories input")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let messages = dir.path().join("messages.csv");
        fs::write(&messages, "id,message\n1,Need water\n").unwrap();

        let err = load(&messages, dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, EtlError::FileNotFound { .. }));
    }
}
