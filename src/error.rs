use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File not found or unreadable: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse delimited input: {0}")]
    Parse(#[from] csv::Error),

    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Malformed categories value: {message}")]
    Format { message: String },

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Destination object `{name}` already exists as a {kind}, not a table")]
    SchemaConflict { name: String, kind: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
