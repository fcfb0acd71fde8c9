//! Table and column name constants to keep the loader, cleaner, and store
//! agreeing on the shared schema vocabulary.

// Join key expected in both input files
pub const ID_COLUMN: &str = "id";

// Compound category column in the categories input
pub const CATEGORIES_COLUMN: &str = "categories";

// Destination table written by the store
pub const MESSAGES_TABLE: &str = "DisasterMessages";

// Separator between category tokens inside the compound column
pub const CATEGORY_SEPARATOR: char = ';';
