// Data processing pipeline: loading, joining, and cleaning stages

pub mod clean;
pub mod load;

// Re-export key functions from each stage
pub use clean::clean;
pub use load::load;
