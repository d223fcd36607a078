pub mod builder;
/// Arrow IPC reading of raw columns and writing of the unified table
pub mod parser;

// Re-export commonly used functions
pub use builder::{build_table_batch, build_table_ipc};
pub use parser::parse_raw_columns;
