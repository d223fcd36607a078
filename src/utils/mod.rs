/// Shared error type and numeric helpers
pub mod error;
pub mod numeric;

// Re-export commonly used types
pub use error::IngestError;
pub use numeric::{round_offset, weighted_log};
