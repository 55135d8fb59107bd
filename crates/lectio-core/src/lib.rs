pub mod auth;
pub mod error;
pub mod verse;

// Re-export common error type
pub use error::{LectioError, Result};
