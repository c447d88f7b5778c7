//! Churn ML - Rust библиотека

pub mod artifacts;
pub mod error;
pub mod features;
pub mod ingest;
pub mod preprocessing;
pub mod types;

pub use types::*;
pub use features::*;
pub use preprocessing::*;

// Re-export для удобства
pub use error::{ChurnError, Result};
