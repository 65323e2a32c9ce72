#[macro_use]
pub mod macros;

pub mod collections;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod intrinsics;
pub mod ir;
pub mod pretty;

// Re-export commonly used items for convenience
pub use tracing;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
