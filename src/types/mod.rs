//! Core types used throughout the crate.

pub mod usage;
pub mod message;
pub mod streaming;

// Re-export commonly used types
pub use usage::*;
pub use message::*;
pub use streaming::*;
