//! API request handlers.

/// Research and health handlers.
pub mod research;
