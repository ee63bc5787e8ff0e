//! External Evidence Sources
//!
//! # Module Structure
//!
//! - [`search`](crate::tools::search) - Web search backends (DuckDuckGo, Google Custom Search)
//!
//! ## Web Search
//! ```ignore
//! let backend = SearchProvider::from_config(&config.search)?.create_backend()?;
//! let hits = backend.search("rust programming", &SearchOptions { result_count: 5 }).await?;
//! for hit in hits {
//!     println!("{}: {}", hit.title, hit.url);
//! }
//! ```

/// Web search backends.
pub mod search;

pub use search::{SearchBackend, SearchHit, SearchOptions, SearchProvider};
