//! # Briefsmith - research briefs from a single query
//!
//! Briefsmith turns a free-text research query into a structured brief. The
//! query is decomposed into a handful of research tasks, each task gathers web
//! evidence and is synthesized into cited findings, and the findings are
//! assembled into a brief with an executive summary and a de-duplicated
//! reference list.
//!
//! Briefsmith can be used in two ways:
//!
//! 1. **As a CLI / server** - Run the `briefsmith` binary
//! 2. **As a library** - Drive [`ResearchCoordinator`] from your own code
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use briefsmith::{BriefsmithConfig, ResearchCoordinator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BriefsmithConfig::load_or_default("briefsmith.toml")?;
//!     let coordinator = ResearchCoordinator::from_config(&config).await?;
//!
//!     let brief = coordinator
//!         .research("Renewable energy trends", &CancellationToken::new(), None)
//!         .await?;
//!     println!("{}", brief.render());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API and compatible endpoints |
//! | `all-llm` | Both providers |
//!
//! ## Modules
//!
//! - [`research`] - Planner, collector, synthesizer, assembler and orchestrator
//! - [`llm`] - Generative backend clients
//! - [`tools`] - Web search backends
//! - [`api`] - REST and SSE handlers
//! - [`cli`] - Command line interface
//! - [`types`] - Data model and error handling
//! - [`utils`] - Configuration

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers and routes.
pub mod api;
/// Command line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Research pipeline.
pub mod research;
/// Web search backends.
pub mod tools;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{GenerationOptions, LLMClient, Provider};
pub use research::coordinator::{ResearchCoordinator, ResearchEvent, ResearchSettings};
pub use tools::search::{SearchBackend, SearchProvider};
pub use types::{AppError, ResearchBrief, Result};
pub use utils::toml_config::BriefsmithConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration
    pub config: Arc<BriefsmithConfig>,
    /// Coordinator built from the configured backends
    pub coordinator: Arc<ResearchCoordinator>,
}

impl AppState {
    pub fn new(config: BriefsmithConfig, coordinator: ResearchCoordinator) -> Self {
        Self {
            config: Arc::new(config),
            coordinator: Arc::new(coordinator),
        }
    }
}
