//! LLM Provider Clients and Abstractions
//!
//! The generative text backend is a black box behind [`LLMClient`]: a prompt
//! and [`GenerationOptions`] go in, text comes out. Provider adapters are
//! selected at runtime through [`Provider`].
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use briefsmith::llm::{GenerationOptions, Provider};
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3".to_string(),
//! };
//! let client = provider.create_client().await?;
//! let text = client.generate("What is 2+2?", &GenerationOptions::default()).await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{GenerationOptions, LLMClient, Provider};
