//! Research pipeline
//!
//! A query becomes a brief in four stages, all driven by
//! [`coordinator::ResearchCoordinator`]:
//!
//! 1. **Planning** - [`planner::TaskPlanner`] decomposes the query into 1-5 tasks
//! 2. **Evidence** - [`collector::EvidenceCollector`] searches the web per task
//! 3. **Synthesis** - [`synthesizer::TaskSynthesizer`] writes cited findings per task
//! 4. **Assembly** - [`assembler::BriefAssembler`] adds the summary and references
//!
//! Stages 2 and 3 run as one pipeline per task, several pipelines at a time.
//! Every backend call goes through a gateway in [`gateway`] that applies the
//! per-call timeout, bounded retries and cancellation.
//!
//! # Usage
//!
//! ```ignore
//! use briefsmith::research::coordinator::ResearchCoordinator;
//!
//! let coordinator = ResearchCoordinator::new(synthesis, evidence, settings);
//! let brief = coordinator.research("Renewable energy trends", &cancel, None).await?;
//!
//! println!("{}", brief.render());
//! for reference in &brief.references {
//!     println!("[{}] {}", reference.index, reference.url);
//! }
//! ```

/// Executive summary and reference list.
pub mod assembler;
/// Per-task evidence gathering.
pub mod collector;
/// Session orchestration with bounded concurrency and a deadline.
pub mod coordinator;
/// Backend wrappers with timeout, retry and cancellation.
pub mod gateway;
/// Query decomposition.
pub mod planner;
/// Live progress reporting.
pub mod progress;
/// Prompt templates.
pub mod prompts;
/// Per-task findings synthesis.
pub mod synthesizer;
