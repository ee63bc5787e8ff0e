//! Per-task findings synthesis.

use super::gateway::SynthesisGateway;
use super::prompts;
use crate::types::{Query, Result, Task};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Synthesized prose for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Findings {
    pub text: String,
    /// Produced from prior knowledge only; carries no citations.
    pub llm_only: bool,
}

/// Turns a task description and its evidence into a findings paragraph.
#[derive(Clone)]
pub struct TaskSynthesizer {
    gateway: Arc<SynthesisGateway>,
}

impl TaskSynthesizer {
    pub fn new(gateway: Arc<SynthesisGateway>) -> Self {
        Self { gateway }
    }

    /// Synthesize findings for `task`, in LLM-only mode when it has no evidence.
    pub async fn synthesize(
        &self,
        query: &Query,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<Findings> {
        let llm_only = task.evidence.is_empty();
        let prompt = if llm_only {
            prompts::llm_only_prompt(query.as_str(), &task.description)
        } else {
            prompts::evidence_prompt(query.as_str(), &task.description, &task.evidence)
        };

        debug!(
            task_id = task.id,
            llm_only,
            evidence = task.evidence.len(),
            "Synthesizing findings"
        );

        let text = self.gateway.generate(&prompt, cancel).await?;

        Ok(Findings {
            text: text.trim().to_string(),
            llm_only,
        })
    }
}
