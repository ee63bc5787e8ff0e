use super::{CallPolicy, call_with_policy};
use crate::llm::{GenerationOptions, LLMClient};
use crate::types::{AppError, Result};
use crate::utils::toml_config::LlmConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Wraps the generative text backend with timeout, retry and cancellation.
#[derive(Clone)]
pub struct SynthesisGateway {
    client: Arc<dyn LLMClient>,
    options: GenerationOptions,
    policy: CallPolicy,
}

impl SynthesisGateway {
    pub fn new(client: Arc<dyn LLMClient>, options: GenerationOptions, policy: CallPolicy) -> Self {
        Self {
            client,
            options,
            policy,
        }
    }

    /// Build a gateway from the `[llm]` section.
    pub fn from_config(client: Arc<dyn LLMClient>, config: &LlmConfig) -> Self {
        let options = GenerationOptions {
            model: Some(config.model.clone()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };
        let policy = CallPolicy::new(config.timeout(), config.max_retries, config.retry_backoff());
        Self::new(client, options, policy)
    }

    /// Generate text for `prompt`. A blank completion counts as a failed call.
    pub async fn generate(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        debug!(
            model = self.client.model_name(),
            prompt_chars = prompt.len(),
            "Synthesis call"
        );

        call_with_policy(&self.policy, cancel, "synthesis", || async {
            let text = self.client.generate(prompt, &self.options).await?;
            if text.trim().is_empty() {
                return Err(AppError::LLM("Backend returned an empty response".to_string()));
            }
            Ok(text)
        })
        .await
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }
}
