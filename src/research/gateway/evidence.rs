use super::{CallPolicy, call_with_policy};
use crate::tools::search::{SearchBackend, SearchHit, SearchOptions};
use crate::types::Result;
use crate::utils::toml_config::SearchConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Wraps the search backend with result-count, timeout, retry and cancellation policy.
#[derive(Clone)]
pub struct EvidenceGateway {
    backend: Arc<dyn SearchBackend>,
    options: SearchOptions,
    policy: CallPolicy,
}

impl EvidenceGateway {
    pub fn new(backend: Arc<dyn SearchBackend>, result_count: usize, policy: CallPolicy) -> Self {
        Self {
            backend,
            options: SearchOptions {
                result_count: result_count.max(1),
            },
            policy,
        }
    }

    /// Build a gateway from the `[search]` section.
    pub fn from_config(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        let policy = CallPolicy::new(config.timeout(), config.max_retries, config.retry_backoff());
        Self::new(backend, config.results_per_query, policy)
    }

    pub async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<SearchHit>> {
        debug!(backend = self.backend.name(), query, "Evidence search");

        call_with_policy(&self.policy, cancel, "evidence", || {
            self.backend.search(query, &self.options)
        })
        .await
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn result_count(&self) -> usize {
        self.options.result_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::search::MockSearchBackend;
    use crate::types::AppError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_passes_result_count_to_backend() {
        let mut backend = MockSearchBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_search()
            .withf(|query, options| query.contains("solar") && options.result_count == 4)
            .times(1)
            .returning(|_, _| {
                Ok(vec![SearchHit {
                    title: "t".to_string(),
                    url: "https://t.example".to_string(),
                    snippet: "s".to_string(),
                }])
            });

        let gateway = EvidenceGateway::new(Arc::new(backend), 4, CallPolicy::default());
        let hits = gateway
            .search("solar", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let mut backend = MockSearchBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_search()
            .times(1)
            .returning(|_, _| Err(AppError::Auth("bad key".to_string())));

        let policy = CallPolicy::new(Duration::from_secs(1), 3, Duration::from_millis(1));
        let gateway = EvidenceGateway::new(Arc::new(backend), 5, policy);
        let err = gateway
            .search("solar", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn test_result_count_is_at_least_one() {
        let backend = MockSearchBackend::new();
        let gateway = EvidenceGateway::new(Arc::new(backend), 0, CallPolicy::default());
        assert_eq!(gateway.result_count(), 1);
    }
}
