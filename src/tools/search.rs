//! Web search backends
//!
//! The evidence source is a black-box keyword search behind [`SearchBackend`].
//! Two adapters ship with the crate:
//!
//! - [`DuckDuckGoSearch`] - powered by daedra, no credentials required
//! - [`GoogleSearch`] - Google Custom Search JSON API via reqwest

use crate::types::{AppError, Result};
use crate::utils::toml_config::{SearchConfig, SearchProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One raw result from a search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub result_count: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { result_count: 5 }
    }
}

/// Keyword search service used as the evidence source
///
/// Implementations map rate limiting to [`AppError::QuotaExceeded`], rejected
/// credentials to [`AppError::Auth`], timeouts to [`AppError::Timeout`] and
/// anything else to [`AppError::Search`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>>;

    fn name(&self) -> &'static str;
}

/// Search backend selection, built from the `[search]` config section
#[derive(Debug, Clone)]
pub enum SearchProvider {
    DuckDuckGo,
    Google {
        api_key: String,
        cx: String,
        base_url: String,
        timeout: Duration,
    },
}

impl SearchProvider {
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        match config.provider {
            SearchProviderKind::DuckDuckGo => Ok(SearchProvider::DuckDuckGo),
            SearchProviderKind::Google => {
                let api_key = read_env(&config.api_key_env)?;
                let cx = read_env(&config.cx_env)?;
                Ok(SearchProvider::Google {
                    api_key,
                    cx,
                    base_url: config.base_url.clone(),
                    timeout: config.timeout(),
                })
            }
        }
    }

    pub fn create_backend(&self) -> Result<Arc<dyn SearchBackend>> {
        match self {
            SearchProvider::DuckDuckGo => Ok(Arc::new(DuckDuckGoSearch::new())),
            SearchProvider::Google {
                api_key,
                cx,
                base_url,
                timeout,
            } => Ok(Arc::new(GoogleSearch::new(
                api_key.clone(),
                cx.clone(),
                base_url.clone(),
                *timeout,
            )?)),
        }
    }
}

fn read_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| {
        AppError::Configuration(format!("Environment variable '{}' is not set", name))
    })
}

/// Web search powered by daedra (DuckDuckGo)
pub struct DuckDuckGoSearch;

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: options.result_count,
                ..Default::default()
            }),
        };

        match daedra::tools::search::perform_search(&search_args).await {
            Ok(response) => Ok(response
                .data
                .iter()
                .map(|r| SearchHit {
                    title: r.title.clone(),
                    url: r.url.clone(),
                    snippet: r.description.clone(),
                })
                .collect()),
            Err(e) => Err(AppError::Search(format!("DuckDuckGo search failed: {}", e))),
        }
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Google Custom Search JSON API client
pub struct GoogleSearch {
    http: reqwest::Client,
    api_key: String,
    cx: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// The API returns at most 10 results per request.
const GOOGLE_MAX_RESULTS: usize = 10;

impl GoogleSearch {
    pub fn new(api_key: String, cx: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            cx,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl SearchBackend for GoogleSearch {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let num = options.result_count.clamp(1, GOOGLE_MAX_RESULTS).to_string();
        let url = format!("{}/customsearch/v1", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout)
                } else {
                    AppError::Search(format!("Google search request failed: {}", e))
                }
            })?;

        let status = response.status();
        match status.as_u16() {
            200..=299 => {}
            429 => {
                return Err(AppError::QuotaExceeded(
                    "Google Custom Search quota exhausted".to_string(),
                ));
            }
            401 | 403 => {
                return Err(AppError::Auth(format!(
                    "Google Custom Search rejected credentials ({})",
                    status
                )));
            }
            _ => {
                return Err(AppError::Search(format!(
                    "Google Custom Search returned {}",
                    status
                )));
            }
        }

        let body: GoogleResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Invalid Google search response: {}", e)))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| SearchHit {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
