//! Evidence gathering for a single research task.

use super::gateway::EvidenceGateway;
use crate::tools::search::SearchHit;
use crate::types::{AppError, EvidenceItem};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const MAX_SNIPPET_CHARS: usize = 400;
const MAX_KEYWORD_QUERY_WORDS: usize = 8;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "into", "is",
    "it", "of", "on", "or", "that", "the", "their", "this", "to", "what", "which", "with",
    "within", "why",
];

/// Evidence gathered for one task.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub items: Vec<EvidenceItem>,
    /// Why no external evidence is available, when the backend failed.
    pub unavailable: Option<String>,
}

impl Collection {
    /// Whether synthesis must fall back to prior knowledge.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fetches, normalizes, de-duplicates and caps evidence for a task.
#[derive(Clone)]
pub struct EvidenceCollector {
    gateway: Arc<EvidenceGateway>,
    max_items: usize,
}

impl EvidenceCollector {
    pub fn new(gateway: Arc<EvidenceGateway>, max_items: usize) -> Self {
        Self {
            gateway,
            max_items: max_items.max(1),
        }
    }

    pub fn gateway(&self) -> Arc<EvidenceGateway> {
        self.gateway.clone()
    }

    /// Collect evidence for `description`.
    ///
    /// Never fails. A gateway error, cancellation included, yields an empty
    /// collection carrying the reason unless an earlier query already found
    /// evidence, which is then kept.
    pub async fn collect(&self, description: &str, cancel: &CancellationToken) -> Collection {
        let mut items: Vec<EvidenceItem> = Vec::new();
        let mut seen = HashSet::new();

        for query in derive_queries(description) {
            if items.len() >= self.max_items {
                break;
            }

            let hits = match self.gateway.search(&query, cancel).await {
                Ok(hits) => hits,
                Err(e) if items.is_empty() => {
                    warn!(query = %query, "Evidence unavailable: {}", e);
                    return Collection {
                        items: Vec::new(),
                        unavailable: Some(describe_failure(&e)),
                    };
                }
                Err(e) => {
                    // keep what the earlier query found
                    warn!(query = %query, kept = items.len(), "Follow-up search failed: {}", e);
                    break;
                }
            };

            for hit in hits {
                if items.len() >= self.max_items {
                    break;
                }
                if let Some(item) = normalize_hit(hit)
                    && seen.insert(url_key(&item.url))
                {
                    items.push(item);
                }
            }
        }

        debug!(
            task = description,
            count = items.len(),
            "Collected evidence"
        );

        Collection {
            items,
            unavailable: None,
        }
    }
}

fn describe_failure(error: &AppError) -> String {
    match error {
        AppError::Cancelled => "evidence search cancelled".to_string(),
        other => other.to_string(),
    }
}

/// The task description itself, plus a condensed keyword form when it differs.
pub fn derive_queries(description: &str) -> Vec<String> {
    let primary = description.trim().trim_end_matches(['?', '.']).trim().to_string();
    if primary.is_empty() {
        return Vec::new();
    }

    let keywords: Vec<&str> = primary
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .take(MAX_KEYWORD_QUERY_WORDS)
        .collect();
    let condensed = keywords.join(" ");

    let mut queries = vec![primary];
    if !condensed.is_empty() && !condensed.eq_ignore_ascii_case(&queries[0]) {
        queries.push(condensed);
    }
    queries
}

/// Turn a raw hit into an evidence item, dropping hits without a usable url.
pub fn normalize_hit(hit: SearchHit) -> Option<EvidenceItem> {
    let url = hit.url.trim().to_string();
    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return None;
    }

    let title = collapse_whitespace(&hit.title);
    let title = if title.is_empty() { url.clone() } else { title };
    let snippet = super::prompts::shorten(&collapse_whitespace(&hit.snippet), MAX_SNIPPET_CHARS);

    Some(EvidenceItem {
        title,
        url,
        snippet,
    })
}

/// Identity key for url de-duplication: no fragment, no trailing slash,
/// case-insensitive scheme and host.
pub fn url_key(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let trimmed = without_fragment.trim().trim_end_matches('/');

    match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let (host, path) = match rest.find('/') {
                Some(pos) => rest.split_at(pos),
                None => (rest, ""),
            };
            format!(
                "{}://{}{}",
                scheme.to_ascii_lowercase(),
                host.to_ascii_lowercase(),
                path
            )
        }
        None => trimmed.to_string(),
    }
}

/// Host part of `url` without a leading `www.`; empty when there is none.
pub fn source_of(url: &str) -> String {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
