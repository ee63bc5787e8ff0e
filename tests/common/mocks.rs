//! Scripted backends for pipeline tests.
//!
//! [`ScriptedLlm`] answers planning, findings and summary prompts from a
//! script, and [`ScriptedSearch`] answers searches by keyword. Both can inject
//! latency and failures per task, and record what they were asked.

#![allow(dead_code)]

use async_trait::async_trait;
use briefsmith::llm::{GenerationOptions, LLMClient};
use briefsmith::research::coordinator::{ResearchCoordinator, ResearchSettings};
use briefsmith::research::gateway::{CallPolicy, EvidenceGateway, SynthesisGateway};
use briefsmith::tools::search::{SearchBackend, SearchHit, SearchOptions};
use briefsmith::types::{AppError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Tracks how many calls are in flight at once.
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
struct Behaviour {
    delay: Duration,
    fail: bool,
}

/// Generative backend that recognizes the pipeline's prompt kinds.
pub struct ScriptedLlm {
    plan: Option<String>,
    plan_delay: Duration,
    tasks: HashMap<String, Behaviour>,
    summary: Option<String>,
    summary_delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Plans the given task descriptions as `Task N:` lines.
    pub fn planning(descriptions: &[&str]) -> Self {
        let plan = descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| format!("Task {}: {}", i + 1, d))
            .collect::<Vec<_>>()
            .join("\n");
        Self::with_plan_text(&plan)
    }

    /// Answers the planning prompt with raw text.
    pub fn with_plan_text(text: &str) -> Self {
        Self {
            plan: Some(text.to_string()),
            plan_delay: Duration::ZERO,
            tasks: HashMap::new(),
            summary: Some("Executive summary of the research.".to_string()),
            summary_delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails the planning call.
    pub fn failing_plan(mut self) -> Self {
        self.plan = None;
        self
    }

    pub fn plan_delay(mut self, delay: Duration) -> Self {
        self.plan_delay = delay;
        self
    }

    /// Delays the findings call of the task with this description.
    pub fn task_delay(mut self, description: &str, delay: Duration) -> Self {
        self.tasks.entry(description.to_string()).or_default().delay = delay;
        self
    }

    /// Fails the findings call of the task with this description.
    pub fn failing_task(mut self, description: &str) -> Self {
        self.tasks.entry(description.to_string()).or_default().fail = true;
        self
    }

    pub fn failing_summary(mut self) -> Self {
        self.summary = None;
        self
    }

    pub fn summary_delay(mut self, delay: Duration) -> Self {
        self.summary_delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn summary_calls(&self) -> usize {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains("write an executive summary"))
            .count()
    }
}

fn task_description(prompt: &str) -> Option<&str> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Research task: "))
        .map(str::trim)
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());

        if prompt.contains("Break it down into") {
            tokio::time::sleep(self.plan_delay).await;
            return self
                .plan
                .clone()
                .ok_or_else(|| AppError::LLM("connection refused".to_string()));
        }

        if prompt.contains("write an executive summary") {
            tokio::time::sleep(self.summary_delay).await;
            return self
                .summary
                .clone()
                .ok_or_else(|| AppError::LLM("connection refused".to_string()));
        }

        let description = task_description(prompt).unwrap_or_default().to_string();
        let behaviour = self.tasks.get(&description).cloned().unwrap_or_default();
        tokio::time::sleep(behaviour.delay).await;
        if behaviour.fail {
            return Err(AppError::LLM("connection refused".to_string()));
        }

        if prompt.contains("No external sources are available") {
            Ok(format!("Based on general knowledge, {}.", description))
        } else {
            Ok(format!("Findings for {} [1].", description))
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Search backend answering by case-insensitive keyword match on the query.
#[derive(Default)]
pub struct ScriptedSearch {
    results: Vec<(String, Vec<SearchHit>)>,
    failures: Vec<String>,
    delay: Duration,
    queries: Mutex<Vec<String>>,
    gauge: Arc<Gauge>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries containing `keyword` return these `(title, url)` hits.
    pub fn results(mut self, keyword: &str, hits: &[(&str, &str)]) -> Self {
        let hits = hits
            .iter()
            .map(|(title, url)| SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                snippet: format!("Snippet about {}", title),
            })
            .collect();
        self.results.push((keyword.to_lowercase(), hits));
        self
    }

    /// Queries containing `keyword` fail with a quota error.
    pub fn failing(mut self, keyword: &str) -> Self {
        self.failures.push(keyword.to_lowercase());
        self
    }

    /// Latency of every search.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn gauge(&self) -> Arc<Gauge> {
        self.gauge.clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    async fn search(&self, query: &str, _options: &SearchOptions) -> Result<Vec<SearchHit>> {
        self.queries.lock().push(query.to_string());
        let lower = query.to_lowercase();

        self.gauge.enter();
        tokio::time::sleep(self.delay).await;
        self.gauge.exit();

        if self.failures.iter().any(|k| lower.contains(k)) {
            return Err(AppError::QuotaExceeded("daily limit reached".to_string()));
        }

        Ok(self
            .results
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, hits)| hits.clone())
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Settings with short timings for tests.
pub fn test_settings() -> ResearchSettings {
    ResearchSettings {
        max_tasks: 5,
        max_evidence_per_task: 8,
        concurrency: 3,
        deadline: Duration::from_secs(10),
        grace_period: Duration::from_millis(200),
    }
}

/// Wire scripted backends into a coordinator without retries.
pub fn coordinator(
    llm: Arc<ScriptedLlm>,
    search: Arc<ScriptedSearch>,
    settings: ResearchSettings,
) -> ResearchCoordinator {
    let policy = CallPolicy::new(Duration::from_secs(30), 0, Duration::from_millis(1));
    let synthesis = SynthesisGateway::new(llm, GenerationOptions::default(), policy);
    let evidence = EvidenceGateway::new(search, 5, policy);
    ResearchCoordinator::new(Arc::new(synthesis), Arc::new(evidence), settings)
}
