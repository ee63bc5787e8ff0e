//! Final brief assembly: executive summary plus de-duplicated references.

use super::collector::{source_of, url_key};
use super::gateway::SynthesisGateway;
use super::prompts;
use crate::types::{
    ErrorKind, FINDINGS_UNAVAILABLE, Reference, ResearchBrief, ResearchSession, Task, TaskReport,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Summary used when no task produced findings.
pub const NO_FINDINGS_SUMMARY: &str = "No findings available.";

/// Summary used when the summary call itself failed.
pub const SUMMARY_UNAVAILABLE: &str = "Executive summary unavailable.";

#[derive(Clone)]
pub struct BriefAssembler {
    gateway: Arc<SynthesisGateway>,
}

impl BriefAssembler {
    pub fn new(gateway: Arc<SynthesisGateway>) -> Self {
        Self { gateway }
    }

    /// Build the brief for a finished session. Never fails.
    ///
    /// The summary call is bounded by `budget`; when it fails or runs out of
    /// time the fixed [`SUMMARY_UNAVAILABLE`] text is used instead.
    pub async fn assemble(
        &self,
        session: &ResearchSession,
        budget: Duration,
        cancel: &CancellationToken,
    ) -> ResearchBrief {
        let (summary, summary_degraded) = self.summarize(session, budget, cancel).await;

        let brief = ResearchBrief {
            title: format!("Research Brief: {}", session.query),
            query: session.query.as_str().to_string(),
            generated_at: Utc::now(),
            summary,
            summary_degraded,
            task_reports: session.tasks.iter().map(task_report).collect(),
            references: build_references(&session.tasks),
        };

        info!(
            session_id = %session.id,
            tasks = brief.task_reports.len(),
            references = brief.references.len(),
            summary_degraded,
            "Assembled research brief"
        );
        brief
    }

    async fn summarize(
        &self,
        session: &ResearchSession,
        budget: Duration,
        cancel: &CancellationToken,
    ) -> (String, bool) {
        let findings: Vec<(&str, &str)> = session
            .tasks
            .iter()
            .filter_map(|task| {
                task.usable_findings()
                    .map(|text| (task.description.as_str(), text))
            })
            .collect();

        if findings.is_empty() {
            return (NO_FINDINGS_SUMMARY.to_string(), false);
        }

        let prompt = prompts::summary_prompt(session.query.as_str(), &findings);
        match tokio::time::timeout(budget, self.gateway.generate(&prompt, cancel)).await {
            Ok(Ok(summary)) => (summary.trim().to_string(), false),
            Ok(Err(e)) => {
                warn!("Executive summary unavailable ({}): {}", ErrorKind::AssemblyDegraded, e);
                (SUMMARY_UNAVAILABLE.to_string(), true)
            }
            Err(_) => {
                warn!(
                    budget_ms = budget.as_millis() as u64,
                    "Executive summary ran out of time ({})",
                    ErrorKind::AssemblyDegraded
                );
                (SUMMARY_UNAVAILABLE.to_string(), true)
            }
        }
    }
}

fn task_report(task: &Task) -> TaskReport {
    TaskReport {
        id: task.id,
        description: task.description.clone(),
        status: task.status,
        findings: task
            .findings
            .clone()
            .unwrap_or_else(|| FINDINGS_UNAVAILABLE.to_string()),
        llm_only: task.llm_only,
        error: task.error,
    }
}

/// Union of all tasks' evidence, de-duplicated by url in first-appearance
/// order (task order, then item order), numbered from 1.
pub fn build_references(tasks: &[Task]) -> Vec<Reference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for task in tasks {
        for item in &task.evidence {
            if seen.insert(url_key(&item.url)) {
                references.push(Reference {
                    index: references.len() + 1,
                    title: item.title.clone(),
                    url: item.url.clone(),
                    source: source_of(&item.url),
                    task_id: task.id,
                });
            }
        }
    }

    references
}
