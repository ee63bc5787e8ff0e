//! Query decomposition into research sub-tasks.

use super::gateway::SynthesisGateway;
use super::prompts;
use crate::types::{AppError, Query, Result};
use crate::utils::toml_config::MAX_TASKS_CEILING;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Decomposes a query into an ordered list of task descriptions.
#[derive(Clone)]
pub struct TaskPlanner {
    gateway: Arc<SynthesisGateway>,
    max_tasks: usize,
}

impl TaskPlanner {
    pub fn new(gateway: Arc<SynthesisGateway>, max_tasks: usize) -> Self {
        Self {
            gateway,
            max_tasks: max_tasks.clamp(1, MAX_TASKS_CEILING),
        }
    }

    pub fn gateway(&self) -> Arc<SynthesisGateway> {
        self.gateway.clone()
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    /// Plan the research tasks for `query`.
    ///
    /// Always yields between 1 and `max_tasks` descriptions. An unparseable
    /// response falls back to the query itself; a failed backend call is
    /// reported as [`AppError::PlanningUnavailable`].
    pub async fn plan(&self, query: &Query, cancel: &CancellationToken) -> Result<Vec<String>> {
        let prompt = prompts::planning_prompt(query.as_str(), self.max_tasks);

        let response = self
            .gateway
            .generate(&prompt, cancel)
            .await
            .map_err(|e| AppError::PlanningUnavailable(e.to_string()))?;

        let tasks = parse_task_list(&response, self.max_tasks);
        if tasks.is_empty() {
            warn!("Planner response had no parseable tasks, using the query as the only task");
            return Ok(vec![query.as_str().to_string()]);
        }

        info!(count = tasks.len(), "Planned research tasks");
        Ok(tasks)
    }
}

/// Extract enumerated or bulleted items from free-form planner output.
///
/// Recognizes `Task 1: ...`, `1. ...`, `1) ...`, `- ...`, `* ...` and `• ...`
/// lines. Unmarked lines are treated as commentary and skipped. Items are
/// de-duplicated case-insensitively and truncated to `max`.
pub fn parse_task_list(text: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();

    for line in text.lines() {
        if tasks.len() >= max {
            break;
        }
        let Some(item) = strip_list_marker(line.trim()) else {
            continue;
        };
        let item = clean_item(item);
        if item.is_empty() {
            continue;
        }
        if seen.insert(item.to_lowercase()) {
            tasks.push(item);
        }
    }

    tasks
}

fn strip_list_marker(line: &str) -> Option<&str> {
    for bullet in ['-', '*', '•', '+'] {
        if let Some(rest) = line.strip_prefix(bullet)
            && rest.starts_with(char::is_whitespace)
        {
            return Some(rest);
        }
    }

    // markdown emphasis or headings around the marker
    let line = line.trim_start_matches(['*', '_', '#']).trim_start();

    if let Some(rest) = strip_task_prefix(line) {
        return Some(rest);
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        for marker in ['.', ')', ':'] {
            if let Some(rest) = rest.strip_prefix(marker) {
                return Some(rest);
            }
        }
    }

    None
}

/// `Task 1:`, `Task 1 -`, `task 2.`; case-insensitive.
fn strip_task_prefix(line: &str) -> Option<&str> {
    let head = line.get(..4)?;
    if !head.eq_ignore_ascii_case("task") {
        return None;
    }
    let rest = line[4..].trim_start();
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = rest[digits..].trim_start();
    rest.strip_prefix([':', '.', '-', ')'])
}

fn clean_item(item: &str) -> String {
    item.trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c == '"' || c == '[' || c == ']')
        .trim()
        .to_string()
}
