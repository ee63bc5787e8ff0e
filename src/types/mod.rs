use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Placeholder findings for a task whose synthesis did not complete.
pub const FINDINGS_UNAVAILABLE: &str = "findings unavailable";

/// Soft marker attached to tasks that were synthesized without external evidence.
pub const NO_EXTERNAL_EVIDENCE: &str = "no external evidence available";

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub brief: ResearchBrief,
    pub rendered: String,
    pub duration_ms: u64,
}

// ============= Query =============

/// A validated, immutable research query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Validate and normalize raw caller input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput(
                "Research query must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============= Task Types =============

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Searching,
    Synthesizing,
    Done,
    Failed,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Searching => 1,
            TaskStatus::Synthesizing => 2,
            TaskStatus::Done => 3,
            TaskStatus::Failed => 4,
        }
    }

    /// Whether the status can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Statuses only move forward along the pipeline, or divert to `Failed`
    /// from any non-terminal state.
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            TaskStatus::Failed => true,
            TaskStatus::Pending => false,
            _ => next.rank() == self.rank() + 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Searching => "searching",
            TaskStatus::Synthesizing => "synthesizing",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Degradation kinds recorded on tasks and sessions.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PlanningUnavailable,
    EvidenceUnavailable,
    SynthesisUnavailable,
    DeadlineExceeded,
    AssemblyDegraded,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PlanningUnavailable => "planning unavailable",
            ErrorKind::EvidenceUnavailable => "evidence unavailable",
            ErrorKind::SynthesisUnavailable => "synthesis unavailable",
            ErrorKind::DeadlineExceeded => "deadline exceeded",
            ErrorKind::AssemblyDegraded => "assembly degraded",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized search result. The url is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// One decomposed research angle and everything gathered for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: usize,
    pub description: String,
    pub status: TaskStatus,
    pub evidence: Vec<EvidenceItem>,
    pub findings: Option<String>,
    /// Set when findings were produced without external evidence.
    pub llm_only: bool,
    pub error: Option<ErrorKind>,
}

impl Task {
    pub fn new(id: usize, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: TaskStatus::Pending,
            evidence: Vec::new(),
            findings: None,
            llm_only: false,
            error: None,
        }
    }

    /// Move the task to `next`, rejecting backward or post-terminal transitions.
    pub fn advance(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_advance_to(next) {
            return Err(AppError::Internal(format!(
                "Task {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Mark the task failed with placeholder findings. No-op on `Done` tasks.
    pub fn fail(&mut self, kind: ErrorKind) {
        if self.status == TaskStatus::Done {
            return;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(kind);
        self.findings = Some(FINDINGS_UNAVAILABLE.to_string());
    }

    /// Findings that came from a real synthesis call.
    pub fn usable_findings(&self) -> Option<&str> {
        match (&self.status, &self.findings) {
            (TaskStatus::Done, Some(findings)) => Some(findings.as_str()),
            _ => None,
        }
    }
}

// ============= Session Types =============

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Planning,
    Researching,
    Synthesizing,
    Complete,
    Failed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Planning => "planning",
            SessionStatus::Researching => "researching",
            SessionStatus::Synthesizing => "synthesizing",
            SessionStatus::Complete => "complete",
            SessionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory state of one research request. Never persisted.
#[derive(Debug, Clone)]
pub struct ResearchSession {
    pub id: Uuid,
    pub query: Query,
    pub tasks: Vec<Task>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl ResearchSession {
    pub fn new(query: Query) -> Self {
        Self {
            id: Uuid::new_v4(),
            query,
            tasks: Vec::new(),
            summary: None,
            created_at: Utc::now(),
            status: SessionStatus::Planning,
        }
    }
}

// ============= Brief Types =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: usize,
    pub description: String,
    pub status: TaskStatus,
    pub findings: String,
    pub llm_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// 1-based position in the reference list
    pub index: usize,
    pub title: String,
    pub url: String,
    /// Host the url points at, without a leading `www.`
    #[serde(default)]
    pub source: String,
    /// Task in which the url first appeared
    pub task_id: usize,
}

/// The final, immutable research document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub title: String,
    pub query: String,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub summary_degraded: bool,
    pub task_reports: Vec<TaskReport>,
    pub references: Vec<Reference>,
}

impl ResearchBrief {
    /// Human readable descriptions of every degraded section.
    pub fn degraded_sections(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if self.summary_degraded {
            notes.push(format!(
                "Executive summary: {}",
                ErrorKind::AssemblyDegraded.as_str()
            ));
        }
        for (i, report) in self.task_reports.iter().enumerate() {
            if let Some(kind) = report.error
                && report.status == TaskStatus::Failed
            {
                notes.push(format!("Task {}: {}", i + 1, kind));
            } else if report.llm_only {
                notes.push(format!("Task {}: {}", i + 1, NO_EXTERNAL_EVIDENCE));
            }
        }
        notes
    }

    /// Render the brief as a flat text document with a fixed section order.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("{}\n", self.title));
        out.push_str(&format!(
            "Generated: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        out.push_str("EXECUTIVE SUMMARY\n");
        out.push_str(self.summary.trim());
        out.push_str("\n\n");

        out.push_str("RESEARCH TASKS EXECUTED\n");
        for (i, report) in self.task_reports.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, report.description));
        }

        out.push_str("\nKEY FINDINGS\n");
        for (i, report) in self.task_reports.iter().enumerate() {
            out.push_str(&format!("\nTask {}: {}\n", i + 1, report.description));
            match (report.status, report.error) {
                (TaskStatus::Failed, Some(kind)) => {
                    out.push_str(&format!("[{}] ({})\n", report.findings.trim(), kind));
                }
                _ => {
                    out.push_str(report.findings.trim());
                    out.push('\n');
                    if report.llm_only {
                        out.push_str(&format!(
                            "(LLM-only: {}, no citations)\n",
                            NO_EXTERNAL_EVIDENCE
                        ));
                    }
                }
            }
        }

        out.push_str("\nREFERENCES\n");
        if self.references.is_empty() {
            out.push_str("None\n");
        }
        for reference in &self.references {
            if reference.source.is_empty() {
                out.push_str(&format!(
                    "{}. {} - {}\n",
                    reference.index, reference.title, reference.url
                ));
            } else {
                out.push_str(&format!(
                    "{}. {} - {} ({})\n",
                    reference.index, reference.title, reference.url, reference.source
                ));
            }
        }

        let notes = self.degraded_sections();
        if !notes.is_empty() {
            out.push_str("\nNOTES\n");
            for note in notes {
                out.push_str(&format!("- {}\n", note));
            }
        }

        out.push_str(&format!(
            "\nResearch completed with {} tasks and {} references\n",
            self.task_reports.len(),
            self.references.len()
        ));

        out
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Research planning unavailable: {0}")]
    PlanningUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transient backend failures that a bounded retry may fix.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::LLM(_) | AppError::Search(_) | AppError::Timeout(_)
        )
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::PlanningUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
