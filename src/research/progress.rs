//! Session progress reporting.
//!
//! The orchestrator is the only writer; readers may take a
//! [`ProgressSnapshot`] at any time, and every update is also forwarded to an
//! optional channel so presentation layers can render it live.

use crate::types::{SessionStatus, Task, TaskStatus};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving end for live progress updates.
pub type ProgressSink = mpsc::UnboundedSender<ProgressEvent>;

const PLANNING_PERCENT: u8 = 10;
const RESEARCH_END_PERCENT: u8 = 90;
const ASSEMBLY_PERCENT: u8 = 95;
const COMPLETE_PERCENT: u8 = 100;

/// One progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    pub message: String,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub id: usize,
    pub description: String,
    pub status: TaskStatus,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub stage: SessionStatus,
    pub tasks: Vec<TaskProgress>,
    pub completed: usize,
    pub percent: u8,
}

pub struct ProgressTracker {
    state: RwLock<ProgressSnapshot>,
    completed: AtomicUsize,
    sink: Option<ProgressSink>,
}

impl ProgressTracker {
    pub fn new(sink: Option<ProgressSink>) -> Self {
        Self {
            state: RwLock::new(ProgressSnapshot {
                stage: SessionStatus::Planning,
                tasks: Vec::new(),
                completed: 0,
                percent: 0,
            }),
            completed: AtomicUsize::new(0),
            sink,
        }
    }

    /// Record a session stage transition.
    pub fn stage(&self, stage: SessionStatus, message: impl Into<String>) {
        let percent = {
            let mut state = self.state.write();
            state.stage = stage;
            state.percent = match stage {
                SessionStatus::Planning => PLANNING_PERCENT,
                SessionStatus::Researching => research_percent(state.completed, state.tasks.len()),
                SessionStatus::Synthesizing => ASSEMBLY_PERCENT,
                SessionStatus::Complete => COMPLETE_PERCENT,
                SessionStatus::Failed => state.percent,
            };
            state.percent
        };

        self.emit(ProgressEvent {
            stage,
            task_id: None,
            status: None,
            message: message.into(),
            percent,
        });
    }

    /// Register the planned tasks; the list is fixed from here on.
    pub fn tasks_planned(&self, tasks: &[Task]) {
        let mut state = self.state.write();
        state.tasks = tasks
            .iter()
            .map(|task| TaskProgress {
                id: task.id,
                description: task.description.clone(),
                status: task.status,
            })
            .collect();
    }

    /// Record a task status change. Late or backward updates are ignored.
    pub fn task_status(&self, task_id: usize, status: TaskStatus) {
        let event = {
            let mut state = self.state.write();
            let total = state.tasks.len();
            let Some(entry) = state.tasks.iter_mut().find(|t| t.id == task_id) else {
                debug!(task_id, "Progress update for unknown task");
                return;
            };
            // terminal outcomes may skip intermediate steps the tracker never saw
            let accepted = if status.is_terminal() {
                !entry.status.is_terminal()
            } else {
                entry.status.can_advance_to(status)
            };
            if !accepted {
                return;
            }
            entry.status = status;
            let message = format!("Task {}: {} ({})", task_id + 1, entry.description, status);

            if status.is_terminal() {
                let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
                state.completed = completed;
                state.percent = research_percent(completed, total);
            }

            ProgressEvent {
                stage: state.stage,
                task_id: Some(task_id),
                status: Some(status),
                message,
                percent: state.percent,
            }
        };

        self.emit(event);
    }

    /// Pipelines that reached a terminal status.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn percent(&self) -> u8 {
        self.state.read().percent
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.read().clone()
    }

    fn emit(&self, event: ProgressEvent) {
        debug!(stage = %event.stage, percent = event.percent, "{}", event.message);
        if let Some(sink) = &self.sink {
            // the receiver may have gone away; progress is best effort
            let _ = sink.send(event);
        }
    }
}

fn research_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return PLANNING_PERCENT;
    }
    let span = (RESEARCH_END_PERCENT - PLANNING_PERCENT) as usize;
    let done = completed.min(total);
    PLANNING_PERCENT + (span * done / total) as u8
}
