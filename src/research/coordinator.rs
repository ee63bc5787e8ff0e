use super::assembler::BriefAssembler;
use super::collector::EvidenceCollector;
use super::gateway::{EvidenceGateway, SynthesisGateway};
use super::planner::TaskPlanner;
use super::progress::{ProgressEvent, ProgressSink, ProgressTracker};
use super::synthesizer::TaskSynthesizer;
use crate::llm::Provider;
use crate::tools::search::SearchProvider;
use crate::types::{
    AppError, ErrorKind, Query, ResearchBrief, ResearchSession, Result, SessionStatus, Task,
    TaskStatus,
};
use crate::utils::toml_config::{BriefsmithConfig, MAX_DEADLINE_SECS, MAX_TASKS_CEILING};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Per-session limits, derived from configuration and overridable per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchSettings {
    pub max_tasks: usize,
    pub max_evidence_per_task: usize,
    pub concurrency: usize,
    pub deadline: Duration,
    pub grace_period: Duration,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_tasks: MAX_TASKS_CEILING,
            max_evidence_per_task: 8,
            concurrency: 3,
            deadline: Duration::from_secs(120),
            grace_period: Duration::from_secs(5),
        }
    }
}

impl ResearchSettings {
    pub fn from_config(config: &BriefsmithConfig) -> Self {
        Self {
            max_tasks: config.research.max_tasks,
            max_evidence_per_task: config.search.max_evidence_per_task,
            concurrency: config.research.concurrency,
            deadline: config.deadline(),
            grace_period: config.grace_period(),
        }
    }

    /// Apply request-level overrides; zero values are ignored.
    ///
    /// Concurrency is capped at the task ceiling and the deadline at
    /// [`MAX_DEADLINE_SECS`].
    pub fn with_overrides(mut self, concurrency: Option<usize>, deadline_secs: Option<u64>) -> Self {
        if let Some(concurrency) = concurrency.filter(|c| *c > 0) {
            self.concurrency = concurrency.min(MAX_TASKS_CEILING);
        }
        if let Some(secs) = deadline_secs.filter(|s| *s > 0) {
            self.deadline = Duration::from_secs(secs.min(MAX_DEADLINE_SECS));
        }
        self
    }

    /// Deadline measured from `start`, bounded so it cannot overflow.
    fn deadline_from(&self, start: Instant) -> Instant {
        let deadline = self.deadline.min(Duration::from_secs(MAX_DEADLINE_SECS));
        start.checked_add(deadline).unwrap_or(start)
    }

    fn permits(&self) -> usize {
        self.concurrency.clamp(1, MAX_TASKS_CEILING)
    }
}

/// Item of [`ResearchCoordinator::stream`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResearchEvent {
    Progress(ProgressEvent),
    Brief(ResearchBrief),
    Error { message: String },
}

/// Drives one research session from query to brief.
#[derive(Clone)]
pub struct ResearchCoordinator {
    planner: TaskPlanner,
    collector: EvidenceCollector,
    synthesizer: TaskSynthesizer,
    assembler: BriefAssembler,
    settings: ResearchSettings,
}

impl ResearchCoordinator {
    pub fn new(
        synthesis: Arc<SynthesisGateway>,
        evidence: Arc<EvidenceGateway>,
        settings: ResearchSettings,
    ) -> Self {
        Self {
            planner: TaskPlanner::new(synthesis.clone(), settings.max_tasks),
            collector: EvidenceCollector::new(evidence, settings.max_evidence_per_task),
            synthesizer: TaskSynthesizer::new(synthesis.clone()),
            assembler: BriefAssembler::new(synthesis),
            settings,
        }
    }

    /// Build the backends named in `config` and wire them into a coordinator.
    pub async fn from_config(config: &BriefsmithConfig) -> Result<Self> {
        let provider = Provider::from_config(&config.llm)?;
        let client = provider.create_client().await?;
        let backend = SearchProvider::from_config(&config.search)?.create_backend()?;

        info!(
            llm = provider.name(),
            model = provider.model(),
            search = backend.name(),
            "Research backends ready"
        );

        let synthesis = SynthesisGateway::from_config(Arc::from(client), &config.llm);
        let evidence = EvidenceGateway::from_config(backend, &config.search);
        Ok(Self::new(
            Arc::new(synthesis),
            Arc::new(evidence),
            ResearchSettings::from_config(config),
        ))
    }

    /// Same backends, different limits.
    pub fn with_settings(&self, settings: ResearchSettings) -> Self {
        Self {
            planner: TaskPlanner::new(self.synthesizer_gateway(), settings.max_tasks),
            collector: EvidenceCollector::new(
                self.collector_gateway(),
                settings.max_evidence_per_task,
            ),
            synthesizer: self.synthesizer.clone(),
            assembler: self.assembler.clone(),
            settings,
        }
    }

    pub fn settings(&self) -> &ResearchSettings {
        &self.settings
    }

    /// Run a full session and return the brief.
    ///
    /// Only an invalid query or [`AppError::PlanningUnavailable`] is returned
    /// as an error. Every later failure, including the deadline and `cancel`
    /// firing, degrades the brief instead.
    #[instrument(skip(self, cancel, sink), fields(session_id = tracing::field::Empty))]
    pub async fn research(
        &self,
        query: &str,
        cancel: &CancellationToken,
        sink: Option<ProgressSink>,
    ) -> Result<ResearchBrief> {
        let query = Query::new(query)?;
        let deadline_at = self.settings.deadline_from(Instant::now());
        let session_cancel = cancel.child_token();
        let tracker = ProgressTracker::new(sink);
        let mut session = ResearchSession::new(query.clone());
        tracing::Span::current().record("session_id", tracing::field::display(session.id));

        info!(query = %query, "Starting research session");

        // ---- planning ----
        tracker.stage(SessionStatus::Planning, "Planning research tasks");
        let planned = tokio::time::timeout_at(deadline_at, self.planner.plan(&query, &session_cancel))
            .await
            .unwrap_or_else(|_| {
                Err(AppError::PlanningUnavailable(format!(
                    "deadline of {:?} passed during planning",
                    self.settings.deadline
                )))
            });

        let descriptions = match planned {
            Ok(descriptions) => descriptions,
            Err(e) => {
                session_cancel.cancel();
                session.status = SessionStatus::Failed;
                tracker.stage(SessionStatus::Failed, e.to_string());
                warn!("Research session failed: {}", e);
                return Err(e);
            }
        };

        session.tasks = descriptions
            .into_iter()
            .enumerate()
            .map(|(id, description)| Task::new(id, description))
            .collect();
        tracker.tasks_planned(&session.tasks);

        // ---- research ----
        session.status = SessionStatus::Researching;
        tracker.stage(
            SessionStatus::Researching,
            format!("Researching {} tasks", session.tasks.len()),
        );
        let interrupt = self
            .run_pipelines(&mut session, &tracker, cancel, &session_cancel, deadline_at)
            .await;

        for task in session.tasks.iter_mut() {
            if !task.status.is_terminal() {
                let kind = interrupt.unwrap_or(ErrorKind::SynthesisUnavailable);
                warn!(task_id = task.id, "Task did not finish ({})", kind);
                task.fail(kind);
                tracker.task_status(task.id, TaskStatus::Failed);
            }
        }

        // ---- assembly ----
        session.status = SessionStatus::Synthesizing;
        tracker.stage(SessionStatus::Synthesizing, "Assembling research brief");
        let budget = self.assembly_budget(deadline_at, interrupt.is_some());
        let brief = self
            .assembler
            .assemble(&session, budget, &CancellationToken::new())
            .await;

        session.summary = Some(brief.summary.clone());
        session.status = SessionStatus::Complete;
        tracker.stage(
            SessionStatus::Complete,
            format!(
                "Research completed with {} tasks and {} references",
                brief.task_reports.len(),
                brief.references.len()
            ),
        );
        session_cancel.cancel();

        Ok(brief)
    }

    /// Run a session in the background and stream its progress, ending with
    /// exactly one `Brief` or `Error` event.
    ///
    /// Dropping the stream cancels the session.
    pub fn stream(
        self: Arc<Self>,
        query: String,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ResearchEvent> + Send + 'static {
        let coordinator = self;
        async_stream::stream! {
            let session_cancel = cancel.child_token();
            let _guard = session_cancel.clone().drop_guard();
            let (tx, mut rx) = mpsc::unbounded_channel();

            let token = session_cancel.clone();
            let handle = tokio::spawn(async move {
                coordinator.research(&query, &token, Some(tx)).await
            });

            while let Some(event) = rx.recv().await {
                yield ResearchEvent::Progress(event);
            }

            match handle.await {
                Ok(Ok(brief)) => yield ResearchEvent::Brief(brief),
                Ok(Err(e)) => yield ResearchEvent::Error { message: e.to_string() },
                Err(e) => yield ResearchEvent::Error {
                    message: format!("Research session aborted: {}", e),
                },
            }
        }
    }

    /// Drive every task pipeline to completion, the deadline, or `cancel`.
    ///
    /// Returns the interrupt kind when the session was cut short.
    async fn run_pipelines(
        &self,
        session: &mut ResearchSession,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
        session_cancel: &CancellationToken,
        deadline_at: Instant,
    ) -> Option<ErrorKind> {
        let (updates, mut rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(self.settings.permits()));
        let mut pipelines = JoinSet::new();

        for task in session.tasks.iter().cloned() {
            let pipeline = Pipeline {
                query: session.query.clone(),
                collector: self.collector.clone(),
                synthesizer: self.synthesizer.clone(),
                semaphore: semaphore.clone(),
                cancel: session_cancel.clone(),
                updates: updates.clone(),
            };
            pipelines.spawn(pipeline.run(task));
        }
        drop(updates);

        let interrupt = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Some(ErrorKind::Cancelled),
                _ = tokio::time::sleep_until(deadline_at) => break Some(ErrorKind::DeadlineExceeded),
                Some((task_id, status)) = rx.recv() => {
                    apply_status(session, tracker, task_id, status);
                }
                joined = pipelines.join_next() => match joined {
                    Some(result) => absorb(session, tracker, result),
                    None => break None,
                },
            }
        };

        let Some(kind) = interrupt else {
            return None;
        };

        warn!(
            pending = pipelines.len(),
            grace_ms = self.settings.grace_period.as_millis() as u64,
            "Research interrupted ({}), winding down pipelines",
            kind
        );
        session_cancel.cancel();

        let grace_end = Instant::now() + self.settings.grace_period;
        loop {
            tokio::select! {
                biased;
                joined = pipelines.join_next() => match joined {
                    Some(result) => absorb(session, tracker, result),
                    None => break,
                },
                _ = tokio::time::sleep_until(grace_end) => break,
            }
        }

        if !pipelines.is_empty() {
            warn!(remaining = pipelines.len(), "Aborting pipelines after grace period");
            pipelines.abort_all();
            while let Some(result) = pipelines.join_next().await {
                absorb(session, tracker, result);
            }
        }

        Some(kind)
    }

    fn assembly_budget(&self, deadline_at: Instant, interrupted: bool) -> Duration {
        let remaining = deadline_at.saturating_duration_since(Instant::now());
        let grace = self.settings.grace_period;
        if remaining.is_zero() {
            grace
        } else if interrupted {
            remaining.min(grace)
        } else {
            remaining
        }
    }

    fn synthesizer_gateway(&self) -> Arc<SynthesisGateway> {
        self.planner.gateway()
    }

    fn collector_gateway(&self) -> Arc<EvidenceGateway> {
        self.collector.gateway()
    }
}

fn apply_status(
    session: &mut ResearchSession,
    tracker: &ProgressTracker,
    task_id: usize,
    status: TaskStatus,
) {
    let Some(task) = session.tasks.get_mut(task_id) else {
        return;
    };
    // the finished task may already have been written back
    if task.status.can_advance_to(status) && task.advance(status).is_ok() {
        tracker.task_status(task_id, status);
    }
}

fn absorb(
    session: &mut ResearchSession,
    tracker: &ProgressTracker,
    result: std::result::Result<Task, JoinError>,
) {
    match result {
        Ok(task) => {
            let id = task.id;
            let status = task.status;
            if let Some(slot) = session.tasks.get_mut(id) {
                *slot = task;
            }
            if status.is_terminal() {
                tracker.task_status(id, status);
            }
        }
        Err(e) if e.is_cancelled() => debug!("Pipeline aborted"),
        Err(e) => warn!("Pipeline panicked: {}", e),
    }
}

/// Collector then synthesizer for one task, under the shared semaphore.
struct Pipeline {
    query: Query,
    collector: EvidenceCollector,
    synthesizer: TaskSynthesizer,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    updates: mpsc::UnboundedSender<(usize, TaskStatus)>,
}

impl Pipeline {
    /// Returns the task in a terminal state, or in its last reached state
    /// when the session was interrupted.
    async fn run(self, mut task: Task) -> Task {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return task,
            permit = self.semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return task,
            },
        };

        self.transition(&mut task, TaskStatus::Searching);
        let collection = self.collector.collect(&task.description, &self.cancel).await;
        task.evidence = collection.items;
        if self.cancel.is_cancelled() {
            return task;
        }
        if let Some(reason) = collection.unavailable {
            info!(task_id = task.id, "No external evidence ({}), falling back to LLM-only", reason);
            task.error = Some(ErrorKind::EvidenceUnavailable);
        }

        self.transition(&mut task, TaskStatus::Synthesizing);
        match self.synthesizer.synthesize(&self.query, &task, &self.cancel).await {
            Ok(findings) => {
                task.findings = Some(findings.text);
                task.llm_only = findings.llm_only;
                self.transition(&mut task, TaskStatus::Done);
            }
            Err(AppError::Cancelled) => {}
            Err(e) => {
                warn!(task_id = task.id, "Synthesis unavailable: {}", e);
                task.fail(ErrorKind::SynthesisUnavailable);
                let _ = self.updates.send((task.id, TaskStatus::Failed));
            }
        }

        task
    }

    fn transition(&self, task: &mut Task, next: TaskStatus) {
        match task.advance(next) {
            Ok(()) => {
                let _ = self.updates.send((task.id, next));
            }
            Err(e) => warn!("{}", e),
        }
    }
}
