use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::engine::{Engine, EngineOutput};
use crate::error::Result;
use crate::pipeline::MediaCommand;
use super::{
    CompletionSink, Job, JobEvent, JobId, JobOutcome, JobRequest, JobSnapshot, JobState,
    ProgressSink, ProgressUpdate, EXECUTOR_SHUTDOWN, JOB_ABANDONED,
};

/// Snapshots of live jobs plus the most recent finished ones.
#[derive(Debug)]
struct JobRegistry {
    snapshots: HashMap<JobId, JobSnapshot>,
    /// Finished job ids, oldest first
    finished: VecDeque<JobId>,
    retain_finished: usize,
}

impl JobRegistry {
    fn new(retain_finished: usize) -> Self {
        Self {
            snapshots: HashMap::new(),
            finished: VecDeque::new(),
            retain_finished,
        }
    }

    fn insert(&mut self, snapshot: JobSnapshot) {
        self.snapshots.insert(snapshot.id, snapshot);
    }

    fn get(&self, id: JobId) -> Option<&JobSnapshot> {
        self.snapshots.get(&id)
    }

    fn mark_running(&mut self, id: JobId) {
        if let Some(snapshot) = self.snapshots.get_mut(&id) {
            snapshot.state = JobState::Running;
            snapshot.started_at = Some(Utc::now());
        }
    }

    fn mark_finished(&mut self, id: JobId, outcome: &JobOutcome) {
        let Some(snapshot) = self.snapshots.get_mut(&id) else {
            return;
        };
        if snapshot.state.is_terminal() {
            return;
        }
        snapshot.state = outcome.state();
        snapshot.finished_at = Some(Utc::now());
        snapshot.outcome = Some(outcome.clone());

        self.finished.push_back(id);
        while self.finished.len() > self.retain_finished {
            if let Some(oldest) = self.finished.pop_front() {
                self.snapshots.remove(&oldest);
            }
        }
    }

    fn pending(&self) -> usize {
        self.snapshots.len().saturating_sub(self.finished.len())
    }
}

type Registry = Arc<Mutex<JobRegistry>>;

/// Caller's side of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    progress: Option<mpsc::Receiver<ProgressUpdate>>,
    completion: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Take the job's progress stream. Returns `None` after the first call.
    pub fn take_progress(&mut self) -> Option<mpsc::Receiver<ProgressUpdate>> {
        self.progress.take()
    }

    /// Wait for the terminal outcome.
    pub async fn wait(self) -> JobOutcome {
        self.completion.await.unwrap_or_else(|_| {
            JobOutcome::failure(JOB_ABANDONED, "Job ended without reporting a result")
        })
    }
}

/// Single-worker job queue.
///
/// Submissions are accepted from any number of tasks and run one at a time
/// in submission order on a dedicated background task.
pub struct JobExecutor {
    queue: mpsc::UnboundedSender<Job>,
    events: broadcast::Sender<JobEvent>,
    registry: Registry,
    config: ExecutorConfig,
    worker: JoinHandle<()>,
}

impl JobExecutor {
    /// Start the worker. Must be called from within a tokio runtime.
    pub fn spawn(engine: Arc<dyn Engine>, config: ExecutorConfig) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let registry: Registry = Arc::new(Mutex::new(JobRegistry::new(config.retain_finished)));

        let worker = tokio::spawn(run_worker(
            rx,
            engine,
            Arc::clone(&registry),
            events.clone(),
            config.overwrite,
        ));

        Self { queue, events, registry, config, worker }
    }

    /// Enqueue a job and return immediately.
    pub fn submit(&self, request: JobRequest) -> JobHandle {
        let id = JobId::new();
        let (progress_tx, progress_rx) = mpsc::channel(self.config.progress_capacity.max(1));
        let (completion_tx, completion_rx) = oneshot::channel();

        let job = Job {
            id,
            submitted_at: Utc::now(),
            completion: CompletionSink::new(id, completion_tx),
            progress: ProgressSink::new(
                id,
                request.descriptor.expected_duration(),
                progress_tx,
                self.events.clone(),
            ),
            request,
        };

        let snapshot = JobSnapshot {
            id,
            description: job.request.description.clone(),
            state: JobState::Queued,
            submitted_at: job.submitted_at,
            started_at: None,
            finished_at: None,
            outcome: None,
        };
        lock(&self.registry).insert(snapshot);

        info!("Queued job {} ({})", id, job.request.description);

        // Registered and announced before the send so the worker's updates
        // always follow these.
        let _ = self.events.send(JobEvent::Queued { job_id: id });
        if let Err(mpsc::error::SendError(job)) = self.queue.send(job) {
            warn!("Job worker is gone, rejecting job {}", id);
            let outcome = JobOutcome::failure(EXECUTOR_SHUTDOWN, "Job executor is not running");
            finish(&self.registry, &self.events, job.id, &outcome);
            job.completion.complete(outcome);
        }

        JobHandle { id, progress: Some(progress_rx), completion: completion_rx }
    }

    /// Subscribe to lifecycle and progress events of all jobs.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Snapshot of a live job, or of one of the last `retain_finished`
    /// finished jobs.
    pub fn status(&self, id: JobId) -> Option<JobSnapshot> {
        lock(&self.registry).get(id).cloned()
    }

    /// Jobs that have not reached a terminal state.
    pub fn pending(&self) -> usize {
        lock(&self.registry).pending()
    }

    /// Stop accepting jobs, run everything already queued, then stop the worker.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.queue);
        if let Err(e) = self.worker.await {
            warn!("Job worker ended abnormally: {}", e);
        }
        Ok(())
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    engine: Arc<dyn Engine>,
    registry: Registry,
    events: broadcast::Sender<JobEvent>,
    overwrite: bool,
) {
    debug!("Job worker started");
    while let Some(job) = rx.recv().await {
        run_job(job, &engine, &registry, &events, overwrite).await;
    }
    debug!("Job worker stopped");
}

async fn run_job(
    job: Job,
    engine: &Arc<dyn Engine>,
    registry: &Registry,
    events: &broadcast::Sender<JobEvent>,
    overwrite: bool,
) {
    let Job { id, request, completion, progress, .. } = job;

    lock(registry).mark_running(id);
    let _ = events.send(JobEvent::Started { job_id: id });

    let command = MediaCommand::from_pipeline(
        engine.binary_path(),
        request.description.clone(),
        &request.descriptor,
        overwrite,
    );
    info!("Running job {}: {}", id, request.description);
    debug!("Job {} command: {}", id, command.command_line());

    // Separate task so a panicking engine fails this job instead of the worker.
    let engine = Arc::clone(engine);
    let result = tokio::spawn(async move {
        engine
            .execute(&command, Box::new(move |seconds| progress.report(seconds)))
            .await
    })
    .await;

    let outcome = classify(&request, result);
    match &outcome {
        JobOutcome::Success { message } => info!("Job {} succeeded: {}", id, message),
        JobOutcome::Failure { code, message } => warn!("Job {} failed [{}]: {}", id, code, message),
    }

    finish(registry, events, id, &outcome);
    completion.complete(outcome);
}

/// Map the engine's result onto exactly one terminal outcome.
fn classify(
    request: &JobRequest,
    result: std::result::Result<Result<EngineOutput>, JoinError>,
) -> JobOutcome {
    match result {
        Ok(Ok(output)) if output.succeeded => JobOutcome::success(request.success_message.clone()),
        Ok(Ok(output)) => {
            let rc = output
                .return_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let detail = output.message.trim();
            let message = if detail.is_empty() {
                format!("{} failed with rc={}", request.description, rc)
            } else {
                format!("{} failed with rc={}: {}", request.description, rc, detail)
            };
            JobOutcome::failure("ENGINE_ERROR", message)
        }
        Ok(Err(err)) => {
            JobOutcome::failure(err.code(), format!("{} failed: {}", request.description, err))
        }
        Err(join_err) => JobOutcome::failure(
            JOB_ABANDONED,
            format!("{} aborted: {}", request.description, join_err),
        ),
    }
}

fn finish(registry: &Registry, events: &broadcast::Sender<JobEvent>, id: JobId, outcome: &JobOutcome) {
    lock(registry).mark_finished(id, outcome);
    let _ = events.send(JobEvent::Finished { job_id: id, outcome: outcome.clone() });
}

fn lock(registry: &Registry) -> MutexGuard<'_, JobRegistry> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}
