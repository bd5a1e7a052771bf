use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use super::{JobId, JobOutcome, JOB_ABANDONED};

/// Name of the progress event on the shared event bus.
pub const PROGRESS_EVENT: &str = "reelcut://progress";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    /// Output time processed so far
    pub seconds: f64,
    /// `seconds` over the expected output duration, when that is known
    pub fraction: Option<f64>,
}

impl ProgressUpdate {
    /// The single numeric progress value: the fraction when known,
    /// processed seconds otherwise.
    pub fn progress(&self) -> f64 {
        self.fraction.unwrap_or(self.seconds)
    }
}

/// Lifecycle notifications broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Queued { job_id: JobId },
    Started { job_id: JobId },
    Progress(ProgressUpdate),
    Finished { job_id: JobId, outcome: JobOutcome },
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Queued { .. } => "reelcut://queued",
            JobEvent::Started { .. } => "reelcut://started",
            JobEvent::Progress(_) => PROGRESS_EVENT,
            JobEvent::Finished { .. } => "reelcut://finished",
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Queued { job_id }
            | JobEvent::Started { job_id }
            | JobEvent::Finished { job_id, .. } => *job_id,
            JobEvent::Progress(update) => update.job_id,
        }
    }
}

/// Non-blocking, order-preserving progress relay for one job.
///
/// Updates go to the job's own bounded channel and to the event bus.
/// A full channel drops the update rather than stalling the engine, and
/// values below the last delivered one are discarded.
pub struct ProgressSink {
    job_id: JobId,
    expected_duration: Option<f64>,
    tx: mpsc::Sender<ProgressUpdate>,
    events: broadcast::Sender<JobEvent>,
    last: Mutex<Option<f64>>,
}

impl ProgressSink {
    pub fn new(
        job_id: JobId,
        expected_duration: Option<f64>,
        tx: mpsc::Sender<ProgressUpdate>,
        events: broadcast::Sender<JobEvent>,
    ) -> Self {
        Self {
            job_id,
            expected_duration: expected_duration.filter(|d| *d > 0.0),
            tx,
            events,
            last: Mutex::new(None),
        }
    }

    pub fn report(&self, seconds: f64) {
        if !seconds.is_finite() || seconds < 0.0 {
            return;
        }

        {
            let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(*last, Some(prev) if seconds < prev) {
                debug!("Job {}: dropping regressing progress {}", self.job_id, seconds);
                return;
            }
            *last = Some(seconds);
        }

        let update = ProgressUpdate {
            job_id: self.job_id,
            seconds,
            fraction: self.expected_duration.map(|d| (seconds / d).min(1.0)),
        };

        match self.tx.try_send(update) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Job {}: progress consumer is behind, dropping update", self.job_id);
            }
            // Nobody is listening on this job's channel
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }

        let _ = self.events.send(JobEvent::Progress(update));
    }
}

/// Exactly-once terminal delivery for one job.
///
/// `complete` consumes the sink; dropping it undelivered resolves the job
/// with a `JOB_ABANDONED` failure so no caller waits forever.
pub struct CompletionSink {
    job_id: JobId,
    tx: Option<oneshot::Sender<JobOutcome>>,
}

impl CompletionSink {
    pub fn new(job_id: JobId, tx: oneshot::Sender<JobOutcome>) -> Self {
        Self { job_id, tx: Some(tx) }
    }

    pub fn complete(mut self, outcome: JobOutcome) {
        self.deliver(outcome);
    }

    fn deliver(&mut self, outcome: JobOutcome) {
        if let Some(tx) = self.tx.take() {
            if tx.send(outcome).is_err() {
                debug!("Job {}: caller dropped its handle before completion", self.job_id);
            }
        }
    }
}

impl Drop for CompletionSink {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!("Job {} was dropped without a result", self.job_id);
            self.deliver(JobOutcome::failure(
                JOB_ABANDONED,
                "Job was dropped before the engine reported a result",
            ));
        }
    }
}
