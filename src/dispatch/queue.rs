//! Dispatch queue - runs actions off the event loop
//!
//! The event loop submits jobs without waiting. A single worker task pulls
//! them in FIFO order and runs each one on its own task, bounded by a
//! semaphore. A coordinate never has more than one job queued or running:
//! presses that arrive while its action is still in flight are coalesced.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::{ActionExecutor, DispatchResult};
use crate::grid::Coordinate;

/// Work item for the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchJob {
    pub coordinate: Coordinate,
    pub action_ref: String,
}

/// Completed dispatch, published on the report channel
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub coordinate: Coordinate,
    pub action_ref: String,
    pub result: DispatchResult,
}

/// What happened to a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// The coordinate already has a job queued or running
    Coalesced,
    /// Queue at capacity; the job was dropped
    QueueFull,
    /// Queue has been shut down
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub capacity: usize,
    pub max_concurrent: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: 32,
            max_concurrent: 4,
        }
    }
}

type InFlight = Arc<Mutex<HashSet<Coordinate>>>;

/// Releases a coordinate when its job finishes, even if the action panics
struct InFlightGuard {
    in_flight: InFlight,
    coordinate: Coordinate,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.coordinate);
    }
}

/// Handle to the dispatch worker
pub struct DispatchQueue {
    job_tx: Option<mpsc::Sender<DispatchJob>>,
    in_flight: InFlight,
    worker: Option<JoinHandle<()>>,
}

impl DispatchQueue {
    /// Spawn the worker task
    ///
    /// Completed dispatches are sent to `reports` when provided.
    pub fn spawn(
        executor: Arc<dyn ActionExecutor>,
        settings: QueueSettings,
        reports: Option<mpsc::UnboundedSender<DispatchReport>>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel(settings.capacity.max(1));
        let in_flight: InFlight = Arc::default();
        let semaphore = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));

        let worker = tokio::spawn(run_worker(
            job_rx,
            executor,
            in_flight.clone(),
            semaphore,
            reports,
        ));

        debug!(
            "Dispatch queue started (capacity {}, max concurrent {})",
            settings.capacity, settings.max_concurrent
        );

        Self {
            job_tx: Some(job_tx),
            in_flight,
            worker: Some(worker),
        }
    }

    /// Submit a job without blocking
    pub fn submit(&self, job: DispatchJob) -> SubmitOutcome {
        let Some(job_tx) = &self.job_tx else {
            return SubmitOutcome::Closed;
        };

        let coordinate = job.coordinate;
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains(&coordinate) {
            debug!("⏳ Action for {} still running, coalescing press", coordinate);
            return SubmitOutcome::Coalesced;
        }

        match job_tx.try_send(job) {
            Ok(()) => {
                in_flight.insert(coordinate);
                SubmitOutcome::Queued
            }
            Err(TrySendError::Full(job)) => {
                warn!(
                    "⚠️  Dispatch queue full, dropping '{}' for {}",
                    job.action_ref, coordinate
                );
                SubmitOutcome::QueueFull
            }
            Err(TrySendError::Closed(_)) => SubmitOutcome::Closed,
        }
    }

    /// Number of coordinates with a job queued or running
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Stop accepting jobs and wait for queued and running ones to finish
    pub async fn shutdown(&mut self) {
        drop(self.job_tx.take());
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("Dispatch worker ended abnormally: {}", e);
            }
            info!("Dispatch queue drained");
        }
    }
}

async fn run_worker(
    mut job_rx: mpsc::Receiver<DispatchJob>,
    executor: Arc<dyn ActionExecutor>,
    in_flight: InFlight,
    semaphore: Arc<Semaphore>,
    reports: Option<mpsc::UnboundedSender<DispatchReport>>,
) {
    let mut running = JoinSet::new();

    while let Some(job) = job_rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let guard = InFlightGuard {
            in_flight: in_flight.clone(),
            coordinate: job.coordinate,
        };
        let executor = executor.clone();
        let reports = reports.clone();

        running.spawn(async move {
            let result = executor.execute(&job.action_ref).await;
            drop(guard);
            drop(permit);

            if let Some(reports) = reports {
                let _ = reports.send(DispatchReport {
                    coordinate: job.coordinate,
                    action_ref: job.action_ref,
                    result,
                });
            }
        });

        while let Some(finished) = running.try_join_next() {
            if let Err(e) = finished {
                warn!("Dispatch task failed: {}", e);
            }
        }
    }

    while let Some(finished) = running.join_next().await {
        if let Err(e) = finished {
            warn!("Dispatch task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::RecordingExecutor;
    use std::time::Duration;

    fn coord(x: i32, y: i32) -> Coordinate {
        Coordinate::new(x, y, 8).unwrap()
    }

    fn job(x: i32, y: i32, action: &str) -> DispatchJob {
        DispatchJob {
            coordinate: coord(x, y),
            action_ref: action.to_string(),
        }
    }

    #[tokio::test]
    async fn test_jobs_are_executed_and_reported() {
        let executor = RecordingExecutor::default();
        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let mut queue = DispatchQueue::spawn(
            Arc::new(executor.clone()),
            QueueSettings::default(),
            Some(report_tx),
        );

        assert_eq!(queue.submit(job(0, 0, "one")), SubmitOutcome::Queued);
        assert_eq!(queue.submit(job(1, 0, "two")), SubmitOutcome::Queued);
        queue.shutdown().await;

        let mut reported = Vec::new();
        while let Ok(report) = report_rx.try_recv() {
            assert!(report.result.succeeded);
            reported.push(report.action_ref);
        }
        reported.sort();
        assert_eq!(reported, vec!["one", "two"]);
        assert_eq!(executor.calls().len(), 2);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_same_coordinate_is_coalesced_while_running() {
        let executor = RecordingExecutor::with_delay(Duration::from_millis(200));
        let mut queue =
            DispatchQueue::spawn(Arc::new(executor.clone()), QueueSettings::default(), None);

        assert_eq!(queue.submit(job(2, 2, "slow")), SubmitOutcome::Queued);
        assert_eq!(queue.submit(job(2, 2, "slow")), SubmitOutcome::Coalesced);
        // Other coordinates are unaffected
        assert_eq!(queue.submit(job(3, 2, "other")), SubmitOutcome::Queued);

        queue.shutdown().await;
        assert_eq!(executor.calls().iter().filter(|c| *c == "slow").count(), 1);
    }

    #[tokio::test]
    async fn test_coordinate_accepts_again_after_completion() {
        let executor = RecordingExecutor::default();
        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let mut queue = DispatchQueue::spawn(
            Arc::new(executor.clone()),
            QueueSettings::default(),
            Some(report_tx),
        );

        assert_eq!(queue.submit(job(0, 0, "again")), SubmitOutcome::Queued);
        report_rx.recv().await.unwrap();
        assert_eq!(queue.submit(job(0, 0, "again")), SubmitOutcome::Queued);

        queue.shutdown().await;
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let executor = RecordingExecutor::with_delay(Duration::from_millis(300));
        let settings = QueueSettings {
            capacity: 1,
            max_concurrent: 1,
        };
        let mut queue = DispatchQueue::spawn(Arc::new(executor.clone()), settings, None);

        // First job is picked up by the worker and holds the only permit
        assert_eq!(queue.submit(job(0, 0, "a")), SubmitOutcome::Queued);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Second job is held by the worker waiting on the permit
        assert_eq!(queue.submit(job(1, 0, "b")), SubmitOutcome::Queued);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Third fills the channel, fourth has nowhere to go
        assert_eq!(queue.submit(job(2, 0, "c")), SubmitOutcome::Queued);
        assert_eq!(queue.submit(job(3, 0, "d")), SubmitOutcome::QueueFull);

        queue.shutdown().await;
        assert!(!executor.calls().contains(&"d".to_string()));
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_closed() {
        let mut queue = DispatchQueue::spawn(
            Arc::new(RecordingExecutor::default()),
            QueueSettings::default(),
            None,
        );
        queue.shutdown().await;

        assert_eq!(queue.submit(job(0, 0, "late")), SubmitOutcome::Closed);
    }
}
