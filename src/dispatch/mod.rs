//! Action dispatch
//!
//! An action reference is an opaque command string (usually a shell alias).
//! Executors run it and always come back with a [`DispatchResult`]: spawn
//! failures, timeouts and non-zero exits are reported, never raised.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod queue;
pub mod shell;

pub use queue::{DispatchJob, DispatchQueue, DispatchReport, QueueSettings, SubmitOutcome};
pub use shell::ShellExecutor;

/// Default wall-clock budget for one action
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a dispatch did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to spawn '{shell}': {reason}")]
    Spawn { shell: String, reason: String },

    #[error("failed to wait for action: {0}")]
    Wait(String),

    #[error("{}", describe_exit(.0))]
    NonZeroExit(Option<i32>),
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Outcome of executing one action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResult {
    pub succeeded: bool,
    /// Exit status of the process, `None` when it never ran or was signalled
    pub exit_code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub timed_out: bool,
    /// Pid of the spawned shell (also its session and process group id)
    pub pid: Option<u32>,
    pub elapsed: Duration,
    pub error: Option<DispatchError>,
}

impl DispatchResult {
    /// Result for an action that could not run to completion
    pub fn failed(error: DispatchError, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            timed_out: matches!(error, DispatchError::Timeout(_)),
            elapsed,
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Executes action references
///
/// The only seam between the event pipeline and the host; tests swap in
/// recording executors.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action_ref: &str) -> DispatchResult;
}

/// Where dispatches run relative to the event loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Execute inside the event loop; a slow action delays later events
    Inline,
    /// Hand off to the dispatch queue worker
    #[default]
    Queued,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Executor that records every action and reports success
    #[derive(Default, Clone)]
    pub struct RecordingExecutor {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub delay: Option<Duration>,
    }

    impl RecordingExecutor {
        pub fn with_delay(delay: Duration) -> Self {
            Self {
                calls: Arc::default(),
                delay: Some(delay),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        async fn execute(&self, action_ref: &str) -> DispatchResult {
            self.calls.lock().push(action_ref.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            DispatchResult {
                succeeded: true,
                exit_code: Some(0),
                ..Default::default()
            }
        }
    }
}
