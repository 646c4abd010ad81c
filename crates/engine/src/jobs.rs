//! Export-job polling
//!
//! The original batch flow waits on a job with an unconditional
//! 30-second sleep loop. This module keeps the cadence but makes the
//! wait cooperative: the interval is configurable, an optional deadline
//! bounds the wait, and a cancel token lets a caller stop it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::client::EngineClient;
use crate::error::{EngineError, Result};
use crate::models::JobStatus;

/// Polling behavior for [`wait_for_completion`]
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between status checks (default 30 s)
    pub interval: Duration,
    /// Give up after this much wall time; `None` waits indefinitely,
    /// matching the original behavior explicitly rather than by default
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: None,
        }
    }
}

/// Clonable flag for cancelling a poll wait
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Source of job status reports.
///
/// [`EngineClient`] is the production implementation; tests drive the
/// poll loop with scripted monitors.
pub trait JobMonitor {
    fn job_status(
        &self,
        job_id: &str,
    ) -> impl std::future::Future<Output = Result<JobStatus>> + Send;
}

impl JobMonitor for EngineClient {
    async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        EngineClient::job_status(self, job_id).await
    }
}

/// Poll a job until it leaves the active state.
///
/// Returns the terminal status, including a `Failed` one — the caller
/// decides what to do with the reported error message; nothing is
/// retried. Errors: `Timeout` when the deadline passes while the job is
/// still active, `Cancelled` when the token is tripped.
pub async fn wait_for_completion<M: JobMonitor>(
    monitor: &M,
    job_id: &str,
    options: &PollOptions,
    cancel: &CancelToken,
) -> Result<JobStatus> {
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            warn!(job = job_id, "wait cancelled");
            return Err(EngineError::Cancelled);
        }

        let status = monitor.job_status(job_id).await?;
        if !status.state.is_active() {
            debug!(job = job_id, state = ?status.state, "job finished");
            return Ok(status);
        }

        let waited = started.elapsed();
        if let Some(timeout) = options.timeout {
            if waited >= timeout {
                return Err(EngineError::Timeout { waited });
            }
        }

        debug!(job = job_id, waited_s = waited.as_secs(), "export in progress");
        tokio::time::sleep(options.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Monitor that replays a fixed sequence of states, then repeats the last
    struct ScriptedMonitor {
        states: Mutex<Vec<JobState>>,
        polls: AtomicUsize,
    }

    impl ScriptedMonitor {
        fn new(states: Vec<JobState>) -> Self {
            Self {
                states: Mutex::new(states),
                polls: AtomicUsize::new(0),
            }
        }
    }

    impl JobMonitor for ScriptedMonitor {
        async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut states = self.states.lock().unwrap();
            let state = if states.len() > 1 {
                states.remove(0)
            } else {
                states[0]
            };
            Ok(JobStatus {
                id: job_id.to_string(),
                state,
                error_message: match state {
                    JobState::Failed => Some("tile quota exceeded".to_string()),
                    _ => None,
                },
            })
        }
    }

    fn fast_poll(timeout_ms: Option<u64>) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(1),
            timeout: timeout_ms.map(Duration::from_millis),
        }
    }

    #[tokio::test]
    async fn test_returns_on_terminal_state() {
        let monitor = ScriptedMonitor::new(vec![
            JobState::Pending,
            JobState::Running,
            JobState::Completed,
        ]);

        let status = wait_for_completion(
            &monitor,
            "job-1",
            &fast_poll(None),
            &CancelToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(status.state, JobState::Completed);
    }

    #[tokio::test]
    async fn test_failed_job_is_returned_not_retried() {
        let monitor = ScriptedMonitor::new(vec![JobState::Running, JobState::Failed]);

        let status = wait_for_completion(
            &monitor,
            "job-2",
            &fast_poll(None),
            &CancelToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error_message.as_deref(), Some("tile quota exceeded"));
    }

    #[tokio::test]
    async fn test_timeout_on_stuck_job() {
        let monitor = ScriptedMonitor::new(vec![JobState::Running]);

        let err = wait_for_completion(
            &monitor,
            "job-3",
            &fast_poll(Some(10)),
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_cancel_token_stops_wait() {
        let monitor = ScriptedMonitor::new(vec![JobState::Running]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = wait_for_completion(&monitor, "job-4", &fast_poll(None), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        // Cancelled before the first status request
        assert_eq!(monitor.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_polls_once_per_interval() {
        let monitor = ScriptedMonitor::new(vec![
            JobState::Pending,
            JobState::Running,
            JobState::Completed,
        ]);
        let options = PollOptions {
            interval: Duration::from_millis(25),
            timeout: None,
        };

        let started = Instant::now();
        wait_for_completion(&monitor, "job-5", &options, &CancelToken::new())
            .await
            .unwrap();

        // Three status checks with a sleep between each: two full intervals
        // must have elapsed, and the job is checked exactly once per wakeup.
        assert_eq!(monitor.polls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
