//! Background task ownership.
//!
//! [`Supervisor`] owns periodic jobs and stops them through a shared
//! [`CancellationToken`]. [`spawn_detached`] runs one-off side effects with a
//! bounded timeout; their failures are logged and never reach the caller.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A unit of work the [`Supervisor`] runs on a fixed interval.
pub trait PeriodicJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn run(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

pub struct Supervisor {
    token: CancellationToken,
    tasks: JoinSet<()>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Token cancelled by [`Supervisor::shutdown`]. Hand it to anything that
    /// should stop together with the background jobs.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn job_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run `job` immediately and then every `every` until shutdown.
    /// A failed run is logged and the schedule continues.
    pub fn spawn_periodic<J: PeriodicJob>(&mut self, job: J, every: Duration) {
        let token = self.token.clone();
        info!(job = job.name(), interval_secs = every.as_secs(), "starting periodic job");
        self.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = job.run() => {
                        if let Err(e) = result {
                            warn!(job = job.name(), error = %e, "periodic job failed");
                        }
                    }
                }
            }
            debug!(job = job.name(), "periodic job stopped");
        });
    }

    /// Cancel every job and wait up to `grace` for them to return.
    /// Jobs still running after the grace period are aborted.
    pub async fn shutdown(mut self, grace: Duration) {
        self.token.cancel();
        let drained = tokio::time::timeout(grace, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = self.tasks.len(),
                "background jobs did not stop in time, aborting"
            );
            self.tasks.abort_all();
        }
        info!("supervisor stopped");
    }
}

/// Spawn a fire-and-forget side effect bounded by `timeout`.
///
/// Errors and timeouts are logged under `label`; the returned handle only
/// resolves once the task has finished or been abandoned.
pub fn spawn_detached<F, T, E>(label: &'static str, timeout: Duration, fut: F) -> JoinHandle<()>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(_)) => debug!(task = label, "detached task finished"),
            Ok(Err(e)) => warn!(task = label, error = %e, "detached task failed"),
            Err(_) => warn!(
                task = label,
                timeout_secs = timeout.as_secs(),
                "detached task timed out"
            ),
        }
    })
}
