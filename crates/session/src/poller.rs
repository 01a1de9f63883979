//! Recurring status poller task.
//!
//! One spawned task per subscription; each tick issues exactly one
//! status request and awaits it before the next tick can fire, so
//! requests are never outstanding concurrently for the same
//! subscription.  Polling stops on the first terminal status, on a
//! transport error (fatal to the session, no backoff or retry), or when
//! the owning controller cancels the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::ForecastBackend;
use crate::events::SessionEvent;
use crate::state::SessionStore;

/// How long `stop` waits for the poller task to exit cleanly.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// What one subscription polls.
#[derive(Debug, Clone)]
pub(crate) enum PollTarget {
    Job { task_id: String },
    Batch { batch_id: String },
}

/// Owning handle for a poller task.
pub(crate) struct PollerHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    /// Cancel the task and wait briefly for a clean exit.
    pub(crate) async fn stop(self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(STOP_TIMEOUT, self.task).await;
    }
}

/// Spawn the polling loop for one subscription.
pub(crate) fn spawn_poller(
    backend: Arc<dyn ForecastBackend>,
    store: Arc<SessionStore>,
    events: broadcast::Sender<SessionEvent>,
    target: PollTarget,
    interval: Duration,
) -> PollerHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        run_poll_loop(backend, store, events, target, interval, task_cancel).await;
    });

    PollerHandle { cancel, task }
}

/// The poll loop: tick, fetch, apply, decide.
///
/// `MissedTickBehavior::Delay` keeps the configured spacing even when a
/// response is slow, so ticks never pile up behind an in-flight request.
async fn run_poll_loop(
    backend: Arc<dyn ForecastBackend>,
    store: Arc<SessionStore>,
    events: broadcast::Sender<SessionEvent>,
    target: PollTarget,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(
        interval_ms = interval.as_millis() as u64,
        subscription = ?target,
        "Status poller started",
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(subscription = ?target, "Status poller cancelled");
                return;
            }
            _ = ticker.tick() => {
                if poll_once(&backend, &store, &events, &target).await.is_break() {
                    return;
                }
            }
        }
    }
}

/// One poll tick.  Returns `Break` when polling must stop.
async fn poll_once(
    backend: &Arc<dyn ForecastBackend>,
    store: &Arc<SessionStore>,
    events: &broadcast::Sender<SessionEvent>,
    target: &PollTarget,
) -> std::ops::ControlFlow<()> {
    use std::ops::ControlFlow;

    match target {
        PollTarget::Job { task_id } => match backend.job_status(task_id).await {
            Ok(record) => {
                let Some(effective) = store.apply_job_update(record).await else {
                    // The session was reset or replaced; nothing left to track.
                    return ControlFlow::Break(());
                };
                let terminal = effective.status.is_terminal();
                let status = effective.status;
                let _ = events.send(SessionEvent::JobUpdated(effective));
                if terminal {
                    tracing::info!(
                        task_id = %task_id,
                        status = status.as_str(),
                        "Job reached terminal status; polling stopped",
                    );
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Status poll failed");
                let _ = events.send(SessionEvent::PollFailed {
                    message: e.to_string(),
                });
                ControlFlow::Break(())
            }
        },

        PollTarget::Batch { batch_id } => match backend.batch_status(batch_id).await {
            Ok(record) => {
                let Some(effective) = store.apply_batch_update(record).await else {
                    return ControlFlow::Break(());
                };
                let terminal = effective.status.is_terminal();
                let status = effective.status;
                let _ = events.send(SessionEvent::BatchUpdated(effective));
                if terminal {
                    tracing::info!(
                        batch_id = %batch_id,
                        status = status.as_str(),
                        "Batch reached terminal status; polling stopped",
                    );
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
            Err(e) => {
                tracing::error!(batch_id = %batch_id, error = %e, "Batch status poll failed");
                let _ = events.send(SessionEvent::PollFailed {
                    message: e.to_string(),
                });
                ControlFlow::Break(())
            }
        },
    }
}
