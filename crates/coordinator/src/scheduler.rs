//! Pass scheduling
//!
//! Two cadences drive the coordinator: a slow interval that runs the
//! sweep pass unconditionally, and a fast path taken when an event
//! flags itself urgent (share start/stop, page change, resize). Fast
//! requests are debounced by sleeping one fast interval before the
//! pass, so a burst of urgent events collapses into a single pass.

use crate::coordinator::Coordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a running scheduler loop
///
/// Dropping the handle without calling [`UpdateScheduler::shutdown`]
/// aborts the loop without draining in-flight transport commands.
pub struct UpdateScheduler {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl UpdateScheduler {
    /// Spawn the scheduling loop for a coordinator
    pub fn spawn(coordinator: Arc<Coordinator>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let (mut fast_ms, mut slow_ms) = coordinator.intervals().await;
            let mut slow_tick = tokio::time::interval(Duration::from_millis(slow_ms));
            // The first tick fires immediately; keep it, the opening
            // sweep establishes the initial render state.
            slow_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(fast_ms, slow_ms, "update scheduler running");

            loop {
                tokio::select! {
                    _ = slow_tick.tick() => {
                        coordinator.sweep_pass().await;
                    }
                    _ = coordinator.fast_requested() => {
                        // Debounce: absorb the burst, then pass once.
                        tokio::time::sleep(Duration::from_millis(fast_ms)).await;
                        coordinator.pass().await;
                        slow_tick.reset();
                    }
                    _ = &mut shutdown_rx => {
                        debug!("update scheduler shutting down");
                        coordinator.wait_transport_idle().await;
                        return;
                    }
                }

                // Cadence updates take effect before the next wait.
                let (new_fast, new_slow) = coordinator.intervals().await;
                fast_ms = new_fast;
                if new_slow != slow_ms {
                    slow_ms = new_slow;
                    slow_tick = tokio::time::interval(Duration::from_millis(slow_ms));
                    slow_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                    // Swallow the rebuilt interval's immediate first tick;
                    // a sweep just ran or is one notify away.
                    slow_tick.tick().await;
                }
            }
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    /// Stop the loop and wait for in-flight transport commands to drain
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.task.abort();
        }
    }
}
