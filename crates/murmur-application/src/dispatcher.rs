//! Timed release of scheduled turns.

use murmur_core::schedule::{DeliveryPlan, DeliveryQueue};
use murmur_core::turn::Turn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Releases each turn of a plan into a channel once its delay has elapsed.
///
/// Every dispatched plan gets its own timer task, so a slow consumer of one
/// plan never holds back the clock of another.
#[derive(Debug, Clone)]
pub struct DeliveryDispatcher {
    sender: mpsc::Sender<Turn>,
    shutdown: CancellationToken,
}

impl DeliveryDispatcher {
    pub fn new(sender: mpsc::Sender<Turn>) -> Self {
        Self {
            sender,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stops every pending delivery when `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Starts delivering `plan`, counting delays from now.
    ///
    /// The task resolves to the number of turns delivered; it stops early when
    /// the receiver is gone or shutdown is requested.
    pub fn dispatch(&self, plan: DeliveryPlan) -> JoinHandle<usize> {
        let sender = self.sender.clone();
        let shutdown = self.shutdown.clone();
        let mut queue = DeliveryQueue::new();
        queue.push_plan(plan, Instant::now());

        tokio::spawn(async move {
            let mut delivered = 0;

            while let Some(release) = queue.next_release() {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("[Dispatcher] Shutdown, dropping {} turns", queue.len());
                        break;
                    }
                    _ = tokio::time::sleep_until(release) => {}
                }

                for turn in queue.pop_due(Instant::now()) {
                    if sender.send(turn).await.is_err() {
                        tracing::debug!("[Dispatcher] Receiver closed");
                        return delivered;
                    }
                    delivered += 1;
                }
            }

            delivered
        })
    }
}
