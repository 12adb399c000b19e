// Background expiry task.
//
// - One pass immediately on start, then one per interval
// - Each pass runs on the blocking pool, under the store's gate
// - Cancellation via CancellationToken for graceful shutdown

use super::store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Sweeper {
    store: Arc<SessionStore>,
    interval: Duration,
}

/// Running sweeper. Dropping the handle leaves the task running until the
/// runtime shuts down; call [`SweeperHandle::shutdown`] to stop it.
pub struct SweeperHandle {
    cancel_token: CancellationToken,
    join: JoinHandle<()>,
}

impl Sweeper {
    pub fn new(store: Arc<SessionStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Interval taken from the store's configuration.
    pub fn from_store(store: Arc<SessionStore>) -> Self {
        let interval = store.config().sweep_interval();
        Self::new(store, interval)
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn start(self) -> SweeperHandle {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let Sweeper { store, interval } = self;

        log::info!("Starting expiry sweeper (interval {:?})", interval);

        let join = tokio::spawn(async move {
            loop {
                let pass_store = Arc::clone(&store);
                match tokio::task::spawn_blocking(move || pass_store.sweep()).await {
                    Ok(Ok(report)) if !report.is_empty() => log::debug!("Sweep pass: {:?}", report),
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => log::error!("Sweep pass failed: {}", e),
                    Err(e) => log::error!("Sweep task panicked: {}", e),
                }

                tokio::select! {
                    biased;

                    _ = token.cancelled() => {
                        log::info!("Expiry sweeper cancelled");
                        break;
                    }

                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });

        SweeperHandle { cancel_token, join }
    }
}

impl SweeperHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel and wait for an in-flight pass to finish.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.join.await {
            log::error!("Expiry sweeper ended abnormally: {}", e);
        }
    }
}
