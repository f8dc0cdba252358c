use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::sync::Notify;

/// Turns Ctrl-C into an awaitable stop signal for the interactive loop.
///
/// `wait` wakes once the interrupt arrives; `interrupted` reports whether
/// the stop came from the signal rather than operator input, so teardown
/// can log which path ended the session.
pub struct StopSignal {
    interrupted: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopSignal {
    /// Spawns the signal listener; must be called from within a runtime.
    pub fn install() -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());

        let flag = Arc::clone(&interrupted);
        let wake = Arc::clone(&notify);
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Interrupt received");
                    flag.store(true, Ordering::SeqCst);
                    wake.notify_waiters();
                }
                Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
            }
        });

        Self {
            interrupted,
            notify,
        }
    }

    pub async fn wait(&self) {
        if self.interrupted() {
            return;
        }
        self.notify.notified().await;
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
