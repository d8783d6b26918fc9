//! Ctrl-C handling
//!
//! While a download runs, Ctrl-C cancels it and the menu comes back. At any
//! other time it ends the program.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

use crate::core::models::{AppError, AppResult};

#[derive(Clone, Default)]
pub struct Interrupts {
    busy: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Interrupts {
    /// Handle that never fires (tests, non-tty runs)
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Start listening for Ctrl-C
    pub fn install() -> Self {
        let interrupts = Self::default();
        let listener = interrupts.clone();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if listener.busy.load(Ordering::SeqCst) {
                    debug!("Ctrl-C received, cancelling current download");
                    listener.notify.notify_waiters();
                } else {
                    println!("\nExiting...");
                    std::process::exit(130);
                }
            }
        });

        interrupts
    }

    /// Fire the cancellation as if Ctrl-C was pressed
    pub fn trigger(&self) {
        self.notify.notify_waiters();
    }

    /// Run `task`, resolving to [`AppError::Cancelled`] on Ctrl-C
    ///
    /// Dropping `task` on cancel kills any yt-dlp/ffmpeg child it owns.
    pub async fn run<F, T>(&self, task: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let cancelled = self.notify.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        self.busy.store(true, Ordering::SeqCst);
        let result = tokio::select! {
            result = task => result,
            _ = &mut cancelled => Err(AppError::Cancelled),
        };
        self.busy.store(false, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_task_result_passes_through() {
        let interrupts = Interrupts::disabled();
        let value = interrupts.run(async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_trigger_cancels_running_task() {
        let interrupts = Interrupts::disabled();
        let trigger = interrupts.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let result = interrupts
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, AppError>(())
            })
            .await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }
}
