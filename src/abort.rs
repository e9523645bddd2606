use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::sync::Notify;

use crate::error::{Error, Result};

/// Shared stop signal for a run: flipped by the interrupt handler, or implied once
/// the optional deadline has passed.
#[derive(Debug, Clone)]
pub struct Abort {
    running: Arc<AtomicBool>,
    notify: Arc<Notify>,
    deadline: Option<Instant>,
}

impl Abort {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn check(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::Cancelled("interrupted"));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::Cancelled("deadline exceeded"));
            }
        }
        Ok(())
    }

    /// Runs `fut` unless the run is stopped or the deadline passes first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        let stopped = self.notify.notified();
        tokio::pin!(stopped);
        // register before checking the flag so a concurrent stop() is not missed
        stopped.as_mut().enable();
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            out = fut => Ok(out),
            _ = &mut stopped => Err(Error::Cancelled("interrupted")),
            _ = deadline => Err(Error::Cancelled("deadline exceeded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_when_running() {
        let abort = Abort::new(None);
        assert_eq!(abort.guard(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn stopped_before_start() {
        let abort = Abort::new(None);
        abort.stop();
        assert!(abort.check().is_err());
        assert!(abort.guard(async { 7 }).await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn stop_wakes_pending_guard() {
        let abort = Abort::new(None);
        let stopper = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.stop();
        });
        let res = abort.guard(std::future::pending::<()>()).await;
        assert!(matches!(res, Err(Error::Cancelled("interrupted"))));
    }

    #[tokio::test]
    async fn deadline_cuts_long_work() {
        let abort = Abort::new(Some(Duration::from_millis(20)));
        let res = abort
            .guard(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert!(matches!(res, Err(Error::Cancelled("deadline exceeded"))));
    }
}
