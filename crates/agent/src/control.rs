//! Run control plane: cancellation with a reason, and the pause gate.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// One-shot cancellation carrying an optional reason.
///
/// Cloning shares the signal. The first reason given wins; later calls
/// are no-ops.
#[derive(Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, reason: Option<String>) {
        {
            let mut slot = self.reason.lock().unwrap_or_else(|p| p.into_inner());
            if self.token.is_cancelled() {
                return;
            }
            *slot = reason;
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// A re-armable gate checked at iteration boundaries.
///
/// Closed blocks [`wait_open`](Self::wait_open); opening releases every
/// waiter at once.
pub struct PauseGate {
    open: watch::Sender<bool>,
}

impl PauseGate {
    pub fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self { open }
    }

    pub fn close(&self) {
        self.open.send_replace(false);
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    pub async fn wait_open(&self) {
        let mut rx = self.open.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_reason_wins() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel(Some("user".into()));
        signal.cancel(Some("again".into()));
        assert!(signal.is_cancelled());
        assert_eq!(signal.reason().as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn clones_share_the_signal() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            waiter.reason()
        });
        signal.cancel(None);
        assert_eq!(handle.await.unwrap(), None);
    }

    #[tokio::test]
    async fn open_gate_does_not_block() {
        let gate = PauseGate::new();
        assert!(gate.is_open());
        tokio::time::timeout(Duration::from_millis(50), gate.wait_open())
            .await
            .expect("open gate should not block");
    }

    #[tokio::test]
    async fn opening_releases_all_waiters() {
        let gate = Arc::new(PauseGate::new());
        gate.close();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.wait_open().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));

        gate.open();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter released")
                .unwrap();
        }
    }
}
