//! One-way readiness flags passed between loops.
//!
//! The puller raises *synced* once it has cached everything up to the head;
//! the processor raises *caught up* once it has processed everything cached.
//! A flag is never lowered again.

use tokio::sync::watch;

/// The raising side of a readiness flag.
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

/// The observing side of a readiness flag.
#[derive(Clone)]
pub struct ReadyWaiter {
    rx: watch::Receiver<bool>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn waiter(&self) -> ReadyWaiter {
        ReadyWaiter {
            rx: self.tx.subscribe(),
        }
    }

    /// Raise the flag. Returns `true` the first time.
    pub fn set(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyWaiter {
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the flag is raised. Returns `false` if the signal was
    /// dropped without ever being raised.
    pub async fn wait(&mut self) -> bool {
        self.rx.wait_for(|ready| *ready).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiter_observes_raise() {
        let signal = ReadySignal::new();
        let mut waiter = signal.waiter();
        assert!(!waiter.is_ready());
        assert!(signal.set());
        assert!(!signal.set(), "second raise is a no-op");
        assert!(waiter.wait().await);
        assert!(waiter.is_ready());
    }

    #[tokio::test]
    async fn dropped_signal_releases_waiter() {
        let signal = ReadySignal::new();
        let mut waiter = signal.waiter();
        drop(signal);
        assert!(!waiter.wait().await);
    }
}
