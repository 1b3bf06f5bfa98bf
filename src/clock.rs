use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// One tick per wall-clock second.
    pub fn seconds() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Countdown running on its own thread.
///
/// `on_tick` receives the remaining tick count before each tick elapses
/// (`duration`, `duration - 1`, .., `1`); `on_expire` runs once after the last
/// tick unless the clock was cancelled first.
#[derive(Debug)]
pub struct SessionClock {
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SessionClock {
    pub fn start<K, F, G>(duration: u64, ticker: K, mut on_tick: F, on_expire: G) -> io::Result<Self>
    where
        K: Ticker,
        F: FnMut(u64) + Send + 'static,
        G: FnOnce() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("session-clock".into())
            .spawn(move || {
                for elapsed in 0..duration {
                    on_tick(duration - elapsed);
                    match cancel_rx.recv_timeout(ticker.interval()) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            debug!(remaining = duration - elapsed, "clock cancelled");
                            return;
                        }
                    }
                }
                on_expire();
            })?;

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    /// Stops the countdown and waits for the clock thread to exit.
    ///
    /// Once this returns no callback is running and `on_expire` will not be
    /// called. Calling it again is a no-op.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            // the thread may already be gone after expiring
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.cancel();
    }
}
