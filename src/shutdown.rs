//! A one-shot "done" signal shared by every background thread.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Closable flag with blocking waits.
///
/// Cloning yields another handle to the same signal.  Once closed it stays
/// closed.
#[derive(Debug, Clone, Default)]
pub struct DoneSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl DoneSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the signal and wake every waiter.  Closing twice is harmless.
    pub fn close(&self) {
        let (lock, cvar) = &*self.inner;
        let mut closed = lock.lock().unwrap_or_else(|e| e.into_inner());
        *closed = true;
        cvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block for at most `timeout`; returns `true` if the signal is closed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let closed = lock.lock().unwrap_or_else(|e| e.into_inner());
        let (closed, _) = cvar
            .wait_timeout_while(closed, timeout, |closed| !*closed)
            .unwrap_or_else(|e| e.into_inner());
        *closed
    }

    /// Block until the signal is closed.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let closed = lock.lock().unwrap_or_else(|e| e.into_inner());
        let _closed = cvar
            .wait_while(closed, |closed| !*closed)
            .unwrap_or_else(|e| e.into_inner());
    }
}
