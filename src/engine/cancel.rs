//! Cancellation signal shared between the caller, the Ctrl+C handler and the worker pool.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct Inner {
    fired: AtomicBool,
    // Dropping the sender disconnects `signal`, which wakes every select! waiting on it.
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

/// Cloneable, idempotent cancellation flag.
/// It can also be waited on with `crossbeam_channel::select!`.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                trigger: Mutex::new(Some(tx)),
                signal: rx,
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.fired.store(true, Ordering::Release);
        if let Ok(mut trigger) = self.inner.trigger.lock() {
            trigger.take();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once [`cancel`](Self::cancel) is called.
    /// Never yields a value.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Fire this token on Ctrl+C. Process-wide; call at most once (CLI only).
    pub fn install_ctrlc_handler(&self) -> anyhow::Result<()> {
        use anyhow::Context;
        let token = self.clone();
        ctrlc::set_handler(move || {
            log::warn!("Interrupt received; cancelling");
            token.cancel();
        })
        .context("set Ctrl+C handler")
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
