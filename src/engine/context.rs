//! Per-operation context.
//!
//! Each workflow runs under an `OpContext`: a cancellation token checked
//! at every step boundary and the progress sink the steps report to. A
//! tripped token aborts before the next side effect — never after a
//! partial persist.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::progress::{NullProgress, ProgressSink};

#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub struct OpContext {
    token: CancellationToken,
    progress: Arc<dyn ProgressSink>,
}

impl OpContext {
    pub fn new(token: CancellationToken, progress: Arc<dyn ProgressSink>) -> Self {
        Self { token, progress }
    }

    /// A context that cannot be canceled and reports to nobody.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            progress: Arc::new(NullProgress),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fail with `Error::Cancelled` if the token has tripped.
    pub fn checkpoint(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    pub fn notify(&self, step: &str) {
        self.progress.notify(step);
    }
}
