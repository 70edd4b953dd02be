use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, LedgerResult};

/// Cooperative cancellation flag shared between the extender and its caller.
///
/// The pipeline checks the token between I/O-bound steps and abandons the
/// batch before the final atomic write, so a cancelled batch leaves no
/// partial state behind.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next checkpoint.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn bail_if_cancelled(&self) -> LedgerResult<()> {
        if self.is_cancelled() {
            Err(LedgerError::Cancelled)
        } else {
            Ok(())
        }
    }
}
