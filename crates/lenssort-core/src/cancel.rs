use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::OrganizeError;

/// Token for cooperative cancellation. The pipeline checks it between files,
/// never mid-move, so a trip leaves every completed move committed.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns Ok(()) to continue, Err if cancellation was requested.
    pub fn check(&self) -> Result<(), OrganizeError> {
        if self.is_cancelled() {
            return Err(OrganizeError::Cancelled);
        }
        Ok(())
    }
}
