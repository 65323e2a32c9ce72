use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use graft_core::error::{Error, Result};
use graft_core::intrinsics::MethodSignature;

/// Cooperative cancellation flag for one compilation job.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check(&self, method: &MethodSignature) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled {
                method: method.to_string(),
            });
        }
        Ok(())
    }
}
