//! Cooperative cancellation for long-running conversions.
//!
//! The engines poll the token before parsing, before dispatching each block,
//! before each child iteration and around every hook invocation. Hooks
//! receive the same token so blocking work inside them can observe
//! cancellation. Timeouts are the caller's responsibility: arm a timer that
//! calls [`CancelToken::cancel`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag shared between a caller and a conversion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Trip the token. Every clone observes the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
