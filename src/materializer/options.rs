use crate::mapper::DEFAULT_MAX_DEPTH;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared flag that asks a running materialization to stop.
///
/// Clones observe the same flag, so one clone can be handed to another thread
/// to cancel work started with a different clone.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Limits applied to one `materialize` call
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    pub max_depth: usize,
    /// Measured from the start of the call
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: None,
            cancellation: None,
        }
    }
}

impl MaterializeOptions {
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
