use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A one-way stop switch shared by the controller and every worker.
///
/// Cloning hands out another reference to the same flag. Setting it is a single
/// atomic store, so it may be called repeatedly and from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
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
