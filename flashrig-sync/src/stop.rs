use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot cooperative termination broadcast. Worker loops poll `is_set`
/// each iteration; nothing is ever interrupted mid-call, so observation may
/// lag by up to one pull timeout.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
