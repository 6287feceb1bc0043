use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets an outer layer take over completion of a request. Consulted at the
/// start of every pipeline step; the answer may change between steps.
pub trait OverrideGate: Send + Sync {
    fn is_overridden(&self) -> bool;
}

impl<F> OverrideGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_overridden(&self) -> bool {
        self()
    }
}

/// Shared on/off override. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct OverrideFlag {
    inner: Arc<AtomicBool>,
}

impl OverrideFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.inner.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

impl OverrideGate for OverrideFlag {
    fn is_overridden(&self) -> bool {
        self.is_set()
    }
}
