use std::sync::atomic::{AtomicBool, Ordering};

/// Run-scoped flag that stops analysis calls once the provider reports its
/// quota exhausted. A run creates one and drops it at the end; it is never
/// cleared in between.
#[derive(Debug, Default)]
pub struct QuotaBreaker {
    tripped: AtomicBool,
}

impl QuotaBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Returns true only for the call that performed the transition.
    pub fn trip(&self) -> bool {
        self.tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
