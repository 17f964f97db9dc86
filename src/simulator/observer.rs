use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Hook injected by the caller to follow and steer integrations.
///
/// All methods have no-op defaults, so an implementation only overrides what it needs.
pub trait SolveObserver: Send + Sync {
    /// Called once for every completed integration with the number of recorded samples
    fn on_run(&self, _model_id: &str, _samples: usize) {}

    /// Polled between integration steps; returning `true` aborts the run
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SolveObserver for NoopObserver {}

/// Counts completed integrations.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct RunCounter {
    counter: Arc<AtomicUsize>,
}

impl RunCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

impl SolveObserver for RunCounter {
    fn on_run(&self, model_id: &str, samples: usize) {
        let current = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("run {} ({}): {} samples", current, model_id, samples);
    }
}

/// Cooperative cancellation flag.
///
/// Clone it, hand one copy to the simulator and call [CancelFlag::cancel] from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

impl SolveObserver for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_shared_between_clones() {
        let counter = RunCounter::new();
        let handle = counter.clone();
        handle.on_run("1-compartment-iv", 10);
        handle.on_run("1-compartment-iv", 10);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn cancel_flag_round_trip() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.clone().cancel();
        assert!(flag.is_cancelled());
        flag.reset();
        assert!(!flag.is_cancelled());
    }
}
