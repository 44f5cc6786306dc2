use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Availability notifications from the runtime's dispatch thread.
///
/// The runtime thread calls [`notify`](Self::notify); the render thread
/// consumes the latched "became unavailable" edge before its next present.
#[derive(Debug, Clone, Default)]
pub struct AvailabilitySignal {
    became_unavailable: Arc<AtomicBool>,
}

impl AvailabilitySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, available: bool) {
        if !available {
            self.became_unavailable.store(true, Ordering::Release);
        }
    }

    /// Returns and clears the latched edge.
    pub(crate) fn take_unavailable(&self) -> bool {
        self.became_unavailable.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latches_until_taken() {
        let signal = AvailabilitySignal::new();
        let runtime = signal.clone();

        runtime.notify(true);
        assert!(!signal.take_unavailable());

        runtime.notify(false);
        runtime.notify(true);
        assert!(signal.take_unavailable());
        assert!(!signal.take_unavailable());
    }
}
