// FallGuard — Cancel Signal
//
// The one piece of state written from interrupt context. The ISR side only
// ever calls `raise`; the alarm machine is the sole reader and consumes the
// flag with a single `take` per tick, so one button edge cancels at most one
// alarm.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CancelSignal {
    raised: AtomicBool,
}

impl CancelSignal {
    pub const fn new() -> Self {
        Self { raised: AtomicBool::new(false) }
    }

    /// ISR-safe: a single atomic store, no allocation, no I/O.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Read-and-clear. Returns whether an edge arrived since the last call.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Non-consuming peek, for diagnostics only.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn take_consumes_the_edge_once() {
        let signal = CancelSignal::new();
        assert!(!signal.take());
        signal.raise();
        signal.raise();
        assert!(signal.is_raised());
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn raise_from_another_thread_is_observed() {
        let signal = Arc::new(CancelSignal::new());
        let isr = Arc::clone(&signal);
        thread::spawn(move || isr.raise())
            .join()
            .expect("raiser thread panicked");
        assert!(signal.take());
    }
}
