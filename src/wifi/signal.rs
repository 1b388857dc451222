//! Cross-thread outcome bits for a connect session
//!
//! The driver's dispatch thread sets bits, a caller blocked in `connect`
//! waits for any of them. Bits stay set until explicitly cleared.

use std::ops::{BitOr, BitOrAssign};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Set of outcome bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventBits(u32);

impl EventBits {
    pub const CONNECTED: EventBits = EventBits(1 << 0);
    pub const FAILED: EventBits = EventBits(1 << 1);

    pub fn contains(self, other: EventBits) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: EventBits) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventBits {
    type Output = EventBits;

    fn bitor(self, rhs: EventBits) -> EventBits {
        EventBits(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventBits {
    fn bitor_assign(&mut self, rhs: EventBits) {
        self.0 |= rhs.0;
    }
}

/// Persistent bit set with blocking waits
#[derive(Debug, Default)]
pub struct OutcomeSignal {
    bits: Mutex<EventBits>,
    changed: Condvar,
}

impl OutcomeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, bits: EventBits) {
        let mut current = self.lock();
        *current |= bits;
        self.changed.notify_all();
    }

    pub fn clear(&self, bits: EventBits) {
        let mut current = self.lock();
        current.0 &= !bits.0;
    }

    /// Non-blocking snapshot.
    pub fn get_all(&self) -> EventBits {
        *self.lock()
    }

    /// Block until any bit in `mask` is set or `timeout` elapses.
    ///
    /// `None` waits forever. Returns the bits observed when the wait ended;
    /// on timeout they do not intersect `mask`.
    pub fn wait_any(&self, mask: EventBits, timeout: Option<Duration>) -> EventBits {
        let guard = self.lock();
        match timeout {
            None => {
                let guard = self
                    .changed
                    .wait_while(guard, |bits| !bits.intersects(mask))
                    .unwrap_or_else(PoisonError::into_inner);
                *guard
            }
            Some(timeout) => {
                let (guard, _) = self
                    .changed
                    .wait_timeout_while(guard, timeout, |bits| !bits.intersects(mask))
                    .unwrap_or_else(PoisonError::into_inner);
                *guard
            }
        }
    }

    // A panicking setter cannot leave the bits half-written, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, EventBits> {
        self.bits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn bits_persist_until_cleared() {
        let signal = OutcomeSignal::new();
        assert!(signal.get_all().is_empty());

        signal.set(EventBits::CONNECTED);
        signal.set(EventBits::CONNECTED);
        assert_eq!(signal.get_all(), EventBits::CONNECTED);

        signal.clear(EventBits::CONNECTED | EventBits::FAILED);
        assert!(signal.get_all().is_empty());
    }

    #[test]
    fn wait_returns_immediately_when_already_set() {
        let signal = OutcomeSignal::new();
        signal.set(EventBits::FAILED);
        let bits = signal.wait_any(EventBits::CONNECTED | EventBits::FAILED, None);
        assert!(bits.contains(EventBits::FAILED));
    }

    #[test]
    fn wait_wakes_on_set_from_other_thread() {
        let signal = Arc::new(OutcomeSignal::new());
        let setter = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            setter.set(EventBits::CONNECTED);
        });

        let bits = signal.wait_any(EventBits::CONNECTED | EventBits::FAILED, None);
        assert!(bits.contains(EventBits::CONNECTED));
        assert!(!bits.intersects(EventBits::FAILED));
        handle.join().unwrap();
    }

    #[test]
    fn wait_times_out_without_matching_bit() {
        let signal = OutcomeSignal::new();
        signal.set(EventBits::FAILED);

        let start = Instant::now();
        let bits = signal.wait_any(EventBits::CONNECTED, Some(Duration::from_millis(50)));
        assert!(!bits.intersects(EventBits::CONNECTED));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
