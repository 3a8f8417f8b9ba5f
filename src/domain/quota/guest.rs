//! Client-side guest counter state
//!
//! Guests get a lifetime cap rather than a recurring one. The count lives
//! on the client and is only ever reset by clearing client storage.

use serde::{Deserialize, Serialize};

/// Messages a guest has sent from this client, monotonic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCounterState {
    count: u32,
}

impl GuestCounterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(count: u32) -> Self {
        Self { count }
    }

    pub fn get(&self) -> u32 {
        self.count
    }

    /// Record one more message; keeps counting past the cap
    pub fn increment(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Messages left under `cap`, never below zero
    pub fn remaining(&self, cap: u32) -> u32 {
        cap.saturating_sub(self.count)
    }

    /// Any count at or above the cap is exhausted
    pub fn is_exhausted(&self, cap: u32) -> bool {
        self.count >= cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_increments_exhaust_default_cap() {
        let mut state = GuestCounterState::new();

        assert_eq!(state.increment(), 1);
        assert_eq!(state.remaining(2), 1);
        assert!(!state.is_exhausted(2));

        assert_eq!(state.increment(), 2);
        assert_eq!(state.remaining(2), 0);
        assert!(state.is_exhausted(2));
    }

    #[test]
    fn test_increments_past_cap_are_still_recorded() {
        let mut state = GuestCounterState::with_count(2);

        assert_eq!(state.increment(), 3);
        assert_eq!(state.get(), 3);
        assert_eq!(state.remaining(2), 0);
        assert!(state.is_exhausted(2));
    }

    #[test]
    fn test_counter_saturates() {
        let mut state = GuestCounterState::with_count(u32::MAX);
        assert_eq!(state.increment(), u32::MAX);
    }
}
