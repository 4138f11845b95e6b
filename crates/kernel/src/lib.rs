//! Runtime kernel: the global message bus and the frame-level messages.
//!
//! # Invariants
//! - Dispatch is synchronous and single-threaded; `publish` returns only after
//!   every subscriber ran.
//! - Exactly one [`UpdateMessage`] is published per loop iteration, before
//!   any rendering of that iteration.
//! - [`DestroyMessage`] is the last message of the process.

pub mod bus;

pub use bus::{Message, MessageBus, Priority, Subscription, SubscriptionId};

/// Published once per frame with the clock reading and the elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateMessage {
    /// Absolute clock reading at emission.
    pub total_ms: u64,
    /// Time since the previous frame, never negative.
    pub delta_ms: u64,
}

impl UpdateMessage {
    /// Form a timestep from the previous and current clock readings. A clock
    /// that went backwards yields a zero delta.
    pub fn new(prev_ms: u64, curr_ms: u64) -> Self {
        Self {
            total_ms: curr_ms,
            delta_ms: curr_ms.saturating_sub(prev_ms),
        }
    }
}

impl Message for UpdateMessage {}

/// Broadcast once at shutdown; every subscribed resource tears itself down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroyMessage;

impl Message for DestroyMessage {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_delta_from_readings() {
        let m = UpdateMessage::new(1_000, 1_016);
        assert_eq!(m.total_ms, 1_016);
        assert_eq!(m.delta_ms, 16);
    }

    #[test]
    fn update_delta_clamped_at_zero() {
        let m = UpdateMessage::new(2_000, 1_500);
        assert_eq!(m.delta_ms, 0);
        assert_eq!(m.total_ms, 1_500);
    }
}
