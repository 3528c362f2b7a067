//! The clock module holds the [Clock] type, the chess clock attached to every claim.

use serde::{Deserialize, Serialize};

/// The [Clock] struct represents a clock that is used to track the duration and timestamp of a
/// given [Claim](crate::Claim) within the game.
///
/// On the wire a [Clock] is a single `u128`: the high 64 bits hold the duration and the low 64
/// bits hold the timestamp.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clock {
    /// The think-time accumulated by the side that owns the claim, in seconds.
    pub duration: u64,
    /// The timestamp at which the clock was last updated.
    pub timestamp: u64,
}

impl Clock {
    /// Creates a new [Clock].
    pub const fn new(duration: u64, timestamp: u64) -> Self {
        Self {
            duration,
            timestamp,
        }
    }

    /// Packs the [Clock] into its `u128` wire form.
    pub const fn pack(&self) -> u128 {
        ((self.duration as u128) << 64) | self.timestamp as u128
    }

    /// Unpacks a [Clock] from its `u128` wire form.
    pub const fn unpack(raw: u128) -> Self {
        Self {
            duration: (raw >> 64) as u64,
            timestamp: raw as u64,
        }
    }

    /// Returns the duration the clock will have accumulated at `now`.
    pub const fn elapsed_at(&self, now: u64) -> u64 {
        self.duration
            .saturating_add(now.saturating_sub(self.timestamp))
    }
}

impl From<Clock> for u128 {
    fn from(clock: Clock) -> Self {
        clock.pack()
    }
}

impl From<u128> for Clock {
    fn from(raw: u128) -> Self {
        Self::unpack(raw)
    }
}

#[cfg(test)]
mod test {
    use super::Clock;

    #[test]
    fn packs_duration_in_high_bits() {
        let clock = Clock::new(7, 1_700_000_000);
        let raw = clock.pack();
        assert_eq!(raw >> 64, 7);
        assert_eq!(raw as u64, 1_700_000_000);
        assert_eq!(Clock::unpack(raw), clock);
        assert_eq!(Clock::from(u128::from(clock)), clock);
    }

    #[test]
    fn elapsed_accumulates_since_timestamp() {
        let clock = Clock::new(10, 100);
        assert_eq!(clock.elapsed_at(100), 10);
        assert_eq!(clock.elapsed_at(150), 60);
        // A `now` before the timestamp never subtracts.
        assert_eq!(clock.elapsed_at(50), 10);
    }
}
