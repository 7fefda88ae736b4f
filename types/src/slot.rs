//! The `(epoch, round)` coordinate every protocol message carries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An `(epoch, round)` pair, ordered by epoch first.
///
/// Slots are the unit of the acceptance window (messages strictly older than
/// the frontier slot are rejected) and the watermark key for pool pruning
/// (pruning below a slot removes strictly older entries only).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Slot {
    pub epoch_num: u64,
    pub round_num: u64,
}

impl Slot {
    pub fn new(epoch_num: u64, round_num: u64) -> Self {
        Self {
            epoch_num,
            round_num,
        }
    }

    /// The next round in the same epoch.
    pub fn next_round(&self) -> Self {
        Self {
            epoch_num: self.epoch_num,
            round_num: self.round_num + 1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.epoch_num, self.round_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_by_epoch_first() {
        assert!(Slot::new(0, 9) < Slot::new(1, 0));
        assert!(Slot::new(1, 0) < Slot::new(1, 1));
        assert_eq!(Slot::new(2, 3), Slot::new(2, 3));
    }

    #[test]
    fn next_round_stays_in_epoch() {
        assert_eq!(Slot::new(1, 4).next_round(), Slot::new(1, 5));
    }

    #[test]
    fn display_format() {
        assert_eq!(Slot::new(2, 7).to_string(), "2/7");
    }
}
