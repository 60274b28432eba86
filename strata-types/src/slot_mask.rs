use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on slots per processor lane.
pub const MAX_SLOTS: usize = 128;

/// One bit per processor slot.
///
/// Persisted as a base-2 string, most significant bit first, "0" when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SlotMask(u128);

impl SlotMask {
    pub fn new() -> Self {
        Self(0)
    }

    /// Bits `0..num_slots` set.
    pub fn full(num_slots: usize) -> Self {
        if num_slots >= MAX_SLOTS {
            Self(u128::MAX)
        } else {
            Self((1u128 << num_slots) - 1)
        }
    }

    pub fn from_slots(slots: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = Self::new();
        for slot in slots {
            mask.set(slot, true);
        }
        mask
    }

    pub fn get(&self, slot: usize) -> bool {
        slot < MAX_SLOTS && self.0 & (1u128 << slot) != 0
    }

    pub fn set(&mut self, slot: usize, on: bool) {
        if slot >= MAX_SLOTS {
            return;
        }
        if on {
            self.0 |= 1u128 << slot;
        } else {
            self.0 &= !(1u128 << slot);
        }
    }

    pub fn with(mut self, slot: usize, on: bool) -> Self {
        self.set(slot, on);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn lowest(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.0.trailing_zeros() as usize)
    }

    pub fn highest(&self) -> Option<usize> {
        (!self.is_empty()).then(|| MAX_SLOTS - 1 - self.0.leading_zeros() as usize)
    }

    /// Set slots in ascending order.
    pub fn slots(&self) -> Vec<usize> {
        (0..MAX_SLOTS).filter(|&s| self.get(s)).collect()
    }

    pub fn union(self, other: SlotMask) -> SlotMask {
        Self(self.0 | other.0)
    }

    pub fn to_binary_string(&self) -> String {
        format!("{:b}", self.0)
    }

    pub fn parse_binary(s: &str) -> Option<SlotMask> {
        let s = s.trim();
        if s.is_empty() {
            return Some(Self::new());
        }
        u128::from_str_radix(s, 2).ok().map(Self)
    }
}

impl fmt::Display for SlotMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_binary_string())
    }
}

impl From<SlotMask> for String {
    fn from(mask: SlotMask) -> Self {
        mask.to_binary_string()
    }
}

impl TryFrom<String> for SlotMask {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        SlotMask::parse_binary(&s).ok_or_else(|| format!("invalid slot mask: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_string_form() {
        let mask = SlotMask::from_slots([0, 2, 3]);
        assert_eq!(mask.to_binary_string(), "1101");
        assert_eq!(SlotMask::parse_binary("1101"), Some(mask));
        assert_eq!(SlotMask::new().to_binary_string(), "0");
        assert_eq!(SlotMask::parse_binary(""), Some(SlotMask::new()));
        assert_eq!(SlotMask::parse_binary("12"), None);
    }

    #[test]
    fn bounds() {
        let mask = SlotMask::from_slots([1, 5]);
        assert_eq!(mask.lowest(), Some(1));
        assert_eq!(mask.highest(), Some(5));
        assert_eq!(mask.slots(), vec![1, 5]);
        assert_eq!(SlotMask::full(3).slots(), vec![0, 1, 2]);
        assert_eq!(SlotMask::full(MAX_SLOTS).count(), MAX_SLOTS);
        assert!(!SlotMask::new().with(MAX_SLOTS, true).get(MAX_SLOTS));
    }
}
