//! # Sliding Dedup Window
//!
//! Bit history of recently delivered sequences, relative to the latest one.
//!
//! ```text
//! distance:  0      1      2      3    ...   CAPACITY-1
//!          latest latest-1 ...                 oldest
//! ```
//!
//! Advancing the latest sequence by `n` moves every bit `n` places towards
//! the old end. Bits that fall off are forgotten; anything at a distance of
//! `CAPACITY` or more is unknowable and callers treat it as too old.

/// Number of 64-bit words backing [`DeliveredFragments`].
pub const DELIVERED_WINDOW_WORDS: usize = 4;

/// Dedup window used by the fragment queue (256 sequences).
pub type DeliveredFragments = DedupWindow<DELIVERED_WINDOW_WORDS>;

/// A `64 * WORDS`-bit sliding window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DedupWindow<const WORDS: usize> {
    /// Bit `d` lives at `words[d / 64] >> (d % 64)`.
    words: [u64; WORDS],
}

impl<const WORDS: usize> DedupWindow<WORDS> {
    /// Number of sequences the window can describe.
    pub const CAPACITY: usize = WORDS * 64;

    /// Creates an empty window.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Number of sequences the window can describe.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        Self::CAPACITY
    }

    /// Shifts the history so the new latest sequence is `count` ahead of the
    /// old one. The skipped sequences start out as not delivered.
    pub fn push_back_bits(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        if count >= Self::CAPACITY {
            self.reset();
            return;
        }
        let word_shift = count / 64;
        let bit_shift = count % 64;
        // High words first so every source word is read before it is
        // overwritten.
        for index in (0..WORDS).rev() {
            let mut value = 0;
            if index >= word_shift {
                let source = index - word_shift;
                value = self.words[source] << bit_shift;
                if bit_shift > 0 && source > 0 {
                    value |= self.words[source - 1] >> (64 - bit_shift);
                }
            }
            self.words[index] = value;
        }
    }

    /// Returns whether the sequence `distance` behind the latest was
    /// delivered. Out-of-range distances read as not delivered.
    #[inline]
    #[must_use]
    pub fn get_bit(&self, distance: usize) -> bool {
        if distance >= Self::CAPACITY {
            return false;
        }
        self.words[distance / 64] & (1 << (distance % 64)) != 0
    }

    /// Marks the sequence `distance` behind the latest. Out-of-range distances
    /// are ignored.
    #[inline]
    pub fn set_bit(&mut self, distance: usize, delivered: bool) {
        if distance >= Self::CAPACITY {
            return;
        }
        let mask = 1 << (distance % 64);
        if delivered {
            self.words[distance / 64] |= mask;
        } else {
            self.words[distance / 64] &= !mask;
        }
    }

    /// Number of sequences currently marked delivered.
    #[must_use]
    pub fn count_delivered(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Forgets all history.
    pub fn reset(&mut self) {
        self.words = [0; WORDS];
    }
}

impl<const WORDS: usize> Default for DedupWindow<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut window = DeliveredFragments::new();
        assert_eq!(window.capacity(), 256);
        assert!(!window.get_bit(0));

        window.set_bit(0, true);
        window.set_bit(70, true);
        assert!(window.get_bit(0));
        assert!(window.get_bit(70));
        assert!(!window.get_bit(69));
        assert_eq!(window.count_delivered(), 2);

        window.set_bit(70, false);
        assert!(!window.get_bit(70));
    }

    #[test]
    fn test_out_of_range_is_guarded() {
        let mut window = DedupWindow::<1>::new();
        window.set_bit(64, true);
        assert!(!window.get_bit(64));
        assert!(!window.get_bit(usize::MAX));
        assert_eq!(window.count_delivered(), 0);
    }

    #[test]
    fn test_push_back_within_word() {
        let mut window = DeliveredFragments::new();
        window.set_bit(0, true);
        window.set_bit(3, true);

        window.push_back_bits(5);
        assert!(!window.get_bit(0));
        assert!(window.get_bit(5));
        assert!(window.get_bit(8));
        assert_eq!(window.count_delivered(), 2);
    }

    #[test]
    fn test_push_back_across_words() {
        let mut window = DeliveredFragments::new();
        window.set_bit(0, true);
        window.set_bit(60, true);
        window.set_bit(130, true);

        window.push_back_bits(70);
        assert!(window.get_bit(70));
        assert!(window.get_bit(130));
        assert!(window.get_bit(200));
        assert_eq!(window.count_delivered(), 3);
    }

    #[test]
    fn test_push_back_drops_oldest() {
        let mut window = DeliveredFragments::new();
        window.set_bit(250, true);
        window.set_bit(10, true);

        window.push_back_bits(6);
        assert!(window.get_bit(16));
        assert_eq!(window.count_delivered(), 1);
    }

    #[test]
    fn test_push_back_whole_words() {
        let mut window = DeliveredFragments::new();
        window.set_bit(1, true);
        window.set_bit(65, true);

        window.push_back_bits(128);
        assert!(window.get_bit(129));
        assert!(window.get_bit(193));
        assert_eq!(window.count_delivered(), 2);
    }

    #[test]
    fn test_push_back_past_capacity_clears() {
        let mut window = DeliveredFragments::new();
        window.set_bit(0, true);
        window.push_back_bits(256);
        assert_eq!(window.count_delivered(), 0);
    }

    #[test]
    fn test_push_back_matches_bit_by_bit_model() {
        let mut window = DedupWindow::<2>::new();
        let mut model = [false; 128];
        let marks = [0usize, 1, 7, 63, 64, 65, 100, 127];
        for &d in &marks {
            window.set_bit(d, true);
            model[d] = true;
        }
        for shift in [1usize, 3, 31, 64, 9] {
            window.push_back_bits(shift);
            for d in (0..128).rev() {
                model[d] = d >= shift && model[d - shift];
            }
            for (d, &expected) in model.iter().enumerate() {
                assert_eq!(window.get_bit(d), expected, "distance {d} after shift {shift}");
            }
        }
    }

    #[test]
    fn test_reset() {
        let mut window = DeliveredFragments::new();
        window.set_bit(12, true);
        window.reset();
        assert_eq!(window, DeliveredFragments::default());
    }
}
