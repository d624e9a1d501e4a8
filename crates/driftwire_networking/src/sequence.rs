//! # Sequence Arithmetic
//!
//! Wraparound-aware ordering for fixed-width sequence counters.
//!
//! `a` is more recent than `b` when `a - b` (wrapping) is non-zero and below
//! half the counter's range. Raw numeric comparison is wrong the moment the
//! counter wraps, so nothing in the transport ever compares sequences with
//! `<` or `>`.

/// Sequence number type used for fragment groups.
pub type SequenceNumber = u16;

/// A fixed-width unsigned counter that wraps around.
pub trait WrappingSequence: Copy + Eq {
    /// Half the counter's range.
    const HALF_RANGE: Self;

    /// Wrapping distance `self - other`.
    #[must_use]
    fn delta(self, other: Self) -> Self;

    /// Returns true if `self` is ahead of `other` modulo wraparound.
    #[must_use]
    fn is_more_recent(self, other: Self) -> bool;

    /// Wrapping increment.
    #[must_use]
    fn next(self) -> Self;

    /// Widens the value for use as a window index.
    #[must_use]
    fn to_distance(self) -> u64;
}

macro_rules! impl_wrapping_sequence {
    ($($ty:ty),*) => {
        $(
            impl WrappingSequence for $ty {
                const HALF_RANGE: Self = 1 << (<$ty>::BITS - 1);

                #[inline]
                fn delta(self, other: Self) -> Self {
                    self.wrapping_sub(other)
                }

                #[inline]
                fn is_more_recent(self, other: Self) -> bool {
                    let diff = self.wrapping_sub(other);
                    diff != 0 && diff < Self::HALF_RANGE
                }

                #[inline]
                fn next(self) -> Self {
                    self.wrapping_add(1)
                }

                #[inline]
                fn to_distance(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_wrapping_sequence!(u8, u16, u32, u64);

/// Returns true if `a` is ahead of `b` modulo wraparound.
#[inline]
#[must_use]
pub fn sequence_more_recent<S: WrappingSequence>(a: S, b: S) -> bool {
    a.is_more_recent(b)
}

/// Wrapping distance `a - b` as an unsigned window index.
#[inline]
#[must_use]
pub fn sequence_delta<S: WrappingSequence>(a: S, b: S) -> u64 {
    a.delta(b).to_distance()
}

/// Hands out outbound sequence numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceGenerator<S = SequenceNumber> {
    next: S,
}

impl<S: WrappingSequence + Default> SequenceGenerator<S> {
    /// Creates a generator starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self { next: S::default() }
    }

    /// Returns the next sequence and advances, wrapping at the counter width.
    pub fn generate_next_sequence(&mut self) -> S {
        let sequence = self.next;
        self.next = self.next.next();
        sequence
    }

    /// Returns the sequence the next call will produce.
    #[must_use]
    pub fn peek(&self) -> S {
        self.next
    }

    /// Restarts from zero.
    pub fn reset(&mut self) {
        self.next = S::default();
    }
}
