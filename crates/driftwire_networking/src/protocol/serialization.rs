//! # Packet Serialization
//!
//! Bounded-width serialization for network packets.
//!
//! ## Design
//!
//! - Fixed-capacity output buffer, allocated once per serializer
//! - Integers declared with a `[min, max]` range are written in the fewest of
//!   1/2/4/8 bytes that can hold `max - min`
//! - Everything is big-endian (network byte order)
//! - A failed read or write poisons the serializer: every later call fails,
//!   so a caller only has to check the last result or [`is_valid`]
//!
//! [`is_valid`]: PacketSerializer::is_valid

use driftwire_shared::MAX_PACKET_SIZE;

/// Returns the number of bytes used on the wire for a bounded value whose
/// declared range is `range = max - min`.
#[inline]
#[must_use]
pub const fn bounded_width(range: u64) -> usize {
    if range <= u8::MAX as u64 {
        1
    } else if range <= u16::MAX as u64 {
        2
    } else if range <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

/// An integer that can be written relative to a declared minimum.
pub trait BoundedValue: Copy + PartialOrd {
    /// Unsigned distance from `min` to `self`. Only meaningful for `self >= min`.
    fn offset_from(self, min: Self) -> u64;

    /// Inverse of [`offset_from`](BoundedValue::offset_from).
    fn from_offset(min: Self, offset: u64) -> Self;
}

macro_rules! impl_bounded_unsigned {
    ($($ty:ty),*) => {
        $(
            impl BoundedValue for $ty {
                #[inline]
                fn offset_from(self, min: Self) -> u64 {
                    (self as u64).wrapping_sub(min as u64)
                }

                #[inline]
                fn from_offset(min: Self, offset: u64) -> Self {
                    (min as u64).wrapping_add(offset) as $ty
                }
            }
        )*
    };
}

macro_rules! impl_bounded_signed {
    ($($ty:ty),*) => {
        $(
            impl BoundedValue for $ty {
                #[inline]
                fn offset_from(self, min: Self) -> u64 {
                    (self as i64).wrapping_sub(min as i64) as u64
                }

                #[inline]
                fn from_offset(min: Self, offset: u64) -> Self {
                    (min as i64).wrapping_add(offset as i64) as $ty
                }
            }
        )*
    };
}

impl_bounded_unsigned!(u8, u16, u32, u64, usize);
impl_bounded_signed!(i8, i16, i32, i64);

/// A type with a wire representation.
pub trait Serializable: Sized {
    /// Writes `self` to `out`. Returns false if the serializer is, or became,
    /// invalid.
    fn serialize(&self, out: &mut PacketSerializer) -> bool;

    /// Reads a value from `input`. Returns None if the bytes are malformed or
    /// run out.
    fn deserialize(input: &mut PacketDeserializer<'_>) -> Option<Self>;
}

/// Packet serializer - writes values to a fixed-capacity buffer.
///
/// The buffer is allocated once; [`reset`](Self::reset) makes it reusable
/// without reallocating.
#[derive(Debug, Clone)]
pub struct PacketSerializer {
    buffer: Vec<u8>,
    capacity: usize,
    valid: bool,
}

impl PacketSerializer {
    /// Creates a serializer sized for a single datagram.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_PACKET_SIZE)
    }

    /// Creates a serializer that never holds more than `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            valid: true,
        }
    }

    /// Resets the serializer for reuse. Clears the invalid flag.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.valid = true;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the fixed capacity of the buffer.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many more bytes fit.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Returns false once any write has failed.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the serializer, returning the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Appends `bytes` in full or not at all.
    #[inline]
    fn write_raw(&mut self, bytes: &[u8]) -> bool {
        if !self.valid || bytes.len() > self.remaining() {
            self.valid = false;
            return false;
        }
        self.buffer.extend_from_slice(bytes);
        true
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        self.write_raw(&[value])
    }

    /// Writes a u16 in network byte order.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> bool {
        self.write_raw(&value.to_be_bytes())
    }

    /// Writes a u32 in network byte order.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> bool {
        self.write_raw(&value.to_be_bytes())
    }

    /// Writes a u64 in network byte order.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> bool {
        self.write_raw(&value.to_be_bytes())
    }

    /// Writes a bool as one byte (0 or 1).
    #[inline]
    pub fn write_bool(&mut self, value: bool) -> bool {
        self.write_u8(u8::from(value))
    }

    /// Writes the full bit pattern of an f32 in network byte order.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> bool {
        self.write_u32(value.to_bits())
    }

    /// Writes the full bit pattern of an f64 in network byte order.
    #[inline]
    pub fn write_f64(&mut self, value: f64) -> bool {
        self.write_u64(value.to_bits())
    }

    /// Writes `value - min` in the smallest width that holds `max - min`.
    ///
    /// A value outside `[min, max]` invalidates the serializer and writes
    /// nothing.
    pub fn write_bounded<T: BoundedValue>(&mut self, min: T, max: T, value: T) -> bool {
        if !(min <= value && value <= max) {
            self.valid = false;
            return false;
        }
        let offset = value.offset_from(min);
        match bounded_width(max.offset_from(min)) {
            1 => self.write_u8(offset as u8),
            2 => self.write_u16(offset as u16),
            4 => self.write_u32(offset as u32),
            _ => self.write_u64(offset),
        }
    }

    /// Appends raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, data: &[u8]) -> bool {
        self.write_raw(data)
    }

    /// Writes a length prefix bounded by `max_len`, then the bytes.
    ///
    /// Either both the prefix and the bytes are written or neither is.
    pub fn write_length_prefixed(&mut self, max_len: usize, data: &[u8]) -> bool {
        let width = bounded_width(max_len as u64);
        if data.len() > max_len || width + data.len() > self.remaining() {
            self.valid = false;
            return false;
        }
        self.write_bounded(0, max_len, data.len()) && self.write_raw(data)
    }

    /// Writes any [`Serializable`] value.
    #[inline]
    pub fn write<T: Serializable>(&mut self, value: &T) -> bool {
        self.valid && value.serialize(self)
    }
}

impl Default for PacketSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Packet deserializer - reads values from a borrowed buffer.
#[derive(Debug, Clone)]
pub struct PacketDeserializer<'a> {
    buffer: &'a [u8],
    position: usize,
    valid: bool,
}

impl<'a> PacketDeserializer<'a> {
    /// Creates a new deserializer from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
            valid: true,
        }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the read cursor.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns false once any read has failed.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns the unread tail of the buffer without consuming it.
    #[inline]
    #[must_use]
    pub fn remaining_slice(&self) -> &'a [u8] {
        self.buffer.get(self.position..).unwrap_or_default()
    }

    fn read_slice(&mut self, count: usize) -> Option<&'a [u8]> {
        if !self.valid {
            return None;
        }
        let Some(end) = self
            .position
            .checked_add(count)
            .filter(|&end| end <= self.buffer.len())
        else {
            self.valid = false;
            return None;
        };
        let slice = &self.buffer[self.position..end];
        self.position = end;
        Some(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Some(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[b]| b)
    }

    /// Reads a u16 in network byte order.
    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    /// Reads a u32 in network byte order.
    #[inline]
    pub fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Reads a u64 in network byte order.
    #[inline]
    pub fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_be_bytes)
    }

    /// Reads a bool. Any byte other than 0 or 1 is malformed.
    pub fn read_bool(&mut self) -> Option<bool> {
        match self.read_u8()? {
            0 => Some(false),
            1 => Some(true),
            _ => {
                self.valid = false;
                None
            }
        }
    }

    /// Reads an f32 in network byte order.
    #[inline]
    pub fn read_f32(&mut self) -> Option<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Reads an f64 in network byte order.
    #[inline]
    pub fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    /// Reads a value written by [`PacketSerializer::write_bounded`] with the
    /// same `min` and `max`.
    ///
    /// Decoded values above `max` are malformed.
    pub fn read_bounded<T: BoundedValue>(&mut self, min: T, max: T) -> Option<T> {
        if min > max {
            self.valid = false;
            return None;
        }
        let range = max.offset_from(min);
        let offset = match bounded_width(range) {
            1 => u64::from(self.read_u8()?),
            2 => u64::from(self.read_u16()?),
            4 => u64::from(self.read_u32()?),
            _ => self.read_u64()?,
        };
        if offset > range {
            self.valid = false;
            return None;
        }
        Some(T::from_offset(min, offset))
    }

    /// Reads `count` raw bytes.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        self.read_slice(count)
    }

    /// Reads bytes written by [`PacketSerializer::write_length_prefixed`].
    pub fn read_length_prefixed(&mut self, max_len: usize) -> Option<&'a [u8]> {
        let len = self.read_bounded(0, max_len)?;
        self.read_slice(len)
    }

    /// Reads any [`Serializable`] value.
    #[inline]
    pub fn read<T: Serializable>(&mut self) -> Option<T> {
        if !self.valid {
            return None;
        }
        let value = T::deserialize(self);
        if value.is_none() {
            self.valid = false;
        }
        value
    }
}
