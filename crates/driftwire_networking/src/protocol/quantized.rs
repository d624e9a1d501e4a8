//! # Quantized Values
//!
//! Fixed-point encoding for floats, vectors and quaternions whose range is
//! known up front.
//!
//! Each component is mapped affinely from `[MIN, MAX]` onto
//! `[0, 2^(8 * BYTE_COUNT) - 1]` and written with
//! [`PacketSerializer::write_bounded`], so a component always costs exactly
//! `BYTE_COUNT` bytes regardless of the float range.
//!
//! ```rust,ignore
//! quantization_range!(WorldPosition, 2, -1024.0, 1024.0);
//!
//! let position = QuantizedVec3::<WorldPosition>::from_vec3(player.position);
//! out.write(&position);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Mul, Sub};

use driftwire_shared::{Quaternion, Vec3};

use super::serialization::{PacketDeserializer, PacketSerializer, Serializable};

/// Compile-time description of a quantized range.
pub trait QuantizationRange {
    /// Bytes per component on the wire. Must be 1, 2 or 4.
    const BYTE_COUNT: usize;
    /// Smallest representable value.
    const MIN: f32;
    /// Largest representable value.
    const MAX: f32;

    /// Largest integer a component can take.
    #[inline]
    #[must_use]
    fn max_integer() -> u32 {
        match Self::BYTE_COUNT {
            1 => u32::from(u8::MAX),
            2 => u32::from(u16::MAX),
            _ => u32::MAX,
        }
    }

    /// Distance between two adjacent representable values.
    #[inline]
    #[must_use]
    fn step() -> f32 {
        ((f64::from(Self::MAX) - f64::from(Self::MIN)) / f64::from(Self::max_integer())) as f32
    }

    /// Maps a float onto the integer grid, clamping out-of-range input.
    ///
    /// NaN maps to 0.
    #[must_use]
    fn quantize(value: f32) -> u32 {
        let min = f64::from(Self::MIN);
        let range = f64::from(Self::MAX) - min;
        if value.is_nan() || range <= 0.0 {
            return 0;
        }
        let max_int = f64::from(Self::max_integer());
        let scaled = ((f64::from(value) - min) / range * max_int).round();
        scaled.clamp(0.0, max_int) as u32
    }

    /// Maps an integer back onto `[MIN, MAX]`.
    #[must_use]
    fn dequantize(quantized: u32) -> f32 {
        let min = f64::from(Self::MIN);
        let range = f64::from(Self::MAX) - min;
        let normalized = f64::from(quantized.min(Self::max_integer())) / f64::from(Self::max_integer());
        (min + normalized * range) as f32
    }
}

/// Declares a unit type implementing [`QuantizationRange`].
#[macro_export]
macro_rules! quantization_range {
    ($(#[$meta:meta])* $vis:vis $name:ident, $bytes:expr, $min:expr, $max:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::protocol::QuantizationRange for $name {
            const BYTE_COUNT: usize = $bytes;
            const MIN: f32 = $min;
            const MAX: f32 = $max;
        }
    };
}

/// `N` quantized components sharing one range.
///
/// The integer form is what goes on the wire; the float form is derived from
/// it and cached, so reading a value back always yields exactly what the
/// remote end will decode.
pub struct QuantizedValues<R: QuantizationRange, const N: usize> {
    values: [f32; N],
    quantized: [u32; N],
    _range: PhantomData<R>,
}

/// A single quantized float.
pub type QuantizedFloat<R> = QuantizedValues<R, 1>;
/// A quantized 3D vector.
pub type QuantizedVec3<R> = QuantizedValues<R, 3>;
/// A quantized quaternion, components in `x, y, z, w` order.
pub type QuantizedQuaternion<R> = QuantizedValues<R, 4>;

impl<R: QuantizationRange, const N: usize> QuantizedValues<R, N> {
    const VALID_BYTE_COUNT: () = assert!(
        matches!(R::BYTE_COUNT, 1 | 2 | 4),
        "quantized components must be 1, 2 or 4 bytes wide"
    );

    /// Creates a value from its float components.
    #[must_use]
    pub fn new(values: [f32; N]) -> Self {
        let mut out = Self::from_quantized([0; N]);
        out.set(values);
        out
    }

    /// Creates a value from its wire integers.
    #[must_use]
    pub fn from_quantized(quantized: [u32; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_BYTE_COUNT;
        let mut out = Self {
            values: [0.0; N],
            quantized: quantized.map(|q| q.min(R::max_integer())),
            _range: PhantomData,
        };
        out.decode_quantized_values();
        out
    }

    /// Quantizes `values` and refreshes the cached floats.
    pub fn set(&mut self, values: [f32; N]) {
        self.quantized = values.map(R::quantize);
        self.decode_quantized_values();
    }

    /// Recomputes the cached floats from the integer form.
    pub fn decode_quantized_values(&mut self) {
        self.values = self.quantized.map(R::dequantize);
    }

    /// Returns the decoded float components.
    #[inline]
    #[must_use]
    pub const fn values(&self) -> [f32; N] {
        self.values
    }

    /// Returns the wire integers.
    #[inline]
    #[must_use]
    pub const fn quantized(&self) -> [u32; N] {
        self.quantized
    }

    /// Bytes this value occupies on the wire.
    #[inline]
    #[must_use]
    pub const fn wire_size() -> usize {
        R::BYTE_COUNT * N
    }
}

impl<R: QuantizationRange> QuantizedValues<R, 1> {
    /// Returns the single decoded component.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.values[0]
    }
}

impl<R: QuantizationRange> QuantizedValues<R, 3> {
    /// Quantizes a vector.
    #[must_use]
    pub fn from_vec3(value: Vec3) -> Self {
        Self::new(value.to_array())
    }

    /// Returns the decoded vector.
    #[must_use]
    pub const fn to_vec3(&self) -> Vec3 {
        Vec3::from_array(self.values)
    }
}

impl<R: QuantizationRange> QuantizedValues<R, 4> {
    /// Quantizes a rotation. Ranges are usually `[-1, 1]`.
    #[must_use]
    pub fn from_quaternion(value: Quaternion) -> Self {
        Self::new(value.to_array())
    }

    /// Returns the decoded rotation, renormalized to undo rounding drift.
    #[must_use]
    pub fn to_quaternion(&self) -> Quaternion {
        Quaternion::from_array(self.values).normalized()
    }
}

impl<R: QuantizationRange, const N: usize> Clone for QuantizedValues<R, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: QuantizationRange, const N: usize> Copy for QuantizedValues<R, N> {}

impl<R: QuantizationRange, const N: usize> fmt::Debug for QuantizedValues<R, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantizedValues")
            .field("values", &self.values)
            .field("quantized", &self.quantized)
            .finish()
    }
}

impl<R: QuantizationRange, const N: usize> Default for QuantizedValues<R, N> {
    fn default() -> Self {
        Self::new([0.0; N])
    }
}

impl<R: QuantizationRange, const N: usize> PartialEq for QuantizedValues<R, N> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<R: QuantizationRange, const N: usize> Add for QuantizedValues<R, N> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut sum = self.values;
        for (lhs, rhs) in sum.iter_mut().zip(rhs.values) {
            *lhs += rhs;
        }
        Self::new(sum)
    }
}

impl<R: QuantizationRange, const N: usize> Sub for QuantizedValues<R, N> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut diff = self.values;
        for (lhs, rhs) in diff.iter_mut().zip(rhs.values) {
            *lhs -= rhs;
        }
        Self::new(diff)
    }
}

impl<R: QuantizationRange, const N: usize> Mul<f32> for QuantizedValues<R, N> {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.values.map(|v| v * rhs))
    }
}

impl<R: QuantizationRange, const N: usize> Serializable for QuantizedValues<R, N> {
    fn serialize(&self, out: &mut PacketSerializer) -> bool {
        let max = R::max_integer();
        self.quantized.iter().all(|&q| out.write_bounded(0, max, q))
    }

    fn deserialize(input: &mut PacketDeserializer<'_>) -> Option<Self> {
        let max = R::max_integer();
        let mut quantized = [0u32; N];
        for slot in &mut quantized {
            *slot = input.read_bounded(0, max)?;
        }
        Some(Self::from_quantized(quantized))
    }
}
