//! Mathematical types carried by quantized network fields.
//!
//! These are the canonical representations used in the network protocol.

use bytemuck::{Pod, Zeroable};

/// 3D Vector - position, velocity, direction
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

/// Quaternion for rotations
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Quaternion {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quaternion {
    /// Creates a new quaternion
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Converts to array in `x, y, z, w` order
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Creates from array in `x, y, z, w` order
    #[must_use]
    pub const fn from_array(arr: [f32; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    /// Returns the unit-length quaternion pointing the same way.
    ///
    /// A zero quaternion normalizes to [`Quaternion::IDENTITY`].
    #[must_use]
    pub fn normalized(self) -> Self {
        let len_sq = self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w;
        if len_sq <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let inv = len_sq.sqrt().recip();
        Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_array_order() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(a.to_array(), [1.0, 2.0, 3.0]);
        assert_eq!(Vec3::from_array(a.to_array()), a);
    }

    #[test]
    fn test_quaternion_normalized() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 2.0).normalized();
        assert_eq!(q, Quaternion::IDENTITY);

        let zero = Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized();
        assert_eq!(zero, Quaternion::IDENTITY);
    }

    #[test]
    fn test_math_types_are_pod() {
        assert_eq!(bytemuck::bytes_of(&Vec3::ZERO).len(), 12);
        assert_eq!(bytemuck::bytes_of(&Quaternion::IDENTITY).len(), 16);
    }
}
