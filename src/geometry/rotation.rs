// src/geometry/rotation.rs
// Quaternion orientation for scene placements.

use serde::{Deserialize, Serialize};

/// A rotation stored as raw `x/y/z/w` components.
///
/// Placement records store unit quaternions; components are assigned
/// directly when a placement is applied, no conversion happens in
/// between. Serialized as a `(x, y, z, w)` tuple.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Serialize for Quaternion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (&self.x, &self.y, &self.z, &self.w).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Quaternion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (x, y, z, w) = <(f32, f32, f32, f32)>::deserialize(deserializer)?;
        Ok(Quaternion { x, y, z, w })
    }
}

impl Quaternion {
    /// Construct from raw components.
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Euclidean norm of the four components.
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Whether the quaternion is a unit rotation within `epsilon`.
    pub fn is_unit(&self, epsilon: f32) -> bool {
        (self.norm() - 1.0).abs() <= epsilon
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
            && (self.w - other.w).abs() <= epsilon
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<(f32, f32, f32, f32)> for Quaternion {
    fn from(tuple: (f32, f32, f32, f32)) -> Self {
        Self {
            x: tuple.0,
            y: tuple.1,
            z: tuple.2,
            w: tuple.3,
        }
    }
}
