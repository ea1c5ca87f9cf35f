//! Geometry types used by scene placement records.
//!
//! Public submodules:
//! - vector (Vector3)
//! - rotation (Quaternion)
//! - location (GeoLocation)

pub mod location;
pub mod rotation;
pub mod vector;

pub use location::GeoLocation;
pub use rotation::Quaternion;
pub use vector::Vector3;
