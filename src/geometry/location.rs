// src/geometry/location.rs

use serde::{Deserialize, Serialize};

/// Geodetic position of a placed scene instance.
///
/// Latitude and longitude are degrees, altitude is meters. Kept at `f64`
/// precision since sub-meter accuracy matters at geographic scale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}
