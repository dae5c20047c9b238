use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("coordinate must be finite")]
    NotFinite,
    #[error("latitude must be within ±90")]
    LatitudeOutOfRange,
    #[error("longitude must be within ±180")]
    LongitudeOutOfRange,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoordinateError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoordinateError::LongitudeOutOfRange);
        }
        Ok(())
    }
}

/// Great-circle distance in kilometres (haversine on a 6371 km sphere).
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}
