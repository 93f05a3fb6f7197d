use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    Mmsi, NavigationStatus,
    error::{Result, error::InvalidCoordinatesSnafu},
};

pub const MAX_SPEED_KNOTS: f64 = 100.0;

/// Latest position per vessel, delivered in one call by the batcher.
pub type PositionBatch = HashMap<Mmsi, Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PositionSource {
    Ais,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub mmsi: Mmsi,
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub course: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NavigationStatus>,
    pub timestamp: DateTime<Utc>,
    pub source: PositionSource,
}

impl Position {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            valid_coordinates(self.lat, self.lon),
            InvalidCoordinatesSnafu {
                latitude: self.lat,
                longitude: self.lon,
            }
        );
        Ok(())
    }
}

pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Speed over ground in knots, clamped to `[0, 100]`.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(0.0, MAX_SPEED_KNOTS)
    } else {
        0.0
    }
}

/// Course over ground in degrees, normalized to `[0, 360)`.
pub fn normalize_course(course: f64) -> f64 {
    if !course.is_finite() {
        return 0.0;
    }
    let normalized = course.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

pub fn truncate_to_seconds(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(0)
}

#[cfg(feature = "test")]
mod test {
    use super::*;

    impl Position {
        pub fn test_new(mmsi: &str, lat: f64, lon: f64) -> Self {
            Self {
                mmsi: mmsi.parse().unwrap(),
                lat,
                lon,
                speed: 0.0,
                course: 0.0,
                status: None,
                timestamp: truncate_to_seconds(Utc::now()),
                source: PositionSource::Ais,
            }
        }
    }
}
