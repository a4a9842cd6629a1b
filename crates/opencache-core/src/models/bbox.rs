use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Location;

/// Rectangular lat/lon region used to scope a search.
///
/// No validation is performed: inverted or out-of-range corners are passed
/// through to the service unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid bounding box {input:?}: expected four numbers minLat|minLon|maxLat|maxLon")]
pub struct BoundingBoxParseError {
    input: String,
}

impl BoundingBox {
    pub fn new(min_latitude: f64, min_longitude: f64, max_latitude: f64, max_longitude: f64) -> Self {
        Self {
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
        }
    }

    /// Box of the given size (in degrees) centred on `center`.
    pub fn around(center: Location, lat_span: f64, lon_span: f64) -> Self {
        let half_lat = lat_span / 2.0;
        let half_lon = lon_span / 2.0;
        Self::new(
            center.latitude - half_lat,
            center.longitude - half_lon,
            center.latitude + half_lat,
            center.longitude + half_lon,
        )
    }

    /// Serialize as `minLat|minLon|maxLat|maxLon`, the `bbox` format OKAPI expects.
    pub fn to_query_format(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            format_coordinate(self.min_latitude),
            format_coordinate(self.min_longitude),
            format_coordinate(self.max_latitude),
            format_coordinate(self.max_longitude),
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, location: &Location) -> bool {
        location.latitude >= self.min_latitude
            && location.latitude <= self.max_latitude
            && location.longitude >= self.min_longitude
            && location.longitude <= self.max_longitude
    }

    pub fn center(&self) -> Location {
        Location::new(
            (self.min_latitude + self.max_latitude) / 2.0,
            (self.min_longitude + self.max_longitude) / 2.0,
        )
    }
}

/// Whole numbers keep one decimal digit (`50.0`), everything else uses the
/// shortest plain decimal form. Never produces exponent notation.
fn format_coordinate(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_format())
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxParseError;

    /// Accepts the pipe format, or four numbers separated by commas/whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || BoundingBoxParseError {
            input: s.to_string(),
        };

        let parts: Vec<&str> = s
            .split(|c: char| c == '|' || c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 4 {
            return Err(err());
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| err())?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}
