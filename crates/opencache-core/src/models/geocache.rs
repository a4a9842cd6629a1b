use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A point on the map.
///
/// OKAPI encodes locations as a single `"lat|lon"` string, so this type
/// (de)serializes to and from that form rather than a JSON object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid location {input:?}: expected \"lat|lon\"")]
pub struct LocationParseError {
    input: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse the `"lat|lon"` wire form.
    pub fn parse(s: &str) -> Result<Self, LocationParseError> {
        let err = || LocationParseError {
            input: s.to_string(),
        };

        let (lat, lon) = s.split_once('|').ok_or_else(err)?;
        let latitude: f64 = lat.trim().parse().map_err(|_| err())?;
        let longitude: f64 = lon.trim().parse().map_err(|_| err())?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(err());
        }

        Ok(Self::new(latitude, longitude))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.latitude, self.longitude)
    }
}

impl FromStr for Location {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Location::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum GeocacheStatus {
    Available,
    #[serde(rename = "Temporarily unavailable")]
    TemporarilyUnavailable,
    Archived,
    #[serde(other)]
    Unknown,
}

impl GeocacheStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GeocacheStatus::Available => "available",
            GeocacheStatus::TemporarilyUnavailable => "disabled",
            GeocacheStatus::Archived => "archived",
            GeocacheStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum GeocacheType {
    Traditional,
    Multi,
    Quiz,
    Virtual,
    Event,
    Webcam,
    Moving,
    Own,
    #[serde(other)]
    Other,
}

impl GeocacheType {
    pub fn label(&self) -> &'static str {
        match self {
            GeocacheType::Traditional => "Traditional",
            GeocacheType::Multi => "Multi",
            GeocacheType::Quiz => "Quiz",
            GeocacheType::Virtual => "Virtual",
            GeocacheType::Event => "Event",
            GeocacheType::Webcam => "Webcam",
            GeocacheType::Moving => "Moving",
            GeocacheType::Own => "Own",
            GeocacheType::Other => "Other",
        }
    }
}

/// Summary form of a geocache, as rendered on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Geocache {
    pub code: String,
    pub name: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub location: Location,
    pub status: GeocacheStatus,
    #[serde(rename = "type")]
    pub kind: GeocacheType,
}

impl Geocache {
    pub fn is_available(&self) -> bool {
        self.status == GeocacheStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse() {
        let loc = Location::parse("50.196168|18.446953").unwrap();
        assert_eq!(loc.latitude, 50.196168);
        assert_eq!(loc.longitude, 18.446953);

        assert!(Location::parse("").is_err());
        assert!(Location::parse("50.1").is_err());
        assert!(Location::parse("50.1|abc").is_err());
        assert!(Location::parse("NaN|18.0").is_err());
    }

    #[test]
    fn test_parse_geocache() {
        let json = r#"{"code":"OP1234","name":"Stary Młyn","location":"50.1|18.4","status":"Temporarily unavailable","type":"Multi","extra":1}"#;
        let gc: Geocache = serde_json::from_str(json).unwrap();
        assert_eq!(gc.code, "OP1234");
        assert_eq!(gc.name, "Stary Młyn");
        assert_eq!(gc.location, Location::new(50.1, 18.4));
        assert_eq!(gc.status, GeocacheStatus::TemporarilyUnavailable);
        assert_eq!(gc.kind, GeocacheType::Multi);
        assert!(!gc.is_available());
    }

    #[test]
    fn test_unknown_enum_values() {
        let json = r#"{"code":"OP1","name":"x","location":"1.0|2.0","status":"Lost","type":"Drive-In"}"#;
        let gc: Geocache = serde_json::from_str(json).unwrap();
        assert_eq!(gc.status, GeocacheStatus::Unknown);
        assert_eq!(gc.kind, GeocacheType::Other);
    }

    #[test]
    fn test_location_serializes_to_pipe_string() {
        let json = serde_json::to_string(&Location::new(50.5, 18.25)).unwrap();
        assert_eq!(json, r#""50.5|18.25""#);
    }
}
