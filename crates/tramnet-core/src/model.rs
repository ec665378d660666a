//! Domain types for the tram network.
//!
//! Everything here is plain data. Persistence lives in [`crate::db`] and the
//! derived search graph lives in [`crate::graph`].

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

/// Line identifier owning connections added by hand rather than by import.
pub const MANUAL_LINE: &str = "MANUAL";

// ---------------------------------------------------------------------------
// Stops
// ---------------------------------------------------------------------------

/// Geographic position of a stop (WGS84 degrees).
///
/// Deserialization goes through [`Coordinate::new`], so a decoded value is
/// always in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = NetworkError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Self::new(raw.lat, raw.lon)
    }
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Validation`] when either component is not a
    /// finite number in range.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(NetworkError::validation(
                "latitude",
                format!("{lat} is not within [-90, 90]"),
            ));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(NetworkError::validation(
                "longitude",
                format!("{lon} is not within [-180, 180]"),
            ));
        }
        Ok(Self { lat, lon })
    }

    /// Parse a coordinate from two textual components.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Validation`] for non-numeric or out-of-range input.
    pub fn parse(lat: &str, lon: &str) -> Result<Self> {
        let lat = parse_degrees("latitude", lat)?;
        let lon = parse_degrees("longitude", lon)?;
        Self::new(lat, lon)
    }

    /// Combine optional components; both or neither must be present.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Validation`] if only one side is given or the
    /// values are invalid.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Result<Option<Self>> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(NetworkError::validation(
                "coordinate",
                "latitude and longitude must be given together",
            )),
        }
    }
}

fn parse_degrees(field: &'static str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| NetworkError::validation(field, format!("'{raw}' is not a number")))
}

/// A tram stop as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub active: bool,
}

/// `(id, name)` pair used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSummary {
    pub id: String,
    pub name: String,
}

/// Stops split by their active flag, each side ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopsByStatus {
    pub active: Vec<StopSummary>,
    pub inactive: Vec<StopSummary>,
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Canonical unordered key for a pair of stops.
///
/// The two ids are sorted so `(a, b)` and `(b, a)` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StopPair {
    lo: String,
    hi: String,
}

impl StopPair {
    #[must_use]
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                lo: a.to_string(),
                hi: b.to_string(),
            }
        } else {
            Self {
                lo: b.to_string(),
                hi: a.to_string(),
            }
        }
    }

    #[must_use]
    pub fn lo(&self) -> &str {
        &self.lo
    }

    #[must_use]
    pub fn hi(&self) -> &str {
        &self.hi
    }

    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.lo == self.hi
    }
}

impl fmt::Display for StopPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

/// A stored travel link between two stops on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub line: String,
    pub from: String,
    pub to: String,
    /// Travel time in minutes, always positive.
    pub weight: u32,
}

impl Connection {
    #[must_use]
    pub fn pair(&self) -> StopPair {
        StopPair::new(&self.from, &self.to)
    }
}

/// A connection touching a given stop, with both endpoint names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopConnection {
    pub from: String,
    pub to: String,
    pub weight: u32,
    pub line: String,
    pub from_name: String,
    pub to_name: String,
}

/// Edge row as listed by the store: `(from, to, weight)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRow {
    pub from: String,
    pub to: String,
    pub weight: u32,
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Separator between route variants inside a line description.
pub const VARIANT_SEPARATOR: &str = " | ";

/// A tram line with its textual route variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub number: String,
    pub route_description: String,
}

impl Line {
    /// Split the route description into its variants.
    #[must_use]
    pub fn variants(&self) -> Vec<&str> {
        if self.route_description.is_empty() {
            return Vec::new();
        }
        self.route_description.split(VARIANT_SEPARATOR).collect()
    }
}

// ---------------------------------------------------------------------------
// Traffic
// ---------------------------------------------------------------------------

/// Historical congestion for one stop at one day-of-week and hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub stop_id: String,
    pub day: Weekday,
    pub hour: u8,
    /// Crowding estimate in percent, `0..=100`.
    pub congestion: f64,
}

impl TrafficSample {
    /// # Errors
    ///
    /// Returns [`NetworkError::Validation`] when `hour` or `congestion` is out
    /// of range.
    pub fn new(stop_id: impl Into<String>, day: Weekday, hour: u8, congestion: f64) -> Result<Self> {
        if hour > 23 {
            return Err(NetworkError::validation(
                "hour",
                format!("{hour} is not within 0..=23"),
            ));
        }
        if !congestion.is_finite() || !(0.0..=100.0).contains(&congestion) {
            return Err(NetworkError::validation(
                "congestion",
                format!("{congestion} is not within [0, 100]"),
            ));
        }
        Ok(Self {
            stop_id: stop_id.into(),
            day,
            hour,
            congestion,
        })
    }
}

/// Full English name of a weekday, as shown to users.
#[must_use]
pub const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Aggregate counters reported by `stats` views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    pub total_stops: usize,
    pub active_stops: usize,
    pub total_connections: usize,
    pub total_lines: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_pair_is_direction_insensitive() {
        assert_eq!(StopPair::new("B", "A"), StopPair::new("A", "B"));
        assert_eq!(StopPair::new("B", "A").lo(), "A");
        assert!(StopPair::new("A", "A").is_loop());
    }

    #[test]
    fn coordinate_parse_rejects_non_numeric() {
        let err = Coordinate::parse("50.06", "east").expect_err("non-numeric longitude");
        assert!(matches!(
            err,
            NetworkError::Validation {
                field: "longitude",
                ..
            }
        ));
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_half_pairs() {
        assert!(Coordinate::new(91.0, 19.9).is_err());
        assert!(Coordinate::new(50.0, f64::NAN).is_err());
        assert!(Coordinate::from_parts(Some(50.0), None).is_err());
        assert_eq!(Coordinate::from_parts(None, None).expect("empty pair"), None);
        let c = Coordinate::parse(" 50.0614 ", "19.9366").expect("valid");
        assert!((c.lat - 50.0614).abs() < f64::EPSILON);
    }

    #[test]
    fn decoded_coordinates_are_range_checked() {
        assert!(serde_json::from_str::<Coordinate>(r#"{"lat": 999, "lon": -999}"#).is_err());
        assert!(serde_json::from_str::<Coordinate>(r#"{"lat": 50.0, "lon": 200.0}"#).is_err());
        let c: Coordinate =
            serde_json::from_str(r#"{"lat": 50.06, "lon": 19.94}"#).expect("in range");
        assert!((c.lon - 19.94).abs() < f64::EPSILON);
    }

    #[test]
    fn line_variants_split_on_separator() {
        let line = Line {
            number: "4".into(),
            route_description: "A: 1 → 2 | B: 2 → 1".into(),
        };
        assert_eq!(line.variants(), vec!["A: 1 → 2", "B: 2 → 1"]);

        let empty = Line {
            number: "MANUAL".into(),
            route_description: String::new(),
        };
        assert!(empty.variants().is_empty());
    }

    #[test]
    fn traffic_sample_validates_ranges() {
        assert!(TrafficSample::new("S", Weekday::Mon, 24, 10.0).is_err());
        assert!(TrafficSample::new("S", Weekday::Mon, 8, 120.0).is_err());
        assert!(TrafficSample::new("S", Weekday::Sun, 23, 100.0).is_ok());
        assert_eq!(weekday_name(Weekday::Wed), "Wednesday");
    }
}
