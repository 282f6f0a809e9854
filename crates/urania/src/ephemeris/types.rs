use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChartError;
use crate::frame::Frame;

/// Geographic location coordinates (degrees, east and north positive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
}

impl GeoLocation {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ChartError> {
        let loc = Self { lat, lon };
        loc.validate()?;
        Ok(loc)
    }

    /// Poles are excluded: the horizon is undefined there.
    pub fn validate(&self) -> Result<(), ChartError> {
        if !self.lat.is_finite() || self.lat.abs() >= 90.0 {
            return Err(ChartError::InvalidInput(format!(
                "latitude {} must be strictly between -90 and 90",
                self.lat
            )));
        }
        if !self.lon.is_finite() || self.lon.abs() > 180.0 {
            return Err(ChartError::InvalidInput(format!(
                "longitude {} must be within -180..=180",
                self.lon
            )));
        }
        Ok(())
    }
}

/// Bodies the engine knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    /// Mean lunar ascending node
    NorthNode,
}

const BODY_IDS: &[(&str, Body)] = &[
    ("sun", Body::Sun),
    ("moon", Body::Moon),
    ("mercury", Body::Mercury),
    ("venus", Body::Venus),
    ("mars", Body::Mars),
    ("jupiter", Body::Jupiter),
    ("saturn", Body::Saturn),
    ("uranus", Body::Uranus),
    ("neptune", Body::Neptune),
    ("pluto", Body::Pluto),
    ("north_node", Body::NorthNode),
];

impl Body {
    /// The ten bodies of a standard Western chart.
    pub const DEFAULT_SET: [Body; 10] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
        Body::Pluto,
    ];

    pub fn id(self) -> &'static str {
        BODY_IDS
            .iter()
            .find(|(_, b)| *b == self)
            .map(|(id, _)| *id)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Body {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        BODY_IDS
            .iter()
            .find(|(id, _)| *id == key || id.replace('_', "") == key)
            .map(|(_, b)| *b)
            .ok_or_else(|| ChartError::InvalidInput(format!("unknown body '{s}'")))
    }
}

/// Longitude and speed as returned by a backend, tagged with its frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPosition {
    pub body: Body,
    /// Ecliptic longitude in degrees, [0, 360)
    pub lon: f64,
    /// Speed in longitude (degrees per day)
    pub speed_lon: f64,
    pub frame: Frame,
}

impl RawPosition {
    /// Instantaneous-speed test; unreliable within hours of a station.
    pub fn retrograde(&self) -> bool {
        self.speed_lon < 0.0
    }
}

/// Name of the house division actually used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HouseSystemName {
    Placidus,
    /// Quadrant trisection, used where Placidus is undefined (polar latitudes)
    Porphyry,
    WholeSign,
}

impl fmt::Display for HouseSystemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Quadrant house positions from a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HouseCusps {
    pub ascendant: f64,
    pub midheaven: f64,
    /// cusps[0] is the house 1 boundary
    pub cusps: [f64; 12],
    pub system: HouseSystemName,
    pub frame: Frame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_ids_round_trip() {
        for (id, body) in BODY_IDS {
            assert_eq!(body.id(), *id);
            assert_eq!(id.parse::<Body>().unwrap(), *body);
        }
        assert_eq!("North Node".parse::<Body>().unwrap(), Body::NorthNode);
        assert!("vulcan".parse::<Body>().is_err());
    }

    #[test]
    fn location_bounds() {
        assert!(GeoLocation::new(39.93, 32.86).is_ok());
        assert!(GeoLocation::new(90.0, 0.0).is_err());
        assert!(GeoLocation::new(10.0, 181.0).is_err());
        assert!(GeoLocation::new(f64::NAN, 0.0).is_err());
    }
}
