use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aspects::Aspect;
use crate::chart::input::BirthInput;
use crate::ephemeris::{Body, HouseSystemName, RawPosition};
use crate::frame::Frame;
use crate::houses::{AutoDiagnostic, HouseMode, HouseSystemResult};
use crate::zodiac::{degree_in_sign, round2, round_longitude, ZodiacSign};

/// Speeds keep more precision than longitudes.
fn round_speed(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// A rounded ecliptic point with its sign.
///
/// Sign and degree are derived from the rounded longitude so the three
/// always agree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnglePosition {
    pub sign: ZodiacSign,
    pub degree: f64,
    pub ecliptic_long: f64,
}

impl AnglePosition {
    pub fn from_longitude(lon: f64) -> Self {
        let ecliptic_long = round_longitude(lon);
        Self {
            sign: ZodiacSign::from_longitude(ecliptic_long),
            degree: round2(degree_in_sign(ecliptic_long)),
            ecliptic_long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub sign: ZodiacSign,
    pub degree: f64,
    pub ecliptic_long: f64,
    /// Degrees per day
    pub speed: f64,
    pub retrograde: bool,
}

impl From<&RawPosition> for BodyPosition {
    fn from(raw: &RawPosition) -> Self {
        let angle = AnglePosition::from_longitude(raw.lon);
        Self {
            sign: angle.sign,
            degree: angle.degree,
            ecliptic_long: angle.ecliptic_long,
            speed: round_speed(raw.speed_lon),
            retrograde: raw.retrograde(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousesPayload {
    /// System actually used
    pub system: HouseSystemName,
    /// Index 0 is the house 1 boundary
    pub cusps_longitudes: [f64; 12],
    /// Whole-sign houses anchored on the Sun because the time was unknown
    pub approximate: bool,
}

/// The canonical chart. Rendering and API layers read only this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartResult {
    pub input: BirthInput,
    pub lat: f64,
    pub lon: f64,
    pub tzid: String,
    pub datetime_local: String,
    pub datetime_utc: String,
    pub julian_day: f64,
    pub utc_offset: String,
    pub is_dst: bool,
    pub is_approximate_time: bool,
    pub zodiac: Frame,
    pub house_mode: HouseMode,
    pub planets: BTreeMap<Body, BodyPosition>,
    pub ascendant: AnglePosition,
    pub midheaven: Option<AnglePosition>,
    pub houses: HousesPayload,
    pub auto: Option<AutoDiagnostic>,
    pub aspects: Vec<Aspect>,
    pub engine_version: String,
}

impl HousesPayload {
    pub fn from_result(result: &HouseSystemResult) -> Self {
        Self {
            system: result.system,
            cusps_longitudes: result.cusps.map(round_longitude),
            approximate: result.approximate,
        }
    }
}
