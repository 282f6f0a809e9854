//! Zodiac signs and longitude helpers shared by every stage.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

const SIGN_ORDER: [ZodiacSign; 12] = [
    ZodiacSign::Aries,
    ZodiacSign::Taurus,
    ZodiacSign::Gemini,
    ZodiacSign::Cancer,
    ZodiacSign::Leo,
    ZodiacSign::Virgo,
    ZodiacSign::Libra,
    ZodiacSign::Scorpio,
    ZodiacSign::Sagittarius,
    ZodiacSign::Capricorn,
    ZodiacSign::Aquarius,
    ZodiacSign::Pisces,
];

impl ZodiacSign {
    pub fn from_index(index: usize) -> Self {
        SIGN_ORDER[index % 12]
    }

    pub fn from_longitude(longitude: f64) -> Self {
        Self::from_index(sign_index(longitude))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wrap any angle into [0, 360).
pub fn normalize_deg(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Round to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Normalize then round, keeping the result inside [0, 360).
pub fn round_longitude(deg: f64) -> f64 {
    normalize_deg(round2(normalize_deg(deg)))
}

/// Sign index 0..=11 of a longitude.
pub fn sign_index(longitude: f64) -> usize {
    ((normalize_deg(longitude) / 30.0).floor() as usize).min(11)
}

/// Degrees past the start of the containing sign, in [0, 30).
pub fn degree_in_sign(longitude: f64) -> f64 {
    let lon = normalize_deg(longitude);
    lon - 30.0 * sign_index(lon) as f64
}

/// Shortest angular distance between two longitudes, in [0, 180].
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = normalize_deg(a - b);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}
