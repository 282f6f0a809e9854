//! Swiss Ephemeris backend (`swisseph` feature).
//!
//! Positions are always requested tropical; the sidereal shift is applied by
//! [`Frame::apply`] per call, so the library's global sidereal mode is never
//! touched.

use std::env;
use std::path::PathBuf;

use swisseph::swe::{calc_ut, houses_ex};
use swisseph::{AscMc, Cusp};

use crate::ephemeris::provider::EphemerisProvider;
use crate::ephemeris::types::{Body, GeoLocation, HouseCusps, HouseSystemName, RawPosition};
use crate::error::EphemerisError;
use crate::frame::Frame;
use crate::zodiac::normalize_deg;

/// FLG_SWIEPH | FLG_SPEED
const FLAGS: i32 = 2 | 256;
const PLACIDUS: u8 = b'P';

/// Swiss Ephemeris body codes.
fn body_code(body: Body) -> u32 {
    match body {
        Body::Sun => 0,
        Body::Moon => 1,
        Body::Mercury => 2,
        Body::Venus => 3,
        Body::Mars => 4,
        Body::Jupiter => 5,
        Body::Saturn => 6,
        Body::Uranus => 7,
        Body::Neptune => 8,
        Body::Pluto => 9,
        // MEAN_NODE
        Body::NorthNode => 10,
    }
}

pub struct SwissEphemeris {
    ephemeris_path: PathBuf,
}

impl SwissEphemeris {
    /// `path` falls back to `EPHE_PATH`, then `/usr/local/share/swisseph`.
    pub fn new(path: Option<PathBuf>) -> Result<Self, EphemerisError> {
        let path = path.unwrap_or_else(|| {
            env::var("EPHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/usr/local/share/swisseph"))
        });

        if !path.exists() {
            return Err(EphemerisError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        log::info!("Using Swiss Ephemeris files at {}", path.display());

        Ok(Self {
            ephemeris_path: path,
        })
    }

    pub fn ephemeris_path(&self) -> &PathBuf {
        &self.ephemeris_path
    }
}

impl EphemerisProvider for SwissEphemeris {
    fn name(&self) -> &str {
        "swisseph"
    }

    fn position(&self, jd_ut: f64, body: Body, frame: Frame) -> Result<RawPosition, EphemerisError> {
        let result = calc_ut(jd_ut, body_code(body), FLAGS as u32).map_err(|e| {
            EphemerisError::CalculationFailed {
                body: body.to_string(),
                message: format!("Swiss Ephemeris error: {}", e),
            }
        })?;

        Ok(RawPosition {
            body,
            lon: frame.apply(result.out[0], jd_ut),
            speed_lon: result.out[3],
            frame,
        })
    }

    fn quadrant_houses(
        &self,
        jd_ut: f64,
        location: GeoLocation,
        frame: Frame,
    ) -> Result<HouseCusps, EphemerisError> {
        let (c, a) = houses_ex(jd_ut, FLAGS, location.lat, location.lon, PLACIDUS as i32);
        let cusps = Cusp::from_array(c);
        let ascmc = AscMc::from_array(a);

        let raw = [
            cusps.first,
            cusps.second,
            cusps.third,
            cusps.fourth,
            cusps.fifth,
            cusps.sixth,
            cusps.seventh,
            cusps.eighth,
            cusps.ninth,
            cusps.tenth,
            cusps.eleventh,
            cusps.twelfth,
        ];
        if raw.iter().any(|c| !c.is_finite()) || !ascmc.ascendant.is_finite() {
            return Err(EphemerisError::HouseCalculationFailed {
                message: format!("non-finite cusps at jd {jd_ut}"),
            });
        }

        Ok(HouseCusps {
            ascendant: frame.apply(normalize_deg(ascmc.ascendant), jd_ut),
            midheaven: frame.apply(normalize_deg(ascmc.mc), jd_ut),
            cusps: raw.map(|c| frame.apply(c, jd_ut)),
            system: HouseSystemName::Placidus,
            frame,
        })
    }
}
