//! Built-in low-precision ephemeris.
//!
//! Planets use the JPL approximate Keplerian elements (Standish, valid
//! 1800-2050 to arc-minutes, degrading gracefully outside it). The Moon uses
//! the main periodic terms of Meeus ch. 47. Universal time is used directly
//! as dynamical time; the ΔT offset (about a minute today) is below the
//! precision of this model.

use crate::ephemeris::provider::EphemerisProvider;
use crate::ephemeris::sphere;
use crate::ephemeris::types::{Body, GeoLocation, HouseCusps, RawPosition};
use crate::error::EphemerisError;
use crate::frame::{general_precession_longitude_deg, Frame};
use crate::time::J2000_JD;
use crate::zodiac::normalize_deg;

/// 1000-01-01 to 3000-01-01.
pub const MIN_JD: f64 = 2_086_667.5;
pub const MAX_JD: f64 = 2_816_787.5;

/// Half-step for central-difference speeds, days.
const SPEED_STEP_DAYS: f64 = 0.01;

/// Osculating elements at J2000 and their rates per Julian century.
#[derive(Debug, Clone, Copy)]
struct OrbitalElements {
    /// Semi-major axis (AU)
    a: (f64, f64),
    e: (f64, f64),
    /// Inclination
    i: (f64, f64),
    /// Mean longitude
    l: (f64, f64),
    /// Longitude of perihelion
    peri: (f64, f64),
    /// Longitude of the ascending node
    node: (f64, f64),
}

const MERCURY: OrbitalElements = OrbitalElements {
    a: (0.387_099_27, 0.000_000_37),
    e: (0.205_635_93, 0.000_019_06),
    i: (7.004_979_02, -0.005_947_49),
    l: (252.250_323_50, 149_472.674_111_75),
    peri: (77.457_796_28, 0.160_476_89),
    node: (48.330_765_93, -0.125_340_81),
};

const VENUS: OrbitalElements = OrbitalElements {
    a: (0.723_335_66, 0.000_003_90),
    e: (0.006_776_72, -0.000_041_07),
    i: (3.394_676_05, -0.000_788_90),
    l: (181.979_099_50, 58_517.815_387_29),
    peri: (131.602_467_18, 0.002_683_29),
    node: (76.679_842_55, -0.277_694_18),
};

const EARTH_MOON_BARYCENTER: OrbitalElements = OrbitalElements {
    a: (1.000_002_61, 0.000_005_62),
    e: (0.016_711_23, -0.000_043_92),
    i: (-0.000_015_31, -0.012_946_68),
    l: (100.464_571_66, 35_999.372_449_81),
    peri: (102.937_681_93, 0.323_273_64),
    node: (0.0, 0.0),
};

const MARS: OrbitalElements = OrbitalElements {
    a: (1.523_710_34, 0.000_018_47),
    e: (0.093_394_10, 0.000_078_82),
    i: (1.849_691_42, -0.008_131_31),
    l: (-4.553_432_05, 19_140.302_684_99),
    peri: (-23.943_629_59, 0.444_410_88),
    node: (49.559_538_91, -0.292_573_43),
};

const JUPITER: OrbitalElements = OrbitalElements {
    a: (5.202_887_00, -0.000_116_07),
    e: (0.048_386_24, -0.000_132_53),
    i: (1.304_396_95, -0.001_837_14),
    l: (34.396_440_51, 3_034.746_127_75),
    peri: (14.728_479_83, 0.212_526_68),
    node: (100.473_909_09, 0.204_691_06),
};

const SATURN: OrbitalElements = OrbitalElements {
    a: (9.536_675_94, -0.001_250_60),
    e: (0.053_861_79, -0.000_509_91),
    i: (2.485_991_87, 0.001_936_09),
    l: (49.954_244_23, 1_222.493_622_01),
    peri: (92.598_878_31, -0.418_972_16),
    node: (113.662_424_48, -0.288_677_94),
};

const URANUS: OrbitalElements = OrbitalElements {
    a: (19.189_164_64, -0.001_961_76),
    e: (0.047_257_44, -0.000_043_97),
    i: (0.772_637_83, -0.002_429_39),
    l: (313.238_104_51, 428.482_027_85),
    peri: (170.954_276_30, 0.408_052_81),
    node: (74.016_925_03, 0.042_405_89),
};

const NEPTUNE: OrbitalElements = OrbitalElements {
    a: (30.069_922_76, 0.000_262_91),
    e: (0.008_590_48, 0.000_051_05),
    i: (1.770_043_47, 0.000_353_72),
    l: (-55.120_029_69, 218.459_453_25),
    peri: (44.964_762_27, -0.322_414_64),
    node: (131.784_225_74, -0.005_086_64),
};

const PLUTO: OrbitalElements = OrbitalElements {
    a: (39.482_116_75, -0.000_315_96),
    e: (0.248_827_30, 0.000_051_70),
    i: (17.140_012_06, 0.000_048_18),
    l: (238.929_038_33, 145.207_805_15),
    peri: (224.068_916_29, -0.040_629_42),
    node: (110.303_936_84, -0.011_834_82),
};

fn at(pair: (f64, f64), t: f64) -> f64 {
    pair.0 + pair.1 * t
}

/// Solve Kepler's equation `M = E - e sin E` (radians) by Newton iteration.
fn eccentric_anomaly(mean_anomaly: f64, e: f64) -> f64 {
    let mut ecc = mean_anomaly + e * mean_anomaly.sin();
    for _ in 0..30 {
        let delta = (ecc - e * ecc.sin() - mean_anomaly) / (1.0 - e * ecc.cos());
        ecc -= delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    ecc
}

/// Heliocentric ecliptic (J2000) rectangular coordinates, AU.
fn heliocentric_xy(el: &OrbitalElements, t: f64) -> (f64, f64) {
    let a = at(el.a, t);
    let e = at(el.e, t);
    let inc = at(el.i, t).to_radians();
    let l = at(el.l, t);
    let peri = at(el.peri, t);
    let node = at(el.node, t);

    let omega = (peri - node).to_radians();
    let mean_anomaly = normalize_deg(l - peri).to_radians();
    let ecc = eccentric_anomaly(mean_anomaly, e);

    let xp = a * (ecc.cos() - e);
    let yp = a * (1.0 - e * e).sqrt() * ecc.sin();

    let (so, co) = omega.sin_cos();
    let (sn, cn) = node.to_radians().sin_cos();
    let ci = inc.cos();

    let x = (co * cn - so * sn * ci) * xp + (-so * cn - co * sn * ci) * yp;
    let y = (co * sn + so * cn * ci) * xp + (-so * sn + co * cn * ci) * yp;
    (x, y)
}

fn elements_for(body: Body) -> Option<&'static OrbitalElements> {
    match body {
        Body::Mercury => Some(&MERCURY),
        Body::Venus => Some(&VENUS),
        Body::Mars => Some(&MARS),
        Body::Jupiter => Some(&JUPITER),
        Body::Saturn => Some(&SATURN),
        Body::Uranus => Some(&URANUS),
        Body::Neptune => Some(&NEPTUNE),
        Body::Pluto => Some(&PLUTO),
        Body::Sun | Body::Moon | Body::NorthNode => None,
    }
}

/// Geocentric tropical longitude of date for a planet or the Sun.
fn planet_longitude(body: Body, jd: f64) -> f64 {
    let t = (jd - J2000_JD) / 36525.0;
    let (ex, ey) = heliocentric_xy(&EARTH_MOON_BARYCENTER, t);
    let (x, y) = match elements_for(body) {
        Some(el) => {
            let (px, py) = heliocentric_xy(el, t);
            (px - ex, py - ey)
        }
        None => (-ex, -ey),
    };
    // J2000 ecliptic -> ecliptic of date
    normalize_deg(y.atan2(x).to_degrees() + general_precession_longitude_deg(jd))
}

/// (coefficient in 1e-6 degrees, D, M, M', F)
const MOON_TERMS: [(f64, i32, i32, i32, i32); 24] = [
    (6_288_774.0, 0, 0, 1, 0),
    (1_274_027.0, 2, 0, -1, 0),
    (658_314.0, 2, 0, 0, 0),
    (213_618.0, 0, 0, 2, 0),
    (-185_116.0, 0, 1, 0, 0),
    (-114_332.0, 0, 0, 0, 2),
    (58_793.0, 2, 0, -2, 0),
    (57_066.0, 2, -1, -1, 0),
    (53_322.0, 2, 0, 1, 0),
    (45_758.0, 2, -1, 0, 0),
    (-40_923.0, 0, 1, -1, 0),
    (-34_720.0, 1, 0, 0, 0),
    (-30_383.0, 0, 1, 1, 0),
    (15_327.0, 2, 0, 0, -2),
    (-12_528.0, 0, 0, 1, 2),
    (10_980.0, 0, 0, 1, -2),
    (10_675.0, 4, 0, -1, 0),
    (10_034.0, 0, 0, 3, 0),
    (8_548.0, 4, 0, -2, 0),
    (-7_888.0, 2, 1, -1, 0),
    (-6_766.0, 2, 1, 0, 0),
    (-5_163.0, 1, 0, -1, 0),
    (4_987.0, 1, 1, 0, 0),
    (4_036.0, 2, -1, 1, 0),
];

/// Geocentric tropical longitude of the Moon, of date (Meeus ch. 47).
fn moon_longitude(jd: f64) -> f64 {
    let t = (jd - J2000_JD) / 36525.0;
    let lp = 218.316_447_7 + 481_267.881_234_21 * t;
    let d = (297.850_192_1 + 445_267.111_403_4 * t).to_radians();
    let m = (357.529_109_2 + 35_999.050_290_9 * t).to_radians();
    let mp = (134.963_396_4 + 477_198.867_505_5 * t).to_radians();
    let f = (93.272_095_0 + 483_202.017_523_3 * t).to_radians();
    let e = 1.0 - 0.002_516 * t;

    let mut sum: f64 = MOON_TERMS
        .iter()
        .map(|&(coeff, cd, cm, cmp, cf)| {
            let arg = cd as f64 * d + cm as f64 * m + cmp as f64 * mp + cf as f64 * f;
            let eccentricity = e.powi(cm.abs());
            coeff * eccentricity * arg.sin()
        })
        .sum();

    let a1 = (119.75 + 131.849 * t).to_radians();
    let a2 = (53.09 + 479_264.29 * t).to_radians();
    sum += 3958.0 * a1.sin() + 1962.0 * (lp.to_radians() - f).sin() + 318.0 * a2.sin();

    normalize_deg(lp + sum / 1_000_000.0)
}

/// Mean longitude of the Moon's ascending node (Meeus 47.7).
fn mean_node_longitude(jd: f64) -> f64 {
    let t = (jd - J2000_JD) / 36525.0;
    normalize_deg(
        125.044_547_9 - 1_934.136_289_1 * t + 0.002_075_4 * t * t + t * t * t / 467_441.0,
    )
}

fn tropical_longitude(body: Body, jd: f64) -> f64 {
    match body {
        Body::Moon => moon_longitude(jd),
        Body::NorthNode => mean_node_longitude(jd),
        _ => planet_longitude(body, jd),
    }
}

/// Signed difference `b - a` folded into (-180, 180].
fn wrapped_delta(a: f64, b: f64) -> f64 {
    let d = normalize_deg(b - a);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Pure-Rust ephemeris requiring no data files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticEphemeris;

impl AnalyticEphemeris {
    pub fn new() -> Self {
        Self
    }

    fn check_range(jd: f64) -> Result<(), EphemerisError> {
        if !jd.is_finite() || !(MIN_JD..=MAX_JD).contains(&jd) {
            return Err(EphemerisError::OutOfRange {
                jd,
                min: MIN_JD,
                max: MAX_JD,
            });
        }
        Ok(())
    }
}

impl EphemerisProvider for AnalyticEphemeris {
    fn name(&self) -> &str {
        "analytic"
    }

    fn position(&self, jd_ut: f64, body: Body, frame: Frame) -> Result<RawPosition, EphemerisError> {
        Self::check_range(jd_ut)?;

        let lon = tropical_longitude(body, jd_ut);
        let before = tropical_longitude(body, jd_ut - SPEED_STEP_DAYS);
        let after = tropical_longitude(body, jd_ut + SPEED_STEP_DAYS);
        let speed_lon = wrapped_delta(before, after) / (2.0 * SPEED_STEP_DAYS);

        if !lon.is_finite() || !speed_lon.is_finite() {
            return Err(EphemerisError::CalculationFailed {
                body: body.to_string(),
                message: format!("non-finite result at jd {jd_ut}"),
            });
        }

        Ok(RawPosition {
            body,
            lon: frame.apply(lon, jd_ut),
            speed_lon,
            frame,
        })
    }

    fn quadrant_houses(
        &self,
        jd_ut: f64,
        location: GeoLocation,
        frame: Frame,
    ) -> Result<HouseCusps, EphemerisError> {
        Self::check_range(jd_ut)?;
        location
            .validate()
            .map_err(|e| EphemerisError::HouseCalculationFailed {
                message: e.to_string(),
            })?;

        let houses = sphere::quadrant_houses(jd_ut, location.lat, location.lon);
        let mut cusps = houses.cusps;
        for cusp in cusps.iter_mut() {
            *cusp = frame.apply(*cusp, jd_ut);
        }

        Ok(HouseCusps {
            ascendant: frame.apply(houses.ascendant, jd_ut),
            midheaven: frame.apply(houses.midheaven, jd_ut),
            cusps,
            system: houses.system,
            frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Ayanamsha;
    use crate::zodiac::{angular_distance, ZodiacSign};

    const EPH: AnalyticEphemeris = AnalyticEphemeris;

    fn lon(body: Body, jd: f64) -> f64 {
        EPH.position(jd, body, Frame::Tropical).unwrap().lon
    }

    #[test]
    fn sun_at_j2000() {
        // Apparent solar longitude 2000-01-01 12:00 TT is 280.37°
        assert!(angular_distance(lon(Body::Sun, J2000_JD), 280.37) < 0.1);
    }

    #[test]
    fn sun_in_scorpio_in_early_november() {
        // 1995-11-08 20:15 UT
        let sun = lon(Body::Sun, 2_450_030.343_75);
        assert_eq!(ZodiacSign::from_longitude(sun), ZodiacSign::Scorpio);
        assert!(angular_distance(sun, 226.0) < 0.5, "sun at {sun}");
    }

    #[test]
    fn moon_meeus_example_47a() {
        // 1992 April 12, 0h TD: λ = 133.162655
        let moon = lon(Body::Moon, 2_448_724.5);
        assert!(angular_distance(moon, 133.163) < 0.1, "moon at {moon}");
    }

    #[test]
    fn outer_planets_near_reference() {
        // 2000-01-01 12:00: Jupiter ~25.2° Aries, Saturn ~10.4° Taurus
        assert!(angular_distance(lon(Body::Jupiter, J2000_JD), 25.2) < 1.0);
        assert!(angular_distance(lon(Body::Saturn, J2000_JD), 40.4) < 1.0);
    }

    #[test]
    fn speeds_have_the_right_magnitude() {
        let sun = EPH.position(J2000_JD, Body::Sun, Frame::Tropical).unwrap();
        assert!((sun.speed_lon - 1.019).abs() < 0.01);
        assert!(!sun.retrograde());
        let moon = EPH.position(J2000_JD, Body::Moon, Frame::Tropical).unwrap();
        assert!(moon.speed_lon > 11.0 && moon.speed_lon < 16.0);
        let node = EPH.position(J2000_JD, Body::NorthNode, Frame::Tropical).unwrap();
        assert!(node.retrograde());
    }

    #[test]
    fn mercury_goes_retrograde() {
        // Mercury retrograde 2024-04-01 .. 2024-04-25
        let jd = crate::time::julian_day(2024, 4, 10, 0.0);
        assert!(EPH.position(jd, Body::Mercury, Frame::Tropical).unwrap().retrograde());
    }

    #[test]
    fn sidereal_frame_is_tagged_and_shifted() {
        let frame = Frame::Sidereal(Ayanamsha::Lahiri);
        let trop = EPH.position(J2000_JD, Body::Sun, Frame::Tropical).unwrap();
        let sid = EPH.position(J2000_JD, Body::Sun, frame).unwrap();
        assert_eq!(sid.frame, frame);
        assert!((angular_distance(trop.lon, sid.lon) - 23.853).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let err = EPH.position(1_000_000.0, Body::Sun, Frame::Tropical).unwrap_err();
        assert!(matches!(err, EphemerisError::OutOfRange { .. }));
        assert!(EPH
            .quadrant_houses(f64::NAN, GeoLocation { lat: 0.0, lon: 0.0 }, Frame::Tropical)
            .is_err());
    }

    #[test]
    fn houses_carry_the_requested_frame() {
        let loc = GeoLocation { lat: 39.9334, lon: 32.8597 };
        let frame = Frame::Sidereal(Ayanamsha::Lahiri);
        let h = EPH.quadrant_houses(2_450_030.343_75, loc, frame).unwrap();
        assert_eq!(h.frame, frame);
        assert_eq!(h.cusps[0], h.ascendant);
    }
}
