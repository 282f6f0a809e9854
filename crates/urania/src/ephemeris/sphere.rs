//! Spherical astronomy for the angles and quadrant house cusps.
//!
//! Sources: Meeus, "Astronomical Algorithms" (2nd ed), ch. 12, 13 and 22;
//! Placidus by iterated semi-arc trisection.
//!
//! All angles here are tropical, of date, in degrees.

use crate::ephemeris::types::HouseSystemName;
use crate::time::J2000_JD;
use crate::zodiac::normalize_deg;

/// Placidus cusp iteration limit.
const MAX_ITERATIONS: usize = 50;
const CONVERGENCE_DEG: f64 = 1e-9;

fn centuries_since_j2000(jd: f64) -> f64 {
    (jd - J2000_JD) / 36525.0
}

/// Mean obliquity of the ecliptic (Meeus 22.2).
pub fn mean_obliquity_deg(jd: f64) -> f64 {
    let t = centuries_since_j2000(jd);
    let arcsec = 21.448 - 46.8150 * t - 0.00059 * t * t + 0.001813 * t * t * t;
    23.0 + 26.0 / 60.0 + arcsec / 3600.0
}

/// Greenwich mean sidereal time (Meeus 12.4), degrees in [0, 360).
pub fn gmst_deg(jd_ut: f64) -> f64 {
    let t = centuries_since_j2000(jd_ut);
    normalize_deg(
        280.460_618_37 + 360.985_647_366_29 * (jd_ut - J2000_JD) + 0.000_387_933 * t * t
            - t * t * t / 38_710_000.0,
    )
}

/// Right ascension of the midheaven (local sidereal time), degrees.
pub fn ramc_deg(jd_ut: f64, east_longitude_deg: f64) -> f64 {
    normalize_deg(gmst_deg(jd_ut) + east_longitude_deg)
}

/// Ecliptic longitude of the point on the ecliptic with right ascension `ra`.
pub fn ecliptic_longitude_from_ra(ra_deg: f64, eps_deg: f64) -> f64 {
    let (ra, eps) = (ra_deg.to_radians(), eps_deg.to_radians());
    normalize_deg(f64::atan2(ra.sin(), ra.cos() * eps.cos()).to_degrees())
}

pub fn midheaven_deg(ramc_deg: f64, eps_deg: f64) -> f64 {
    ecliptic_longitude_from_ra(ramc_deg, eps_deg)
}

/// Ecliptic longitude rising on the eastern horizon.
///
/// `Asc = atan2(cos RAMC, -(sin RAMC cos e + tan phi sin e))`
pub fn ascendant_deg(ramc_deg: f64, latitude_deg: f64, eps_deg: f64) -> f64 {
    let (ramc, phi, eps) = (
        ramc_deg.to_radians(),
        latitude_deg.to_radians(),
        eps_deg.to_radians(),
    );
    let asc = normalize_deg(
        f64::atan2(
            ramc.cos(),
            -(ramc.sin() * eps.cos() + phi.tan() * eps.sin()),
        )
        .to_degrees(),
    );
    // Inside the polar circles atan2 can pick the setting intersection.
    if hour_angle_deg(asc, ramc_deg, eps_deg).to_radians().sin() > 0.0 {
        normalize_deg(asc + 180.0)
    } else {
        asc
    }
}

/// Right ascension of the ecliptic point at longitude `lon`.
pub fn right_ascension_from_ecliptic(lon_deg: f64, eps_deg: f64) -> f64 {
    let (lon, eps) = (lon_deg.to_radians(), eps_deg.to_radians());
    normalize_deg(f64::atan2(lon.sin() * eps.cos(), lon.cos()).to_degrees())
}

/// Hour angle of an ecliptic point; west of the meridian is (0, 180).
fn hour_angle_deg(lon_deg: f64, ramc_deg: f64, eps_deg: f64) -> f64 {
    normalize_deg(ramc_deg - right_ascension_from_ecliptic(lon_deg, eps_deg))
}

/// Diurnal semi-arc of a declination at a latitude, degrees.
///
/// `None` when the point never rises or never sets.
fn diurnal_semi_arc_deg(dec_deg: f64, latitude_deg: f64) -> Option<f64> {
    let x = -latitude_deg.to_radians().tan() * dec_deg.to_radians().tan();
    if x.abs() > 1.0 {
        None
    } else {
        Some(x.acos().to_degrees())
    }
}

/// Declination of the ecliptic point with right ascension `ra`.
fn ecliptic_declination_from_ra(ra_deg: f64, eps_deg: f64) -> f64 {
    (ra_deg.to_radians().sin() * eps_deg.to_radians().tan())
        .atan()
        .to_degrees()
}

/// One Placidus cusp above the horizon (houses 11, 12) or below (2, 3).
///
/// Above: the hour angle is `-fraction * DSA`, so `RA = RAMC + fraction * DSA`.
/// Below: measured back from the lower meridian,
/// `RA = RAMC + 180 - fraction * NSA` with `NSA = 180 - DSA`.
fn placidus_cusp(
    ramc: f64,
    latitude: f64,
    eps: f64,
    fraction: f64,
    above_horizon: bool,
) -> Option<f64> {
    let mut ra = if above_horizon {
        ramc + fraction * 90.0
    } else {
        ramc + 180.0 - fraction * 90.0
    };

    for _ in 0..MAX_ITERATIONS {
        let dec = ecliptic_declination_from_ra(ra, eps);
        let dsa = diurnal_semi_arc_deg(dec, latitude)?;
        let next = if above_horizon {
            ramc + fraction * dsa
        } else {
            ramc + 180.0 - fraction * (180.0 - dsa)
        };
        let delta = (next - ra).abs();
        ra = next;
        if delta < CONVERGENCE_DEG {
            return Some(ecliptic_longitude_from_ra(ra, eps));
        }
    }
    None
}

/// Raw quadrant houses in the tropical frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrantHouses {
    pub ascendant: f64,
    pub midheaven: f64,
    pub cusps: [f64; 12],
    pub system: HouseSystemName,
}

/// Placidus houses, or Porphyry where Placidus has no solution
/// (within the polar circles some ecliptic degrees never rise).
pub fn quadrant_houses(jd_ut: f64, latitude: f64, east_longitude: f64) -> QuadrantHouses {
    let eps = mean_obliquity_deg(jd_ut);
    let ramc = ramc_deg(jd_ut, east_longitude);
    let asc = ascendant_deg(ramc, latitude, eps);
    let mc = midheaven_deg(ramc, eps);

    match placidus_cusps(asc, mc, ramc, latitude, eps) {
        Some(cusps) => QuadrantHouses {
            ascendant: asc,
            midheaven: mc,
            cusps,
            system: HouseSystemName::Placidus,
        },
        None => {
            log::warn!(
                "Placidus undefined at latitude {latitude:.2}, using Porphyry for jd {jd_ut}"
            );
            QuadrantHouses {
                ascendant: asc,
                midheaven: mc,
                cusps: porphyry_cusps(asc, mc),
                system: HouseSystemName::Porphyry,
            }
        }
    }
}

fn placidus_cusps(asc: f64, mc: f64, ramc: f64, latitude: f64, eps: f64) -> Option<[f64; 12]> {
    if latitude.abs() >= 90.0 - eps {
        return None;
    }
    let c11 = placidus_cusp(ramc, latitude, eps, 1.0 / 3.0, true)?;
    let c12 = placidus_cusp(ramc, latitude, eps, 2.0 / 3.0, true)?;
    let c2 = placidus_cusp(ramc, latitude, eps, 2.0 / 3.0, false)?;
    let c3 = placidus_cusp(ramc, latitude, eps, 1.0 / 3.0, false)?;

    Some([
        asc,
        c2,
        c3,
        normalize_deg(mc + 180.0),
        normalize_deg(c11 + 180.0),
        normalize_deg(c12 + 180.0),
        normalize_deg(asc + 180.0),
        normalize_deg(c2 + 180.0),
        normalize_deg(c3 + 180.0),
        mc,
        c11,
        c12,
    ])
}

/// Porphyry: trisect each quadrant between the angles along the ecliptic.
pub fn porphyry_cusps(asc: f64, mc: f64) -> [f64; 12] {
    let ic = normalize_deg(mc + 180.0);
    let desc = normalize_deg(asc + 180.0);
    let mut cusps = [0.0; 12];

    let quadrants = [(0, asc, ic), (3, ic, desc), (6, desc, mc), (9, mc, asc)];
    for (start, from, to) in quadrants {
        let arc = arc_forward(from, to);
        cusps[start] = from;
        cusps[start + 1] = normalize_deg(from + arc / 3.0);
        cusps[start + 2] = normalize_deg(from + 2.0 * arc / 3.0);
    }
    cusps
}

/// Counter-clockwise arc from `a` to `b`, degrees in [0, 360).
fn arc_forward(a: f64, b: f64) -> f64 {
    normalize_deg(b - a)
}
