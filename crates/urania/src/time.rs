//! Civil time to astronomical instant.
//!
//! - [`time_of_day_policy`]: the one place a missing birth time is defaulted.
//! - [`localize`]: attach an IANA zone to a wall-clock time using the rules in
//!   force on that calendar date, refusing repeated (fall-back) and skipped
//!   (spring-forward) local times unless the caller picked an occurrence.
//! - [`resolve_instant`]: localize, convert to UTC and to a Julian Day (UT).
//!
//! Example: Ankara 1995-11-08 22:15 (+02:00, no DST) -> 20:15Z,
//! JD 2450030.34375.

use chrono::offset::LocalResult;
use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone,
    Timelike, Utc,
};
use chrono_tz::{OffsetComponents, Tz};
use serde::{Deserialize, Serialize};

use crate::error::ChartError;
use crate::houses::HouseMode;

/// Julian Day of the J2000.0 epoch.
pub const J2000_JD: f64 = 2_451_545.0;

/// Local time used when the birth time is unknown.
pub fn default_time_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()
}

/// Which occurrence of a repeated local hour the caller means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DstChoice {
    /// First occurrence (still on daylight time).
    Earlier,
    /// Second occurrence (back on standard time).
    Later,
}

/// An unambiguous instant derived from civil input. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInstant {
    pub local: NaiveDateTime,
    pub tz_id: String,
    pub tz_abbreviation: String,
    pub utc: DateTime<Utc>,
    pub julian_day: f64,
    pub utc_offset: String,
    pub is_dst: bool,
    pub is_approximate_time: bool,
}

impl ResolvedInstant {
    pub fn local_string(&self) -> String {
        format!("{} {}", self.local.format("%Y-%m-%d %H:%M:%S"), self.tz_abbreviation)
    }

    pub fn utc_string(&self) -> String {
        format!("{} UTC", self.utc.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Decide the time of day to compute with.
///
/// Returns the time and whether it was defaulted. Only whole-sign charts may
/// run without a birth time; they get local noon.
pub fn time_of_day_policy(
    tob: Option<NaiveTime>,
    mode: HouseMode,
) -> Result<(NaiveTime, bool), ChartError> {
    match (tob, mode) {
        (Some(t), _) => Ok((t, false)),
        (None, HouseMode::WholeSign) => Ok((default_time_of_day(), true)),
        (None, other) => Err(ChartError::MissingBirthTimeForQuadrant(other.to_string())),
    }
}

pub fn parse_timezone(tz_id: &str) -> Result<Tz, ChartError> {
    tz_id
        .trim()
        .parse::<Tz>()
        .map_err(|_| ChartError::TimezoneNotFound(format!("unknown IANA timezone '{tz_id}'")))
}

/// Localize a naive wall-clock time against the zone's historical rules.
pub fn localize(
    naive: NaiveDateTime,
    tz: Tz,
    dst_choice: Option<DstChoice>,
) -> Result<DateTime<Tz>, ChartError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earlier, later) => match dst_choice {
            Some(DstChoice::Earlier) => Ok(earlier),
            Some(DstChoice::Later) => Ok(later),
            None => Err(ChartError::AmbiguousLocalTime {
                local: naive.format("%Y-%m-%d %H:%M").to_string(),
                tz: tz.name().to_string(),
            }),
        },
        LocalResult::None => Err(ChartError::NonexistentLocalTime {
            local: naive.format("%Y-%m-%d %H:%M").to_string(),
            tz: tz.name().to_string(),
        }),
    }
}

/// Full pipeline for one wall-clock reading.
pub fn resolve_instant(
    date: NaiveDate,
    time: NaiveTime,
    tz_id: &str,
    is_approximate_time: bool,
    dst_choice: Option<DstChoice>,
) -> Result<ResolvedInstant, ChartError> {
    let tz = parse_timezone(tz_id)?;
    resolve_naive(date.and_time(time), tz, is_approximate_time, dst_choice)
}

pub fn resolve_naive(
    naive: NaiveDateTime,
    tz: Tz,
    is_approximate_time: bool,
    dst_choice: Option<DstChoice>,
) -> Result<ResolvedInstant, ChartError> {
    let local = localize(naive, tz, dst_choice)?;
    let utc = local.with_timezone(&Utc);
    let offset = local.offset();

    Ok(ResolvedInstant {
        local: naive,
        tz_id: tz.name().to_string(),
        tz_abbreviation: offset.to_string(),
        utc,
        julian_day: julian_day_from_utc(&utc),
        utc_offset: format_utc_offset(offset.fix().local_minus_utc()),
        is_dst: offset.dst_offset() != TimeDelta::zero(),
        is_approximate_time,
    })
}

/// Wall-clock reading of a UTC instant in the given zone.
pub fn to_local(utc: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    utc.with_timezone(&tz).naive_local()
}

pub fn julian_day_from_utc(utc: &DateTime<Utc>) -> f64 {
    let hour = utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;
    julian_day(utc.year(), utc.month(), utc.day(), hour)
}

/// Julian Day for a Gregorian calendar date and fractional UT hour
/// (Meeus, Astronomical Algorithms, ch. 7).
pub fn julian_day(year: i32, month: u32, day: u32, hour: f64) -> f64 {
    let (mut y, mut m) = (year as f64, month as f64);
    if month <= 2 {
        y -= 1.0;
        m += 12.0;
    }
    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y + 4716.0)).floor() + (30.6001 * (m + 1.0)).floor() + day as f64 + b - 1524.5
        + hour / 24.0
}

/// Signed `±HH:MM` string for an offset in seconds east of UTC.
pub fn format_utc_offset(seconds_east: i32) -> String {
    let sign = if seconds_east < 0 { '-' } else { '+' };
    let total_minutes = seconds_east.abs() / 60;
    format!("{sign}{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}
