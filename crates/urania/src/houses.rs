//! House system resolution.
//!
//! Three modes share one resolver:
//! - `Quadrant`: Placidus cusps from the backend; needs an exact time.
//! - `WholeSign`: house 1 is the whole sign holding the ascendant, or the
//!   Sun when the birth time was defaulted ("solar" whole-sign).
//! - `Auto`: probe the ascendant sign at the edges of the time uncertainty
//!   window and delegate to one of the other two.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::ephemeris::{Body, EphemerisProvider, GeoLocation, HouseSystemName};
use crate::error::ChartError;
use crate::frame::Frame;
use crate::time::{parse_timezone, resolve_naive, DstChoice, ResolvedInstant};
use crate::zodiac::{normalize_deg, sign_index, ZodiacSign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HouseMode {
    Quadrant,
    WholeSign,
    Auto,
}

impl HouseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HouseMode::Quadrant => "quadrant",
            HouseMode::WholeSign => "whole-sign",
            HouseMode::Auto => "auto",
        }
    }
}

impl fmt::Display for HouseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HouseMode {
    type Err = ChartError;

    /// Also accepts the house system names `Placidus` and `WholeSign`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "quadrant" | "placidus" => Ok(HouseMode::Quadrant),
            "whole-sign" | "wholesign" => Ok(HouseMode::WholeSign),
            "auto" => Ok(HouseMode::Auto),
            _ => Err(ChartError::InvalidInput(format!(
                "unknown house system '{s}', expected quadrant, whole-sign or auto"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoReason {
    AscSignStable,
    AscSignChangesWithinWindow,
}

/// What auto mode saw and what it chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDiagnostic {
    pub asc_sign_minus: ZodiacSign,
    pub asc_sign_plus: ZodiacSign,
    pub window_minutes: u32,
    pub reason: AutoReason,
    pub mode_final: HouseMode,
    /// Local wall-clock time of each probe
    pub probe_minus_local: String,
    pub probe_plus_local: String,
}

/// Ascendant, midheaven and cusps before output rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseSystemResult {
    pub ascendant: f64,
    /// `None` for solar whole-sign charts
    pub midheaven: Option<f64>,
    pub cusps: [f64; 12],
    pub system: HouseSystemName,
    pub approximate: bool,
    pub auto: Option<AutoDiagnostic>,
}

/// Auto-mode decision rule.
pub fn decide_auto(minus: ZodiacSign, plus: ZodiacSign) -> (HouseMode, AutoReason) {
    if minus == plus {
        (HouseMode::Quadrant, AutoReason::AscSignStable)
    } else {
        (HouseMode::WholeSign, AutoReason::AscSignChangesWithinWindow)
    }
}

/// `cusp[k] = (anchor * 30 + k * 30) mod 360`
pub fn whole_sign_cusps(anchor: ZodiacSign) -> [f64; 12] {
    let base = anchor.index() as f64 * 30.0;
    std::array::from_fn(|k| normalize_deg(base + k as f64 * 30.0))
}

/// Resolves houses for one chart in one frame.
#[derive(Clone)]
pub struct HouseSystemResolver {
    provider: Arc<dyn EphemerisProvider>,
    frame: Frame,
}

impl HouseSystemResolver {
    pub fn new(provider: Arc<dyn EphemerisProvider>, frame: Frame) -> Self {
        Self { provider, frame }
    }

    pub fn resolve(
        &self,
        mode: HouseMode,
        instant: &ResolvedInstant,
        location: GeoLocation,
        window_minutes: u32,
        dst_choice: Option<DstChoice>,
    ) -> Result<HouseSystemResult, ChartError> {
        match mode {
            HouseMode::Quadrant => self.quadrant(instant, location),
            HouseMode::WholeSign => self.whole_sign(instant, location),
            HouseMode::Auto => self.auto(instant, location, window_minutes, dst_choice),
        }
    }

    pub fn quadrant(
        &self,
        instant: &ResolvedInstant,
        location: GeoLocation,
    ) -> Result<HouseSystemResult, ChartError> {
        if instant.is_approximate_time {
            return Err(ChartError::MissingBirthTimeForQuadrant(
                HouseMode::Quadrant.to_string(),
            ));
        }
        let houses = self.provider.quadrant_houses(instant.julian_day, location, self.frame)?;
        self.frame.ensure_consistent(houses.frame)?;

        Ok(HouseSystemResult {
            ascendant: houses.ascendant,
            midheaven: Some(houses.midheaven),
            cusps: houses.cusps,
            system: houses.system,
            approximate: false,
            auto: None,
        })
    }

    pub fn whole_sign(
        &self,
        instant: &ResolvedInstant,
        location: GeoLocation,
    ) -> Result<HouseSystemResult, ChartError> {
        if instant.is_approximate_time {
            return self.solar_whole_sign(instant);
        }

        // Only the ascendant's sign survives; its degree is reported as is.
        let quadrant = self.quadrant(instant, location)?;
        let anchor = ZodiacSign::from_longitude(quadrant.ascendant);

        Ok(HouseSystemResult {
            ascendant: quadrant.ascendant,
            midheaven: quadrant.midheaven,
            cusps: whole_sign_cusps(anchor),
            system: HouseSystemName::WholeSign,
            approximate: false,
            auto: None,
        })
    }

    /// No real ascendant exists without a birth time: house 1 starts at 0°
    /// of the Sun's sign at the defaulted time.
    fn solar_whole_sign(&self, instant: &ResolvedInstant) -> Result<HouseSystemResult, ChartError> {
        let sun = self
            .provider
            .position(instant.julian_day, Body::Sun, self.frame)?;
        self.frame.ensure_consistent(sun.frame)?;
        let anchor = ZodiacSign::from_longitude(sun.lon);
        log::debug!("Solar whole-sign chart anchored on {anchor}");

        let cusps = whole_sign_cusps(anchor);
        Ok(HouseSystemResult {
            ascendant: cusps[0],
            midheaven: None,
            cusps,
            system: HouseSystemName::WholeSign,
            approximate: true,
            auto: None,
        })
    }

    pub fn auto(
        &self,
        instant: &ResolvedInstant,
        location: GeoLocation,
        window_minutes: u32,
        dst_choice: Option<DstChoice>,
    ) -> Result<HouseSystemResult, ChartError> {
        if instant.is_approximate_time {
            return Err(ChartError::MissingBirthTimeForQuadrant(
                HouseMode::Auto.to_string(),
            ));
        }

        let window = Duration::minutes(i64::from(window_minutes));
        let (minus_local, asc_minus) =
            self.probe_ascendant_sign(instant, location, -window, dst_choice)?;
        let (plus_local, asc_plus) =
            self.probe_ascendant_sign(instant, location, window, dst_choice)?;

        let (mode_final, reason) = decide_auto(asc_minus, asc_plus);
        log::info!(
            "Auto houses: ascendant {asc_minus} at -{window_minutes}m, {asc_plus} at +{window_minutes}m -> {mode_final}"
        );

        let mut result = match mode_final {
            HouseMode::WholeSign => self.whole_sign(instant, location)?,
            _ => self.quadrant(instant, location)?,
        };
        result.auto = Some(AutoDiagnostic {
            asc_sign_minus: asc_minus,
            asc_sign_plus: asc_plus,
            window_minutes,
            reason,
            mode_final,
            probe_minus_local: minus_local,
            probe_plus_local: plus_local,
        });
        Ok(result)
    }

    /// Shift the wall clock, not the UTC instant: a probe that crosses a DST
    /// change is localized again against the zone rules.
    fn probe_ascendant_sign(
        &self,
        center: &ResolvedInstant,
        location: GeoLocation,
        shift: Duration,
        dst_choice: Option<DstChoice>,
    ) -> Result<(String, ZodiacSign), ChartError> {
        let tz = parse_timezone(&center.tz_id)?;
        let naive = center.local + shift;
        let probe = resolve_naive(naive, tz, false, dst_choice)?;
        let houses = self.provider.quadrant_houses(probe.julian_day, location, self.frame)?;
        self.frame.ensure_consistent(houses.frame)?;
        Ok((probe.local_string(), ZodiacSign::from_index(sign_index(houses.ascendant))))
    }
}
