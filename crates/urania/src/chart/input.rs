use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ephemeris::GeoLocation;
use crate::error::ChartError;
use crate::frame::Frame;
use crate::houses::HouseMode;
use crate::time::DstChoice;

/// Accepted range of the auto-mode uncertainty window, minutes.
pub const UNCERTAINTY_RANGE: std::ops::RangeInclusive<u32> = 1..=180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub country: String,
}

impl Place {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }
}

/// Everything a chart is computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthInput {
    pub name: Option<String>,
    pub dob: NaiveDate,
    /// Local wall-clock time of birth; `None` when unknown
    pub tob: Option<NaiveTime>,
    pub place: Place,
    /// Skips geocoding when set
    pub location: Option<GeoLocation>,
    /// Skips the timezone lookup when set
    pub tz_id: Option<String>,
    pub zodiac: Frame,
    pub house_mode: HouseMode,
    /// Auto-mode window; the configured default applies when `None`
    pub uncertainty_minutes: Option<u32>,
    /// Picks an occurrence of a repeated local hour
    pub dst_choice: Option<DstChoice>,
}

impl BirthInput {
    pub fn new(dob: NaiveDate, tob: Option<NaiveTime>, place: Place) -> Self {
        Self {
            name: None,
            dob,
            tob,
            place,
            location: None,
            tz_id: None,
            zodiac: Frame::Tropical,
            house_mode: HouseMode::Quadrant,
            uncertainty_minutes: None,
            dst_choice: None,
        }
    }

    pub fn with_location(mut self, location: GeoLocation, tz_id: impl Into<String>) -> Self {
        self.location = Some(location);
        self.tz_id = Some(tz_id.into());
        self
    }

    pub fn with_zodiac(mut self, zodiac: Frame) -> Self {
        self.zodiac = zodiac;
        self
    }

    pub fn with_house_mode(mut self, mode: HouseMode) -> Self {
        self.house_mode = mode;
        self
    }

    pub fn with_uncertainty(mut self, minutes: u32) -> Self {
        self.uncertainty_minutes = Some(minutes);
        self
    }

    pub fn with_dst_choice(mut self, choice: DstChoice) -> Self {
        self.dst_choice = Some(choice);
        self
    }

    /// Checks that do not need any collaborator.
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.location.is_none()
            && (self.place.city.trim().is_empty() || self.place.country.trim().is_empty())
        {
            return Err(ChartError::InvalidInput(
                "city and country are required when no coordinates are given".to_string(),
            ));
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(minutes) = self.uncertainty_minutes {
            validate_uncertainty(minutes)?;
        }
        Ok(())
    }

    /// Trimmed copy with the uncertainty window filled in for auto mode.
    pub fn normalized(&self, default_uncertainty: u32) -> Self {
        let mut out = self.clone();
        out.name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        out.place = Place::new(self.place.city.trim(), self.place.country.trim());
        out.tz_id = self.tz_id.as_deref().map(|tz| tz.trim().to_string());
        out.uncertainty_minutes = match self.house_mode {
            HouseMode::Auto => Some(self.uncertainty_minutes.unwrap_or(default_uncertainty)),
            _ => None,
        };
        out
    }
}

pub fn validate_uncertainty(minutes: u32) -> Result<(), ChartError> {
    if UNCERTAINTY_RANGE.contains(&minutes) {
        Ok(())
    } else {
        Err(ChartError::InvalidInput(format!(
            "time uncertainty {minutes} minutes is outside {}..={}",
            UNCERTAINTY_RANGE.start(),
            UNCERTAINTY_RANGE.end()
        )))
    }
}

fn default_zodiac() -> String {
    "Tropical".to_string()
}

fn default_house_system() -> String {
    "Placidus".to_string()
}

fn default_mode() -> String {
    "manual".to_string()
}

/// Wire shape of a compute request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// `YYYY-MM-DD`
    pub dob: String,
    /// `HH:MM`, optional
    #[serde(default)]
    pub tob: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// `Tropical` or `Sidereal(Lahiri)`
    #[serde(default = "default_zodiac")]
    pub zodiac: String,
    /// `Placidus` or `WholeSign`
    #[serde(default = "default_house_system")]
    pub house_system: String,
    /// `manual` or `auto`
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub time_uncertainty_minutes: Option<u32>,
    #[serde(default)]
    pub dst: Option<DstChoice>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tz: Option<String>,
}

impl TryFrom<ComputeRequest> for BirthInput {
    type Error = ChartError;

    fn try_from(req: ComputeRequest) -> Result<Self, Self::Error> {
        BirthInput::from_request(&req)
    }
}

impl BirthInput {
    pub fn from_request(req: &ComputeRequest) -> Result<Self, ChartError> {
        let dob = parse_date(&req.dob)?;
        let tob = req
            .tob
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(parse_time)
            .transpose()?;

        let house_mode = match req.mode.trim().to_lowercase().as_str() {
            "auto" => HouseMode::Auto,
            "manual" | "" => req.house_system.parse()?,
            other => {
                return Err(ChartError::InvalidInput(format!(
                    "unknown mode '{other}', expected manual or auto"
                )))
            }
        };

        let location = match (req.lat, req.lon) {
            (Some(lat), Some(lon)) => Some(GeoLocation::new(lat, lon)?),
            (None, None) => None,
            _ => {
                return Err(ChartError::InvalidInput(
                    "lat and lon must be given together".to_string(),
                ))
            }
        };

        Ok(Self {
            name: req.name.clone(),
            dob,
            tob,
            place: Place::new(req.city.clone(), req.country.clone()),
            location,
            tz_id: req.tz.clone(),
            zodiac: req.zodiac.parse()?,
            house_mode,
            uncertainty_minutes: req.time_uncertainty_minutes,
            dst_choice: req.dst,
        })
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ChartError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ChartError::InvalidInput(format!("date '{s}' is not YYYY-MM-DD: {e}")))
}

/// `HH:MM` or `HH:MM:SS`
pub fn parse_time(s: &str) -> Result<NaiveTime, ChartError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| ChartError::InvalidInput(format!("time '{s}' is not HH:MM: {e}")))
}
