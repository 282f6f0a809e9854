use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::aspects::{AspectCalculator, AspectPoint, AspectSettings};
use crate::chart::input::{validate_uncertainty, BirthInput};
use crate::chart::result::{AnglePosition, BodyPosition, ChartResult, HousesPayload};
use crate::ephemeris::{Body, EphemerisProvider, GeoLocation, RawPosition};
use crate::error::{ChartError, EphemerisError};
use crate::geo::{GeoError, PlaceResolver, TimezoneLookup};
use crate::houses::HouseSystemResolver;
use crate::time::{default_time_of_day, resolve_instant, time_of_day_policy};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Knobs shared by every chart an assembler builds.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    pub bodies: Vec<Body>,
    pub aspects: AspectSettings,
    /// Applied to each collaborator call
    pub timeout: Duration,
    /// Auto-mode window when the request does not carry one
    pub default_uncertainty_minutes: u32,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            bodies: Body::DEFAULT_SET.to_vec(),
            aspects: AspectSettings::default(),
            timeout: Duration::from_secs(15),
            default_uncertainty_minutes: 15,
        }
    }
}

impl ChartSettings {
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.bodies.is_empty() {
            return Err(ChartError::InvalidInput("no bodies requested".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ChartError::InvalidInput("timeout must be positive".to_string()));
        }
        validate_uncertainty(self.default_uncertainty_minutes)
    }
}

/// Orchestrates place lookup, time resolution, body positions, houses and
/// aspects into one [`ChartResult`].
///
/// Cheap to clone and safe to share between tasks: it holds no mutable
/// state and every query carries its own frame.
#[derive(Clone)]
pub struct ChartAssembler {
    provider: Arc<dyn EphemerisProvider>,
    places: Arc<dyn PlaceResolver>,
    timezones: Arc<dyn TimezoneLookup>,
    settings: ChartSettings,
}

impl ChartAssembler {
    pub fn new(
        provider: Arc<dyn EphemerisProvider>,
        places: Arc<dyn PlaceResolver>,
        timezones: Arc<dyn TimezoneLookup>,
        settings: ChartSettings,
    ) -> Result<Self, ChartError> {
        settings.validate()?;
        Ok(Self {
            provider,
            places,
            timezones,
            settings,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Full pipeline, including the geocoding and timezone collaborators.
    pub async fn compute(&self, input: &BirthInput) -> Result<ChartResult, ChartError> {
        input.validate()?;
        let input = input.normalized(self.settings.default_uncertainty_minutes);

        let location = match input.location {
            Some(location) => location,
            None => {
                let (city, country) = (&input.place.city, &input.place.country);
                self.with_timeout("geocoding", self.places.resolve_place(city, country))
                    .await?
            }
        };
        location.validate()?;

        let tz_id = match &input.tz_id {
            Some(tz) => tz.clone(),
            None => {
                let approx = approximate_instant(&input);
                self.with_timeout(
                    "timezone lookup",
                    self.timezones.resolve_timezone(location, approx),
                )
                .await?
            }
        };

        let assembler = self.clone();
        let timeout = self.settings.timeout;
        let task = tokio::task::spawn_blocking(move || {
            assembler.compute_resolved(&input, location, &tz_id)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                log::error!("Chart computation aborted: {join_error}");
                Err(ChartError::Internal(
                    "chart computation aborted unexpectedly".to_string(),
                ))
            }
            Err(_) => Err(EphemerisError::Timeout {
                seconds: timeout.as_secs(),
            }
            .into()),
        }
    }

    /// The synchronous part of the pipeline, once place and zone are known.
    pub fn compute_resolved(
        &self,
        input: &BirthInput,
        location: GeoLocation,
        tz_id: &str,
    ) -> Result<ChartResult, ChartError> {
        input.validate()?;
        location.validate()?;
        let input = input.normalized(self.settings.default_uncertainty_minutes);

        let (time, approximate) = time_of_day_policy(input.tob, input.house_mode)?;
        let instant = resolve_instant(input.dob, time, tz_id, approximate, input.dst_choice)?;
        log::debug!(
            "Resolved {} to {} (JD {:.6})",
            instant.local_string(),
            instant.utc_string(),
            instant.julian_day
        );

        let frame = input.zodiac;
        let mut raw_positions: Vec<RawPosition> = Vec::with_capacity(self.settings.bodies.len());
        for &body in &self.settings.bodies {
            let raw = self.provider.position(instant.julian_day, body, frame)?;
            frame.ensure_consistent(raw.frame)?;
            raw_positions.push(raw);
        }

        let window = input
            .uncertainty_minutes
            .unwrap_or(self.settings.default_uncertainty_minutes);
        let houses = HouseSystemResolver::new(self.provider.clone(), frame).resolve(
            input.house_mode,
            &instant,
            location,
            window,
            input.dst_choice,
        )?;

        let points: Vec<AspectPoint> = raw_positions
            .iter()
            .map(|raw| AspectPoint {
                body: raw.body,
                lon: raw.lon,
                speed_lon: raw.speed_lon,
            })
            .collect();
        let aspects = AspectCalculator::new(self.settings.aspects.clone()).compute(&points);

        let planets: BTreeMap<Body, BodyPosition> = raw_positions
            .iter()
            .map(|raw| (raw.body, BodyPosition::from(raw)))
            .collect();

        log::info!(
            "Chart for {} {}: {} bodies, {} houses, {} aspects",
            input.dob,
            instant.tz_id,
            planets.len(),
            houses.system,
            aspects.len()
        );

        Ok(ChartResult {
            lat: location.lat,
            lon: location.lon,
            tzid: instant.tz_id.clone(),
            datetime_local: instant.local_string(),
            datetime_utc: instant.utc_string(),
            julian_day: instant.julian_day,
            utc_offset: instant.utc_offset.clone(),
            is_dst: instant.is_dst,
            is_approximate_time: instant.is_approximate_time,
            zodiac: frame,
            house_mode: input.house_mode,
            planets,
            ascendant: AnglePosition::from_longitude(houses.ascendant),
            midheaven: houses.midheaven.map(AnglePosition::from_longitude),
            houses: HousesPayload::from_result(&houses),
            auto: houses.auto.clone(),
            aspects,
            engine_version: ENGINE_VERSION.to_string(),
            input,
        })
    }

    async fn with_timeout<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, GeoError>>,
    ) -> Result<T, ChartError> {
        match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(result) => result.map_err(|e| {
                log::warn!("{what} failed: {e}");
                ChartError::from(e)
            }),
            Err(_) => Err(ChartError::UpstreamServiceUnavailable(format!(
                "{what} did not answer within {}s",
                self.settings.timeout.as_secs()
            ))),
        }
    }
}

/// Instant handed to the timezone lookup: the birth wall time (noon when
/// unknown) read as UTC. It only selects historical zone boundaries, and
/// unlike "now" it keeps repeated computations identical.
fn approximate_instant(input: &BirthInput) -> DateTime<Utc> {
    let time = input.tob.unwrap_or_else(default_time_of_day);
    Utc.from_utc_datetime(&input.dob.and_time(time))
}
