//! Place and timezone lookup collaborators.
//!
//! The engine only sees the two traits. [`GoogleMapsClient`] talks to the
//! Google geocoding and time zone APIs; [`StaticPlaces`] answers from an
//! in-memory table for offline use and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::ephemeris::GeoLocation;
use crate::error::ChartError;
use crate::zodiac::angular_distance;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const TIMEZONE_URL: &str = "https://maps.googleapis.com/maps/api/timezone/json";
const USER_AGENT: &str = concat!("urania/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("no match for '{0}'")]
    PlaceNotFound(String),
    #[error("no timezone for {lat},{lon}")]
    TimezoneNotFound { lat: f64, lon: f64 },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("service answered {status}: {message}")]
    Api { status: String, message: String },
}

impl From<GeoError> for ChartError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::PlaceNotFound(q) => ChartError::PlaceNotFound(q),
            e @ GeoError::TimezoneNotFound { .. } => ChartError::TimezoneNotFound(e.to_string()),
            e => ChartError::UpstreamServiceUnavailable(e.to_string()),
        }
    }
}

/// `resolve(city, country) -> (lat, lon)`
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve_place(&self, city: &str, country: &str) -> Result<GeoLocation, GeoError>;
}

/// `resolve(lat, lon, approx_instant) -> IANA id`
///
/// The instant only selects which historical zone boundaries apply; it
/// never affects the offset used for the chart.
#[async_trait]
pub trait TimezoneLookup: Send + Sync {
    async fn resolve_timezone(
        &self,
        location: GeoLocation,
        approx: DateTime<Utc>,
    ) -> Result<String, GeoError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimezoneResponse {
    status: String,
    time_zone_id: Option<String>,
    error_message: Option<String>,
}

/// Google Maps geocoding + time zone client.
pub struct GoogleMapsClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PlaceResolver for GoogleMapsClient {
    async fn resolve_place(&self, city: &str, country: &str) -> Result<GeoLocation, GeoError> {
        let query = format!("{}, {}", city.trim(), country.trim());
        log::debug!("Geocoding '{query}'");

        let response = self
            .http_client
            .get(GEOCODE_URL)
            .query(&[("address", query.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;
        let body: GeocodeResponse = response.json().await?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GeoError::PlaceNotFound(query)),
            _ => {
                return Err(GeoError::Api {
                    status: body.status,
                    message: body.error_message.unwrap_or_default(),
                })
            }
        }

        let first = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| GeoError::PlaceNotFound(query.clone()))?;
        let loc = first.geometry.location;
        log::info!("Geocoded '{query}' to {:.4},{:.4}", loc.lat, loc.lng);
        Ok(GeoLocation {
            lat: loc.lat,
            lon: loc.lng,
        })
    }
}

#[async_trait]
impl TimezoneLookup for GoogleMapsClient {
    async fn resolve_timezone(
        &self,
        location: GeoLocation,
        approx: DateTime<Utc>,
    ) -> Result<String, GeoError> {
        let response = self
            .http_client
            .get(TIMEZONE_URL)
            .query(&[
                ("location", format!("{},{}", location.lat, location.lon)),
                ("timestamp", approx.timestamp().to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: TimezoneResponse = response.json().await?;

        match (body.status.as_str(), body.time_zone_id) {
            ("OK", Some(tz)) => Ok(tz),
            ("OK", None) | ("ZERO_RESULTS", _) => Err(GeoError::TimezoneNotFound {
                lat: location.lat,
                lon: location.lon,
            }),
            (_, _) => Err(GeoError::Api {
                status: body.status,
                message: body.error_message.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnownPlace {
    pub city: String,
    pub country: String,
    pub location: GeoLocation,
    pub tz_id: String,
}

/// In-memory gazetteer.
#[derive(Debug, Clone, Default)]
pub struct StaticPlaces {
    places: Vec<KnownPlace>,
}

/// Degrees within which a coordinate is taken to be a known place.
const MATCH_RADIUS_DEG: f64 = 0.5;

impl StaticPlaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small table of large cities.
    pub fn builtin() -> Self {
        let mut places = Self::new();
        for (city, country, lat, lon, tz) in [
            ("Ankara", "Turkey", 39.9334, 32.8597, "Europe/Istanbul"),
            ("Istanbul", "Turkey", 41.0082, 28.9784, "Europe/Istanbul"),
            ("Izmir", "Turkey", 38.4237, 27.1428, "Europe/Istanbul"),
            ("London", "United Kingdom", 51.5074, -0.1278, "Europe/London"),
            ("Berlin", "Germany", 52.5200, 13.4050, "Europe/Berlin"),
            ("Paris", "France", 48.8566, 2.3522, "Europe/Paris"),
            ("New York", "United States", 40.7128, -74.0060, "America/New_York"),
            ("Los Angeles", "United States", 34.0522, -118.2437, "America/Los_Angeles"),
            ("Mumbai", "India", 19.0760, 72.8777, "Asia/Kolkata"),
            ("Tokyo", "Japan", 35.6762, 139.6503, "Asia/Tokyo"),
            ("Sydney", "Australia", -33.8688, 151.2093, "Australia/Sydney"),
            ("Sao Paulo", "Brazil", -23.5505, -46.6333, "America/Sao_Paulo"),
            ("Reykjavik", "Iceland", 64.1466, -21.9426, "Atlantic/Reykjavik"),
            ("Tromso", "Norway", 69.6492, 18.9553, "Europe/Oslo"),
        ] {
            places = places.with_place(city, country, GeoLocation { lat, lon }, tz);
        }
        places
    }

    pub fn with_place(
        mut self,
        city: &str,
        country: &str,
        location: GeoLocation,
        tz_id: &str,
    ) -> Self {
        self.places.push(KnownPlace {
            city: city.to_string(),
            country: country.to_string(),
            location,
            tz_id: tz_id.to_string(),
        });
        self
    }

    pub fn places(&self) -> &[KnownPlace] {
        &self.places
    }

    fn find(&self, city: &str, country: &str) -> Option<&KnownPlace> {
        let (city, country) = (city.trim(), country.trim());
        self.places.iter().find(|p| {
            p.city.eq_ignore_ascii_case(city) && p.country.eq_ignore_ascii_case(country)
        })
    }

    fn nearest(&self, location: GeoLocation) -> Option<&KnownPlace> {
        let distance = |p: &KnownPlace| {
            (p.location.lat - location.lat)
                .abs()
                .max(angular_distance(p.location.lon, location.lon))
        };
        self.places
            .iter()
            .filter(|p| distance(p) <= MATCH_RADIUS_DEG)
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
    }
}

#[async_trait]
impl PlaceResolver for StaticPlaces {
    async fn resolve_place(&self, city: &str, country: &str) -> Result<GeoLocation, GeoError> {
        self.find(city, country)
            .map(|p| p.location)
            .ok_or_else(|| GeoError::PlaceNotFound(format!("{}, {}", city.trim(), country.trim())))
    }
}

#[async_trait]
impl TimezoneLookup for StaticPlaces {
    async fn resolve_timezone(
        &self,
        location: GeoLocation,
        _approx: DateTime<Utc>,
    ) -> Result<String, GeoError> {
        self.nearest(location)
            .map(|p| p.tz_id.clone())
            .ok_or(GeoError::TimezoneNotFound {
                lat: location.lat,
                lon: location.lon,
            })
    }
}
