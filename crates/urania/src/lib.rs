//! Natal chart engine.
//!
//! Civil birth data goes in, a canonical [`ChartResult`] comes out:
//!
//! 1. [`time`] turns a wall-clock time and IANA zone into a UTC instant and
//!    Julian Day, refusing ambiguous or skipped local times.
//! 2. [`frame`] fixes the zodiac (tropical or sidereal) for the whole chart.
//! 3. An [`EphemerisProvider`] places each body in that frame.
//! 4. [`houses`] resolves quadrant, whole-sign or auto houses.
//! 5. [`chart::ChartAssembler`] sequences it all and rounds the output.

pub mod aspects;
pub mod chart;
pub mod ephemeris;
pub mod error;
pub mod frame;
pub mod geo;
pub mod houses;
pub mod render;
pub mod time;
pub mod zodiac;

pub use chart::{BirthInput, ChartAssembler, ChartResult, ChartSettings, ComputeRequest, Place};
pub use ephemeris::{AnalyticEphemeris, Body, EphemerisProvider, GeoLocation};
pub use error::{ChartError, EphemerisError};
pub use frame::{Ayanamsha, Frame};
pub use houses::{HouseMode, HouseSystemResolver};
pub use time::{DstChoice, ResolvedInstant};
pub use zodiac::ZodiacSign;
