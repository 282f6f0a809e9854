use crate::ephemeris::types::{Body, GeoLocation, HouseCusps, RawPosition};
use crate::error::EphemerisError;
use crate::frame::Frame;

/// The seam where an ephemeris library plugs in.
///
/// Implementations must be stateless with respect to the frame: the frame is
/// part of every call and the returned values must already be expressed in
/// it. This is what lets concurrent charts use different zodiacs.
pub trait EphemerisProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Geocentric ecliptic longitude and speed of `body` at `jd_ut`.
    fn position(&self, jd_ut: f64, body: Body, frame: Frame) -> Result<RawPosition, EphemerisError>;

    /// Ascendant, midheaven and quadrant (Placidus) cusps.
    ///
    /// Backends may substitute another quadrant system where Placidus is
    /// undefined; `HouseCusps::system` reports what was used.
    fn quadrant_houses(
        &self,
        jd_ut: f64,
        location: GeoLocation,
        frame: Frame,
    ) -> Result<HouseCusps, EphemerisError>;
}
