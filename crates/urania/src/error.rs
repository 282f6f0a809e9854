use thiserror::Error;

/// Failures from the ephemeris backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("Julian day {jd} is outside the supported range {min}..{max}")]
    OutOfRange { jd: f64, min: f64, max: f64 },
    #[error("Failed to calculate position for {body}: {message}")]
    CalculationFailed { body: String, message: String },
    #[error("House calculation failed: {message}")]
    HouseCalculationFailed { message: String },
    #[error("Ephemeris file not found at path: {path}")]
    FileNotFound { path: String },
    #[error("Ephemeris computation did not finish within {seconds}s")]
    Timeout { seconds: u64 },
}

/// Every way a chart computation can fail.
///
/// The first block are caller errors (bad input, unknown place, ambiguous
/// clock time). `EphemerisUnavailable`, `UpstreamServiceUnavailable` and
/// `Internal` mean the service itself could not answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("place not found: {0}")]
    PlaceNotFound(String),
    #[error("timezone not found: {0}")]
    TimezoneNotFound(String),
    #[error("local time {local} is ambiguous in {tz}; specify the earlier or later occurrence")]
    AmbiguousLocalTime { local: String, tz: String },
    #[error("local time {local} does not exist in {tz} (skipped by a DST transition)")]
    NonexistentLocalTime { local: String, tz: String },
    #[error("a birth time is required for the {0} house system")]
    MissingBirthTimeForQuadrant(String),
    #[error("inconsistent zodiac frame: chart uses {expected}, got {found}")]
    InconsistentFrame { expected: String, found: String },
    #[error("ephemeris unavailable: {0}")]
    EphemerisUnavailable(#[from] EphemerisError),
    #[error("upstream service unavailable: {0}")]
    UpstreamServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChartError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::InvalidInput(_) => "invalid_input",
            ChartError::PlaceNotFound(_) => "place_not_found",
            ChartError::TimezoneNotFound(_) => "timezone_not_found",
            ChartError::AmbiguousLocalTime { .. } => "ambiguous_local_time",
            ChartError::NonexistentLocalTime { .. } => "nonexistent_local_time",
            ChartError::MissingBirthTimeForQuadrant(_) => "missing_birth_time_for_quadrant",
            ChartError::InconsistentFrame { .. } => "inconsistent_frame",
            ChartError::EphemerisUnavailable(_) => "ephemeris_unavailable",
            ChartError::UpstreamServiceUnavailable(_) => "upstream_service_unavailable",
            ChartError::Internal(_) => "internal",
        }
    }

    /// True when the request itself was the problem.
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            ChartError::EphemerisUnavailable(_)
                | ChartError::UpstreamServiceUnavailable(_)
                | ChartError::Internal(_)
        )
    }
}
