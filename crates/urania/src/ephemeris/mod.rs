pub mod analytic;
pub mod provider;
pub mod sphere;
#[cfg(feature = "swisseph")]
pub mod swiss;
pub mod types;

pub use analytic::AnalyticEphemeris;
pub use provider::EphemerisProvider;
#[cfg(feature = "swisseph")]
pub use swiss::SwissEphemeris;
pub use types::*;
