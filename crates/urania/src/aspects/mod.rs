pub mod calculator;
pub mod types;

pub use calculator::{AspectCalculator, AspectPoint};
pub use types::{Aspect, AspectKind, AspectSettings};
