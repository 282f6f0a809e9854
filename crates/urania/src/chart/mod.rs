pub mod assembler;
pub mod input;
pub mod result;

pub use assembler::{ChartAssembler, ChartSettings, ENGINE_VERSION};
pub use input::{BirthInput, ComputeRequest, Place};
pub use result::{AnglePosition, BodyPosition, ChartResult, HousesPayload};
