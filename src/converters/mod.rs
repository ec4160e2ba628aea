pub mod registry;
pub mod chain;
pub mod transforms;

pub use registry::{ConverterCategory, ConverterDef};
pub use chain::{ConverterChain, StepRecord};
