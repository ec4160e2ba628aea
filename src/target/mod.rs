pub mod client;
pub mod redact;

pub use client::{TargetClient, TargetResponse};
