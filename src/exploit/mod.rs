pub mod adapt;
pub mod articulate;
pub mod chain;
pub mod engine;
pub mod failure;

pub use engine::ExploitEngine;
