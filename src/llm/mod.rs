pub mod provider;
pub mod anthropic;
pub mod openai;
pub mod gemini;
pub mod openrouter;
pub mod local;
pub mod router;
pub mod types;
pub mod catalog;
pub mod gateway;

pub use provider::LLMProvider;
pub use router::create_provider;
pub use types::LLMResponse;
pub use gateway::{LlmGateway, LlmRole};
