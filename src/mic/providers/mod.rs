//! Provider adapters implementing the contract in [`crate::provider`].

pub mod anthropic;
pub mod common;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
