//! Model Invocation Core (MIC): a provider-agnostic runtime for LLM chat
//! completions, streaming, tool execution, structured output, and retry/
//! fallback across models.

#[path = "mic/config.rs"]
pub mod config;
#[path = "mic/content.rs"]
pub mod content;
#[path = "mic/error.rs"]
pub mod error;
#[path = "mic/format.rs"]
pub mod format;
#[path = "mic/message.rs"]
pub mod message;
#[path = "mic/model.rs"]
pub mod model;
#[path = "mic/params.rs"]
pub mod params;
#[path = "mic/provider.rs"]
pub mod provider;
#[path = "mic/providers/mod.rs"]
pub mod providers;
#[path = "mic/response.rs"]
pub mod response;
#[path = "mic/retry.rs"]
pub mod retry;
#[path = "mic/streaming.rs"]
pub mod streaming;
#[path = "mic/tool.rs"]
pub mod tool;
#[path = "mic/trace.rs"]
pub mod trace;

// Re-exporting the most commonly used items for easier external access.
pub use error::{ErrorKind, MicError, MicResult};
pub use format::{Format, FormatMode};
pub use message::{AssistantPart, FinishReason, Message, Usage, UserPart};
pub use model::{CallContent, CallOverrides, Model, ModelIdentifier};
pub use params::{Params, ThinkingConfig, ThinkingLevel};
pub use provider::{register_provider, reset_provider_registry, resolve_provider, CallRequest, DecodedCall, Provider};
pub use response::{ContextResponse, ContextStreamResponse, Response, StreamResponse};
pub use retry::{with_model, Orchestrator, RetryFailure, RetryPolicy};
pub use streaming::{ProviderStreamEvent, StreamResponseChunk};
pub use tool::{ContextToolkit, Tool, ToolCallRequest, ToolOutput, Toolkit, ToolSchema};
pub use trace::{NoopTraceHook, TraceHook};

/// Register the built-in Anthropic/OpenAI/Google providers against the
/// process-wide registry, each resolving its credential from the
/// conventional environment variable. Convenience for callers
/// that don't need bespoke credential lookups or base URLs.
pub fn register_default_providers() {
    use providers::{AnthropicProvider, GoogleProvider, OpenAiProvider};
    register_provider(std::sync::Arc::new(AnthropicProvider::new(config::env_credential_lookup("ANTHROPIC_API_KEY"))));
    register_provider(std::sync::Arc::new(OpenAiProvider::new(config::env_credential_lookup("OPENAI_API_KEY"))));
    register_provider(std::sync::Arc::new(GoogleProvider::new(config::env_credential_lookup("GOOGLE_API_KEY"))));
}
