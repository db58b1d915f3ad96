//! The Provider Adapter Protocol: the contract every
//! provider (Anthropic, OpenAI, Google) implements, plus the process-wide
//! registry that resolves a [`crate::model::Model`]'s identifier to a
//! concrete adapter.
//!
//! Generalizes a single `send_message`-style method into a four-operation
//! contract (call, stream, and their context-aware variants), each
//! returning the normalized `Response`/`StreamResponse` types instead of a
//! flat string.

use crate::error::MicError;
use crate::format::FormatSpec;
use crate::message::{FinishReason, Message, Usage};
use crate::params::Params;
use crate::streaming::ProviderStreamEvent;
use crate::tool::ToolSchema;
use async_trait::async_trait;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use futures_util::Stream;

/// The normalized request every provider operation accepts.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// The provider's own model name (`provider/` prefix and `:api_selector`
    /// suffix already stripped by [`crate::model::ModelIdentifier`]).
    pub model_name: String,
    /// The full identifier, preserved for error messages and `rawMessage`
    /// round-trip checks.
    pub model_id: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub format: Option<FormatSpec>,
    pub params: Params,
}

/// What a non-streaming `call`/`context_call` decodes into.
#[derive(Debug, Clone)]
pub struct DecodedCall {
    pub assistant_message: Message,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

pub type RawEventStream = Pin<Box<dyn Stream<Item = Result<ProviderStreamEvent, MicError>> + Send>>;

/// The contract every provider implements.
///
/// `call`/`stream` take no ambient context; `context_call`/`context_stream`
/// are the context-threading counterparts used by [`crate::tool::ContextToolkit`]
/// consumers. A default implementation of the context variants is provided
/// for providers that have no use for context (the overwhelming majority);
/// override only when a provider genuinely needs to thread one through.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The provider identifier this adapter answers to, e.g. `"anthropic"`.
    fn provider_id(&self) -> &str;

    /// Whether this provider's models can enforce [`crate::format::FormatMode::Strict`]
    /// for the given provider model name.
    fn supports_strict_mode(&self, model_name: &str) -> bool;

    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError>;

    async fn stream(&self, request: CallRequest) -> Result<RawEventStream, MicError>;

    async fn context_call<'a>(&self, request: CallRequest, _ctx: &'a (dyn std::any::Any + Send + Sync)) -> Result<DecodedCall, MicError> {
        self.call(request).await
    }

    async fn context_stream<'a>(
        &self,
        request: CallRequest,
        _ctx: &'a (dyn std::any::Any + Send + Sync),
    ) -> Result<RawEventStream, MicError> {
        self.stream(request).await
    }
}

/// The process-wide provider registry.
///
/// Writes (`register`/`reset`) are rare configuration-time operations and are
/// serialized by an `RwLock`, leaving reads (provider resolution on every
/// call) to run uncontended.
static REGISTRY: std::sync::OnceLock<RwLock<HashMap<String, Arc<dyn Provider>>>> = std::sync::OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, Arc<dyn Provider>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a provider under its `provider_id()`, replacing any prior
/// registration for that id. Configuration-time only.
pub fn register_provider(provider: Arc<dyn Provider>) {
    let id = provider.provider_id().to_string();
    registry().write().expect("provider registry poisoned").insert(id, provider);
}

/// Resolve the provider registered for `provider_id`, or
/// [`MicError::NoRegisteredProvider`] if none is.
pub fn resolve_provider(provider_id: &str) -> Result<Arc<dyn Provider>, MicError> {
    registry()
        .read()
        .expect("provider registry poisoned")
        .get(provider_id)
        .cloned()
        .ok_or_else(|| MicError::NoRegisteredProvider { provider_id: provider_id.to_string() })
}

/// Clear every registered provider. Test/teardown use only.
pub fn reset_provider_registry() {
    registry().write().expect("provider registry poisoned").clear();
}
