//! The `Model` facade: binds a model identifier, default
//! params, toolkit, and format; dispatches to whatever provider is
//! registered for that identifier's prefix.
//!
//! Generalizes the per-client constructor pattern (bind a model string to a
//! concrete client) into a single facade that resolves its provider
//! dynamically via the registry in [`crate::provider`] instead of being
//! hand-written per provider.

use crate::error::MicError;
use crate::format::FormatSpec;
use crate::message::{Message, UserPart};
use crate::params::Params;
use crate::provider::{self, CallRequest};
use crate::response::{ContextResponse, ContextStreamResponse, Response, StreamResponse};
use crate::tool::{ContextToolkit, Toolkit, ToolSchema};
use std::sync::Arc;

/// A validated `<provider>/<model>(:<api_selector>)?` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIdentifier {
    full: String,
    provider_id: String,
    model_name: String,
    api_selector: Option<String>,
}

impl ModelIdentifier {
    /// Parse and validate `identifier` against the grammar
    /// `provider_id "/" model_name (":" api_selector)?` where `provider_id`
    /// matches `^[a-z][a-z0-9-]*$` and `model_name` matches `^[A-Za-z0-9._-]+$`.
    pub fn parse(identifier: &str) -> Result<Self, MicError> {
        let (provider_part, rest) = identifier.split_once('/').ok_or_else(|| MicError::InvalidModelIdentifier {
            identifier: identifier.to_string(),
            reason: "missing '/' separating provider from model name".to_string(),
        })?;
        if !is_valid_provider_id(provider_part) {
            return Err(MicError::InvalidModelIdentifier {
                identifier: identifier.to_string(),
                reason: format!("provider id '{}' must match ^[a-z][a-z0-9-]*$", provider_part),
            });
        }
        let (model_part, api_selector) = match rest.split_once(':') {
            Some((model, selector)) => (model, Some(selector.to_string())),
            None => (rest, None),
        };
        if !is_valid_model_name(model_part) {
            return Err(MicError::InvalidModelIdentifier {
                identifier: identifier.to_string(),
                reason: format!("model name '{}' must match ^[A-Za-z0-9._-]+$", model_part),
            });
        }
        Ok(ModelIdentifier {
            full: identifier.to_string(),
            provider_id: provider_part.to_string(),
            model_name: model_part.to_string(),
            api_selector,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// The provider's native model name, with the `<provider>/` prefix and
    /// any `:api_selector` suffix already stripped.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn api_selector(&self) -> Option<&str> {
        self.api_selector.as_deref()
    }
}

fn is_valid_provider_id(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_model_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}

/// Content acceptable to [`Model::call`]/[`Model::stream`]: a bare string or
/// a list of user parts becomes a single `user{...}` message; an explicit
/// message sequence is used as-is.
pub enum CallContent {
    Text(String),
    UserParts(Vec<UserPart>),
    Messages(Vec<Message>),
}

impl From<&str> for CallContent {
    fn from(s: &str) -> Self {
        CallContent::Text(s.to_string())
    }
}

impl From<String> for CallContent {
    fn from(s: String) -> Self {
        CallContent::Text(s)
    }
}

impl From<Vec<UserPart>> for CallContent {
    fn from(parts: Vec<UserPart>) -> Self {
        CallContent::UserParts(parts)
    }
}

impl From<Vec<Message>> for CallContent {
    fn from(messages: Vec<Message>) -> Self {
        CallContent::Messages(messages)
    }
}

fn normalize_content(content: CallContent) -> Vec<Message> {
    match content {
        CallContent::Text(text) => vec![Message::user_text(text)],
        CallContent::UserParts(parts) => vec![Message::user(parts)],
        CallContent::Messages(messages) => messages,
    }
}

/// Per-call overrides merged over a [`Model`]'s defaults.
#[derive(Default)]
pub struct CallOverrides {
    pub tools: Option<Vec<ToolSchema>>,
    pub format: Option<FormatSpec>,
    pub params: Option<Params>,
}

/// The user-visible `Model` value: a model identifier plus its default
/// params, toolkit, and response format.
#[derive(Clone)]
pub struct Model {
    pub id: ModelIdentifier,
    pub params: Params,
    pub toolkit: Option<Arc<Toolkit>>,
    pub format: Option<FormatSpec>,
}

impl Model {
    pub fn new(identifier: &str) -> Result<Self, MicError> {
        Ok(Model { id: ModelIdentifier::parse(identifier)?, params: Params::new(), toolkit: None, format: None })
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_toolkit(mut self, toolkit: Toolkit) -> Self {
        self.toolkit = Some(Arc::new(toolkit));
        self
    }

    pub fn with_format(mut self, format: FormatSpec) -> Self {
        self.format = Some(format);
        self
    }

    fn resolve_tools(&self, overrides: &CallOverrides) -> Vec<ToolSchema> {
        if let Some(tools) = &overrides.tools {
            return tools.clone();
        }
        self.toolkit.as_ref().map(|t| t.schemas()).unwrap_or_default()
    }

    fn resolve_format(&self, overrides: &CallOverrides) -> Option<FormatSpec> {
        overrides.format.clone().or_else(|| self.format.clone())
    }

    fn resolve_params(&self, overrides: &CallOverrides) -> Params {
        match &overrides.params {
            Some(p) => self.params.merged_with(p),
            None => self.params.clone(),
        }
    }

    fn build_request(&self, content: CallContent, overrides: &CallOverrides) -> CallRequest {
        // `tools` carries only the caller's/toolkit's own tool schemas; each
        // provider adapter appends the format's synthetic tool itself, since
        // it also needs `tools.is_empty()` to decide `tool_choice`/
        // `toolConfig` before the synthetic tool is added.
        let tools = self.resolve_tools(overrides);
        let format = self.resolve_format(overrides);
        CallRequest {
            model_name: self.id.model_name().to_string(),
            model_id: self.id.as_str().to_string(),
            messages: normalize_content(content),
            tools,
            format,
            params: self.resolve_params(overrides),
        }
    }

    /// Resolve this model's provider from the process-wide registry.
    pub fn provider(&self) -> Result<Arc<dyn provider::Provider>, MicError> {
        provider::resolve_provider(self.id.provider_id())
    }

    pub async fn call(&self, content: impl Into<CallContent>, overrides: CallOverrides) -> Result<Response, MicError> {
        let provider = self.provider()?;
        let request = self.build_request(content.into(), &overrides);
        let input_messages = request.messages.clone();
        let decoded = provider.call(request).await?;
        Ok(Response::new(self.clone(), input_messages, decoded))
    }

    pub async fn stream(&self, content: impl Into<CallContent>, overrides: CallOverrides) -> Result<StreamResponse, MicError> {
        let provider = self.provider()?;
        let request = self.build_request(content.into(), &overrides);
        let input_messages = request.messages.clone();
        let raw_stream = provider.stream(request).await?;
        Ok(StreamResponse::new(self.clone(), input_messages, raw_stream))
    }

    /// Like [`Model::call`], but threads `ctx` through to the provider's
    /// `context_call` and carries `toolkit` forward so the returned
    /// [`ContextResponse::execute_tools`] can dispatch with that context.
    /// `overrides.tools` defaults to the context toolkit's schemas when unset.
    pub async fn context_call<Ctx: Send + Sync + 'static>(
        &self,
        content: impl Into<CallContent>,
        mut overrides: CallOverrides,
        ctx: Arc<Ctx>,
        toolkit: Arc<dyn ContextToolkit<Ctx>>,
    ) -> Result<ContextResponse<Ctx>, MicError> {
        if overrides.tools.is_none() {
            overrides.tools = Some(toolkit.schemas());
        }
        let provider = self.provider()?;
        let request = self.build_request(content.into(), &overrides);
        let input_messages = request.messages.clone();
        let decoded = provider.context_call(request, ctx.as_ref()).await?;
        let response = Response::new(self.clone(), input_messages, decoded);
        Ok(ContextResponse { response, ctx, toolkit })
    }

    /// Like [`Model::stream`], but threads `ctx` through to the provider's
    /// `context_stream` and carries `toolkit` forward for the returned
    /// [`ContextStreamResponse::execute_tools`].
    pub async fn context_stream<Ctx: Send + Sync + 'static>(
        &self,
        content: impl Into<CallContent>,
        mut overrides: CallOverrides,
        ctx: Arc<Ctx>,
        toolkit: Arc<dyn ContextToolkit<Ctx>>,
    ) -> Result<ContextStreamResponse<Ctx>, MicError> {
        if overrides.tools.is_none() {
            overrides.tools = Some(toolkit.schemas());
        }
        let provider = self.provider()?;
        let request = self.build_request(content.into(), &overrides);
        let input_messages = request.messages.clone();
        let raw_stream = provider.context_stream(request, ctx.as_ref()).await?;
        let stream = StreamResponse::new(self.clone(), input_messages, raw_stream);
        Ok(ContextStreamResponse { stream, ctx, toolkit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_model_and_api_selector() {
        let id = ModelIdentifier::parse("openai/gpt-4o:responses").unwrap();
        assert_eq!(id.provider_id(), "openai");
        assert_eq!(id.model_name(), "gpt-4o");
        assert_eq!(id.api_selector(), Some("responses"));
    }

    #[test]
    fn parses_identifier_without_api_selector() {
        let id = ModelIdentifier::parse("anthropic/claude-sonnet-4-5").unwrap();
        assert_eq!(id.provider_id(), "anthropic");
        assert_eq!(id.model_name(), "claude-sonnet-4-5");
        assert_eq!(id.api_selector(), None);
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(ModelIdentifier::parse("gpt-4o").is_err());
    }

    #[test]
    fn rejects_uppercase_provider_id() {
        assert!(ModelIdentifier::parse("OpenAI/gpt-4o").is_err());
    }

    #[test]
    fn rejects_invalid_model_name_characters() {
        assert!(ModelIdentifier::parse("openai/gpt 4o").is_err());
    }
}
