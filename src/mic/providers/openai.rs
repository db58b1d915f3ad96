//! The OpenAI provider adapter.
//!
//! Two wire formats live behind one adapter, selected by `ModelIdentifier`'s
//! `api_selector`: the legacy Chat Completions surface
//! (`/v1/chat/completions`) by default, or the Responses surface
//! (`/v1/responses`) when the identifier carries `:responses`. The adapter
//! branches on the parsed selector rather than requiring a
//! construction-time choice.

use crate::content::MediaSource;
use crate::error::MicError;
use crate::format::FormatMode;
use crate::message::{AssistantPart, FinishReason, Message, Usage, UserPart};
use crate::provider::{CallRequest, DecodedCall, Provider, RawEventStream};
use crate::providers::common::{classify_transport_error, map_error_response, sse_data_events, SHARED_HTTP_CLIENT};
use crate::streaming::ProviderStreamEvent;
use async_trait::async_trait;
use futures_util::StreamExt;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sub-adapter selected by a model identifier's `:api_selector`.
/// `:responses` routes to the Responses API; anything else
/// (including no selector) uses Chat Completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiSurface {
    ChatCompletions,
    Responses,
}

fn select_surface(api_selector: Option<&str>) -> ApiSurface {
    match api_selector {
        Some("responses") => ApiSurface::Responses,
        _ => ApiSurface::ChatCompletions,
    }
}

/// `CallRequest` doesn't carry the parsed `api_selector` directly (it's
/// consumed into `model_name` by [`crate::model::Model`]), so the adapter
/// recovers it from the `:responses` suffix still present on `model_id`.
fn selector_for_model_id(model_id: &str) -> ApiSurface {
    select_surface(model_id.split_once(':').map(|(_, selector)| selector))
}

/// Models known to support the `strict` JSON-schema tool-calling mode.
fn model_supports_strict(model_name: &str) -> bool {
    model_name.starts_with("gpt-4o") || model_name.starts_with("gpt-4.1") || model_name.starts_with("o3") || model_name.starts_with("o4")
}

pub struct OpenAiProvider {
    api_key_lookup: crate::config::CredentialLookup,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key_lookup: crate::config::CredentialLookup) -> Self {
        OpenAiProvider { api_key_lookup, base_url: DEFAULT_BASE_URL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<String, MicError> {
        (self.api_key_lookup)().ok_or_else(|| MicError::MissingApiKey { provider: "openai".to_string() })
    }
}

fn encode_media_source_chat(source: &MediaSource) -> serde_json::Value {
    match source {
        MediaSource::Base64 { data, mime } => serde_json::json!({
            "type": "image_url", "image_url": {"url": format!("data:{};base64,{}", mime, data)}
        }),
        MediaSource::Url { url } => serde_json::json!({"type": "image_url", "image_url": {"url": url}}),
        MediaSource::Text { data, .. } => serde_json::json!({"type": "text", "text": data}),
    }
}

fn encode_user_message_chat(parts: &[UserPart]) -> Vec<serde_json::Value> {
    // OpenAI's tool results are top-level `tool` messages, not content blocks,
    // so a single `UserPart` list may expand into multiple wire messages.
    let mut messages = Vec::new();
    let mut content_blocks = Vec::new();
    for part in parts {
        match part {
            UserPart::Text { text } => content_blocks.push(serde_json::json!({"type": "text", "text": text})),
            UserPart::Image { source } => content_blocks.push(encode_media_source_chat(source)),
            UserPart::Audio { source } => content_blocks.push(encode_media_source_chat(source)),
            UserPart::Document { source } => content_blocks.push(encode_media_source_chat(source)),
            UserPart::ToolOutput { id, result, error, .. } => {
                let content = match (error, result) {
                    (Some(message), _) => message.clone(),
                    (None, crate::content::ToolOutputResult::Text(text)) => text.clone(),
                    (None, crate::content::ToolOutputResult::Value(v)) => v.to_string(),
                };
                messages.push(serde_json::json!({"role": "tool", "tool_call_id": id, "content": content}));
            }
        }
    }
    if !content_blocks.is_empty() {
        messages.insert(0, serde_json::json!({"role": "user", "content": content_blocks}));
    }
    messages
}

fn encode_assistant_message_chat(parts: &[AssistantPart]) -> serde_json::Value {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in parts {
        match part {
            AssistantPart::Text { text: t } => text.push_str(t),
            AssistantPart::Thought { .. } => {}
            AssistantPart::ToolCall { id, name, args } => tool_calls.push(serde_json::json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": args}
            })),
        }
    }
    let mut message = serde_json::json!({"role": "assistant"});
    if !text.is_empty() {
        message["content"] = serde_json::Value::String(text);
    } else {
        message["content"] = serde_json::Value::Null;
    }
    if !tool_calls.is_empty() {
        message["tool_calls"] = serde_json::Value::Array(tool_calls);
    }
    message
}

fn encode_tool_chat(tool: &crate::tool::ToolSchema) -> serde_json::Value {
    let mut function = serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    });
    if tool.strict == Some(true) {
        function["strict"] = serde_json::Value::Bool(true);
    }
    serde_json::json!({"type": "function", "function": function})
}

fn build_chat_body(request: &CallRequest) -> serde_json::Value {
    let mut wire_messages = Vec::new();
    for message in &request.messages {
        match message {
            Message::System { text } => wire_messages.push(serde_json::json!({"role": "system", "content": text})),
            Message::User { content, .. } => wire_messages.extend(encode_user_message_chat(content)),
            Message::Assistant { content, raw_message, .. } => {
                if message.can_reuse_raw("openai", &request.model_name, request.params.thinking.as_ref().map(|t| t.encode_thoughts_as_text).unwrap_or(false)) {
                    if let Some(raw) = raw_message {
                        wire_messages.push(raw.clone());
                        continue;
                    }
                }
                wire_messages.push(encode_assistant_message_chat(content));
            }
        }
    }

    let mut system_prefix = Vec::new();
    if let Some(format) = &request.format {
        if format.mode == FormatMode::Json {
            system_prefix.push(serde_json::json!({"role": "system", "content": format.json_mode_instructions()}));
        }
    }
    system_prefix.extend(wire_messages);

    let mut tools: Vec<serde_json::Value> = request.tools.iter().map(encode_tool_chat).collect();
    let mut tool_choice = None;
    if let Some(format) = &request.format {
        if matches!(format.mode, FormatMode::Tool | FormatMode::Strict) {
            tools.push(encode_tool_chat(&format.synthetic_tool()));
            tool_choice = Some(if request.tools.is_empty() {
                serde_json::json!({"type": "function", "function": {"name": crate::format::STRUCTURED_OUTPUT_TOOL_NAME}})
            } else {
                serde_json::json!("required")
            });
        }
    }
    let mut body = serde_json::json!({
        "model": request.model_name,
        "messages": system_prefix,
    });
    if !tools.is_empty() {
        body["tools"] = serde_json::Value::Array(tools);
    }
    if let Some(choice) = tool_choice {
        body["tool_choice"] = choice;
    }
    if !request.params.is_reasoning() {
        if let Some(temperature) = request.params.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(top_p) = request.params.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if !request.params.stop_sequences.is_empty() {
            body["stop"] = serde_json::json!(request.params.stop_sequences);
        }
    } else if log::log_enabled!(log::Level::Warn) {
        for key in request.params.reasoning_incompatible_keys() {
            log::warn!("openai provider: param '{}' is not supported by reasoning model {} and was dropped", key, request.model_name);
        }
    }
    if let Some(max_tokens) = request.params.max_tokens {
        body["max_completion_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(seed) = request.params.seed {
        body["seed"] = serde_json::json!(seed);
    }
    for (key, value) in &request.params.passthrough {
        body[key.as_str()] = value.clone();
    }
    body
}

fn decode_chat_response(raw: serde_json::Value, request: &CallRequest) -> DecodedCall {
    let choice = raw.get("choices").and_then(|c| c.as_array()).and_then(|a| a.first());
    let mut parts = Vec::new();
    if let Some(choice) = choice {
        if let Some(message) = choice.get("message") {
            if let Some(text) = message.get("content").and_then(|c| c.as_str()) {
                if !text.is_empty() {
                    parts.push(AssistantPart::Text { text: text.to_string() });
                }
            }
            if let Some(tool_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
                for call in tool_calls {
                    let id = call.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let function = call.get("function");
                    let name = function.and_then(|f| f.get("name")).and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let args = function.and_then(|f| f.get("arguments")).and_then(|v| v.as_str()).unwrap_or("{}").to_string();
                    parts.push(AssistantPart::ToolCall { id, name, args });
                }
            }
        }
    }
    let finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(|v| v.as_str())
        .map(FinishReason::from_provider_code)
        .unwrap_or(FinishReason::None);
    let usage = raw
        .get("usage")
        .map(|u| Usage {
            input_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            cache_read_tokens: u
                .get("prompt_tokens_details")
                .and_then(|d| d.get("cached_tokens"))
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            cache_write_tokens: 0,
            reasoning_tokens: u
                .get("completion_tokens_details")
                .and_then(|d| d.get("reasoning_tokens"))
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            raw: Some(u.clone()),
        })
        .unwrap_or_default();

    DecodedCall {
        assistant_message: Message::Assistant {
            content: parts,
            provider_id: "openai".to_string(),
            model_id: request.model_id.clone(),
            provider_model_name: request.model_name.clone(),
            raw_message: raw.get("choices").and_then(|c| c.as_array()).and_then(|a| a.first()).and_then(|c| c.get("message")).cloned(),
            name: None,
        },
        finish_reason,
        usage,
    }
}

/// Translate one Chat Completions streaming chunk into zero or more
/// [`ProviderStreamEvent`]s.
fn translate_chat_stream_event(event: &serde_json::Value) -> Vec<ProviderStreamEvent> {
    let mut out = vec![ProviderStreamEvent::Raw { raw: event.clone() }];
    let Some(choice) = event.get("choices").and_then(|c| c.as_array()).and_then(|a| a.first()) else {
        return out;
    };
    if let Some(delta) = choice.get("delta") {
        if let Some(text) = delta.get("content").and_then(|c| c.as_str()) {
            if !text.is_empty() {
                out.push(ProviderStreamEvent::TextDelta { delta: text.to_string() });
            }
        }
        if let Some(tool_calls) = delta.get("tool_calls").and_then(|t| t.as_array()) {
            for call in tool_calls {
                let index = call.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                let id = call.get("id").and_then(|v| v.as_str()).map(|s| s.to_string());
                let name = call.get("function").and_then(|f| f.get("name")).and_then(|v| v.as_str()).map(|s| s.to_string());
                let args = call.get("function").and_then(|f| f.get("arguments")).and_then(|v| v.as_str()).unwrap_or("").to_string();
                out.push(ProviderStreamEvent::ToolCallDelta { index, id, name, delta: args });
            }
        }
    }
    if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
        let usage = event.get("usage").map(|u| Usage {
            input_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            ..Default::default()
        });
        out.push(ProviderStreamEvent::Finish { code: reason.to_string(), usage });
    }
    out
}

/// Build a Responses API request body: flattens messages into the
/// `input`/`instructions` shape that surface expects.
fn build_responses_body(request: &CallRequest) -> serde_json::Value {
    let mut instructions = Vec::new();
    let mut input = Vec::new();
    for message in &request.messages {
        match message {
            Message::System { text } => instructions.push(text.clone()),
            Message::User { content, .. } => {
                for part in content {
                    match part {
                        UserPart::Text { text } => input.push(serde_json::json!({"role": "user", "content": text})),
                        UserPart::ToolOutput { id, result, error, .. } => {
                            let output = match (error, result) {
                                (Some(message), _) => message.clone(),
                                (None, crate::content::ToolOutputResult::Text(text)) => text.clone(),
                                (None, crate::content::ToolOutputResult::Value(v)) => v.to_string(),
                            };
                            input.push(serde_json::json!({"type": "function_call_output", "call_id": id, "output": output}));
                        }
                        UserPart::Image { source } => input.push(serde_json::json!({"role": "user", "content": [encode_media_source_chat(source)]})),
                        UserPart::Audio { source } | UserPart::Document { source } => {
                            input.push(serde_json::json!({"role": "user", "content": [encode_media_source_chat(source)]}))
                        }
                    }
                }
            }
            Message::Assistant { content, .. } => {
                for part in content {
                    if let AssistantPart::ToolCall { id, name, args } = part {
                        input.push(serde_json::json!({"type": "function_call", "call_id": id, "name": name, "arguments": args}));
                    } else if let AssistantPart::Text { text } = part {
                        input.push(serde_json::json!({"role": "assistant", "content": text}));
                    }
                }
            }
        }
    }
    let mut body = serde_json::json!({"model": request.model_name, "input": input});
    if !instructions.is_empty() {
        body["instructions"] = serde_json::Value::String(instructions.join("\n\n"));
    }
    if let Some(max_tokens) = request.params.max_tokens {
        body["max_output_tokens"] = serde_json::json!(max_tokens);
    }
    if !request.tools.is_empty() {
        body["tools"] = serde_json::json!(request
            .tools
            .iter()
            .map(|t| serde_json::json!({"type": "function", "name": t.name, "description": t.description, "parameters": t.parameters}))
            .collect::<Vec<_>>());
    }
    body
}

fn decode_responses_response(raw: serde_json::Value, request: &CallRequest) -> DecodedCall {
    let mut parts = Vec::new();
    if let Some(output) = raw.get("output").and_then(|o| o.as_array()) {
        for item in output {
            match item.get("type").and_then(|t| t.as_str()) {
                Some("message") => {
                    if let Some(blocks) = item.get("content").and_then(|c| c.as_array()) {
                        for block in blocks {
                            if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                                parts.push(AssistantPart::Text { text: text.to_string() });
                            }
                        }
                    }
                }
                Some("function_call") => {
                    let id = item.get("call_id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let name = item.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let args = item.get("arguments").and_then(|v| v.as_str()).unwrap_or("{}").to_string();
                    parts.push(AssistantPart::ToolCall { id, name, args });
                }
                _ => {}
            }
        }
    }
    let finish_reason = if parts.iter().any(|p| matches!(p, AssistantPart::ToolCall { .. })) {
        FinishReason::None
    } else {
        raw.get("status")
            .and_then(|v| v.as_str())
            .map(|s| if s == "incomplete" { FinishReason::MaxTokens } else { FinishReason::None })
            .unwrap_or(FinishReason::None)
    };
    let usage = raw
        .get("usage")
        .map(|u| Usage {
            input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            ..Default::default()
        })
        .unwrap_or_default();
    DecodedCall {
        assistant_message: Message::Assistant {
            content: parts,
            provider_id: "openai".to_string(),
            model_id: request.model_id.clone(),
            provider_model_name: request.model_name.clone(),
            raw_message: Some(raw),
            name: None,
        },
        finish_reason,
        usage,
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    fn supports_strict_mode(&self, model_name: &str) -> bool {
        model_supports_strict(model_name)
    }

    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError> {
        let api_key = self.api_key()?;
        let selector = selector_for_model_id(&request.model_id);
        let (endpoint, body) = match selector {
            ApiSurface::ChatCompletions => (format!("{}/chat/completions", self.base_url.trim_end_matches('/')), build_chat_body(&request)),
            ApiSurface::Responses => (format!("{}/responses", self.base_url.trim_end_matches('/')), build_responses_body(&request)),
        };
        let response = SHARED_HTTP_CLIENT
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = classify_transport_error(&e);
                MicError::from_kind(kind, "openai", &request.model_id, Some(Box::new(e)))
            })?;
        if !response.status().is_success() {
            return Err(map_error_response("openai", &request.model_id, response).await);
        }
        let parsed: serde_json::Value = response.json().await.map_err(|e| MicError::api("openai", &request.model_id, Some(Box::new(e))))?;
        Ok(match selector {
            ApiSurface::ChatCompletions => decode_chat_response(parsed, &request),
            ApiSurface::Responses => decode_responses_response(parsed, &request),
        })
    }

    async fn stream(&self, request: CallRequest) -> Result<RawEventStream, MicError> {
        let api_key = self.api_key()?;
        if selector_for_model_id(&request.model_id) == ApiSurface::Responses {
            return Err(MicError::FeatureNotSupported {
                provider: "openai".to_string(),
                model_id: request.model_id.clone(),
                feature: "streaming via the Responses API".to_string(),
            });
        }
        let mut body = build_chat_body(&request);
        body["stream"] = serde_json::Value::Bool(true);
        body["stream_options"] = serde_json::json!({"include_usage": true});
        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let model_id = request.model_id.clone();
        let response = SHARED_HTTP_CLIENT.post(endpoint).bearer_auth(api_key).json(&body).send().await.map_err(|e| {
            let kind = classify_transport_error(&e);
            MicError::from_kind(kind, "openai", &model_id, Some(Box::new(e)))
        })?;
        if !response.status().is_success() {
            return Err(map_error_response("openai", &model_id, response).await);
        }
        let model_id_for_err = model_id.clone();
        let events = sse_data_events(response).map(move |payload| match payload {
            Ok(data) => {
                if data.trim() == "[DONE]" {
                    return Ok(None);
                }
                serde_json::from_str::<serde_json::Value>(&data)
                    .map(Some)
                    .map_err(|e| MicError::api("openai", &model_id_for_err, Some(Box::new(e))))
            }
            Err(e) => {
                let kind = classify_transport_error(&e);
                Err(MicError::from_kind(kind, "openai", &model_id_for_err, Some(Box::new(e))))
            }
        });
        let translated = events.flat_map(|result| {
            let items: Vec<Result<ProviderStreamEvent, MicError>> = match result {
                Ok(Some(event)) => translate_chat_stream_event(&event).into_iter().map(Ok).collect(),
                Ok(None) => vec![],
                Err(e) => vec![Err(e)],
            };
            futures_util::stream::iter(items)
        });
        Ok(Box::pin(translated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CallRequest {
        CallRequest {
            model_name: "gpt-4o-mini".to_string(),
            model_id: "openai/gpt-4o-mini".to_string(),
            messages: vec![],
            tools: vec![],
            format: None,
            params: crate::params::Params::new(),
        }
    }

    #[test]
    fn raw_message_reuse_checks_the_request_model_not_itself() {
        let stored_raw = serde_json::json!({"role": "assistant", "content": "stale"});
        let assistant = Message::Assistant {
            content: vec![AssistantPart::Text { text: "hi".to_string() }],
            provider_id: "openai".to_string(),
            model_id: "openai/gpt-4o-mini".to_string(),
            provider_model_name: "gpt-4o-mini".to_string(),
            raw_message: Some(stored_raw.clone()),
            name: None,
        };

        // Same target model: raw message is reused verbatim.
        let mut request = sample_request();
        request.messages = vec![assistant.clone()];
        let body = build_chat_body(&request);
        assert_eq!(body["messages"][0], stored_raw);

        // Different target model: must re-encode from parts, not reuse the
        // stale raw payload from the other model.
        let mut request = sample_request();
        request.model_name = "gpt-4.1".to_string();
        request.messages = vec![assistant];
        let body = build_chat_body(&request);
        assert_ne!(body["messages"][0], stored_raw);
        assert_eq!(body["messages"][0]["content"], serde_json::json!("hi"));
    }

    #[test]
    fn tool_choice_is_required_when_regular_tools_are_also_present() {
        use crate::format::{FormatMode, FormatSpec};
        use crate::tool::ToolSchema;

        let mut request = sample_request();
        request.tools = vec![ToolSchema::new("lookup", "look something up", serde_json::json!({"type": "object"}))];
        request.format = Some(FormatSpec {
            mode: FormatMode::Tool,
            schema: serde_json::json!({"type": "object"}),
            formatting_instructions: None,
        });
        let body = build_chat_body(&request);
        assert_eq!(body["tool_choice"], serde_json::json!("required"));
        assert_eq!(body["tools"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn tool_choice_names_synthetic_tool_when_no_regular_tools_present() {
        use crate::format::{FormatMode, FormatSpec};

        let mut request = sample_request();
        request.format = Some(FormatSpec {
            mode: FormatMode::Tool,
            schema: serde_json::json!({"type": "object"}),
            formatting_instructions: None,
        });
        let body = build_chat_body(&request);
        assert_eq!(body["tool_choice"]["function"]["name"], serde_json::json!(crate::format::STRUCTURED_OUTPUT_TOOL_NAME));
    }

    #[test]
    fn selector_defaults_to_chat_completions() {
        assert_eq!(select_surface(None), ApiSurface::ChatCompletions);
        assert_eq!(select_surface(Some("responses")), ApiSurface::Responses);
        assert_eq!(select_surface(Some("unknown")), ApiSurface::ChatCompletions);
    }

    #[test]
    fn decodes_text_and_tool_calls_from_chat_completions() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "hi",
                    "tool_calls": [{"id": "c1", "function": {"name": "add", "arguments": "{\"a\":1}"}}]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 4, "completion_tokens": 6}
        });
        let request = sample_request();
        let decoded = decode_chat_response(raw, &request);
        assert_eq!(decoded.usage.total_tokens(), 10);
        match decoded.assistant_message {
            Message::Assistant { content, .. } => {
                assert_eq!(content.len(), 2);
            }
            _ => panic!("expected assistant message"),
        }
    }

    #[test]
    fn stream_chunk_with_text_delta_translates() {
        let event = serde_json::json!({"choices": [{"delta": {"content": "hi"}}]});
        let chunks = translate_chat_stream_event(&event);
        assert!(chunks.iter().any(|c| matches!(c, ProviderStreamEvent::TextDelta { delta } if delta == "hi")));
    }

    #[test]
    fn decodes_function_call_from_responses_api() {
        let raw = serde_json::json!({
            "output": [{"type": "function_call", "call_id": "c1", "name": "add", "arguments": "{\"a\":1}"}],
            "usage": {"input_tokens": 2, "output_tokens": 3}
        });
        let mut request = sample_request();
        request.model_id = "openai/gpt-4o-mini:responses".to_string();
        let decoded = decode_responses_response(raw, &request);
        assert_eq!(decoded.finish_reason, FinishReason::None);
        match decoded.assistant_message {
            Message::Assistant { content, .. } => assert!(matches!(content[0], AssistantPart::ToolCall { .. })),
            _ => panic!("expected assistant message"),
        }
    }
}
