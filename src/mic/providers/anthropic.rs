//! The Anthropic provider adapter.
//!
//! Targets the native Messages API (`/v1/messages`), not an OpenAI-
//! compatible proxy — MIC needs full control over content blocks (thinking,
//! tool_use, tool_result) that a compatibility surface doesn't expose:
//! requests are built as hand-constructed `serde_json::Value`s and posted
//! directly with `reqwest`, with status handling done manually rather than
//! through a generic SDK.

use crate::content::MediaSource;
use crate::error::MicError;
use crate::format::FormatMode;
use crate::message::{AssistantPart, FinishReason, Message, Usage, UserPart};
use crate::provider::{CallRequest, DecodedCall, Provider, RawEventStream};
use crate::providers::common::{classify_transport_error, map_error_response, sse_data_events, SHARED_HTTP_CLIENT};
use crate::streaming::ProviderStreamEvent;
use async_trait::async_trait;
use futures_util::StreamExt;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Models known to support server-enforced strict-mode tool schemas. Used by
/// [`AnthropicProvider::supports_strict_mode`] and `should_use_beta`.
fn model_supports_strict(model_name: &str) -> bool {
    model_name.starts_with("claude-opus-4") || model_name.starts_with("claude-sonnet-4")
}

/// Whether this request should route through the beta sub-adapter.
///
/// Routes through the beta header when the call wants strict mode (a
/// strict-mode format, or any strict tool) and the model supports it.
fn should_use_beta(model_name: &str, format_mode: Option<FormatMode>, any_strict_tool: bool) -> bool {
    let wants_strict = matches!(format_mode, Some(FormatMode::Strict)) || any_strict_tool;
    wants_strict && model_supports_strict(model_name)
}

pub struct AnthropicProvider {
    api_key_lookup: crate::config::CredentialLookup,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key_lookup: crate::config::CredentialLookup) -> Self {
        AnthropicProvider { api_key_lookup, base_url: DEFAULT_BASE_URL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self, model_id: &str) -> Result<String, MicError> {
        (self.api_key_lookup)().ok_or_else(|| {
            let _ = model_id;
            MicError::MissingApiKey { provider: "anthropic".to_string() }
        })
    }

    fn build_request_body(&self, request: &CallRequest) -> serde_json::Value {
        let mut system_parts = Vec::new();
        let mut wire_messages = Vec::new();
        for message in &request.messages {
            match message {
                Message::System { text } => system_parts.push(text.clone()),
                Message::User { content, .. } => wire_messages.push(encode_user_message(content)),
                Message::Assistant { content, provider_id, provider_model_name, raw_message, .. } => {
                    if message.can_reuse_raw(
                        "anthropic",
                        &request.model_name,
                        request.params.thinking.as_ref().map(|t| t.encode_thoughts_as_text).unwrap_or(false),
                    ) {
                        if let Some(raw) = raw_message {
                            wire_messages.push(raw.clone());
                            continue;
                        }
                    }
                    let _ = (provider_id, provider_model_name);
                    wire_messages.push(encode_assistant_message(content));
                }
            }
        }

        if let Some(format) = &request.format {
            if format.mode == FormatMode::Json {
                system_parts.insert(0, format.json_mode_instructions());
            }
        }

        let mut tools: Vec<serde_json::Value> = request.tools.iter().map(encode_tool).collect();
        let mut tool_choice = None;
        if let Some(format) = &request.format {
            if matches!(format.mode, FormatMode::Tool | FormatMode::Strict) {
                tools.push(encode_tool(&format.synthetic_tool()));
                tool_choice = Some(if request.tools.is_empty() {
                    serde_json::json!({"type": "tool", "name": crate::format::STRUCTURED_OUTPUT_TOOL_NAME})
                } else {
                    serde_json::json!({"type": "any"})
                });
            }
        }

        let mut body = serde_json::json!({
            "model": request.model_name,
            "max_tokens": request.params.max_tokens.unwrap_or(4096),
            "messages": wire_messages,
        });
        if !system_parts.is_empty() {
            body["system"] = serde_json::Value::String(system_parts.join("\n\n"));
        }
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
                body["stop_sequences"] = serde_json::json!(request.params.stop_sequences);
            }
        } else if log::log_enabled!(log::Level::Warn) {
            for key in request.params.reasoning_incompatible_keys() {
                log::warn!("anthropic provider: param '{}' is not supported by reasoning model {} and was dropped", key, request.model_name);
            }
        }
        if let Some(thinking) = &request.params.thinking {
            if let Some(budget) = thinking.budget_tokens {
                body["thinking"] = serde_json::json!({"type": "enabled", "budget_tokens": budget});
            }
        }
        for (key, value) in &request.params.passthrough {
            body[key.as_str()] = value.clone();
        }
        body
    }

    fn beta_header_value(&self, request: &CallRequest) -> Option<&'static str> {
        if should_use_beta(
            &request.model_name,
            request.format.as_ref().map(|f| f.mode),
            request.tools.iter().any(|t| t.strict == Some(true)),
        ) {
            Some("strict-tools-2024")
        } else {
            None
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }
}

fn encode_media_source(source: &MediaSource, kind: &str) -> serde_json::Value {
    match source {
        MediaSource::Base64 { data, mime } => serde_json::json!({
            "type": kind, "source": {"type": "base64", "media_type": mime, "data": data}
        }),
        MediaSource::Url { url } => serde_json::json!({"type": kind, "source": {"type": "url", "url": url}}),
        MediaSource::Text { data, mime } => serde_json::json!({
            "type": kind, "source": {"type": "text", "media_type": mime, "data": data}
        }),
    }
}

fn encode_user_message(parts: &[UserPart]) -> serde_json::Value {
    let blocks: Vec<serde_json::Value> = parts
        .iter()
        .map(|part| match part {
            UserPart::Text { text } => serde_json::json!({"type": "text", "text": text}),
            UserPart::Image { source } => encode_media_source(source, "image"),
            UserPart::Audio { source } => encode_media_source(source, "document"),
            UserPart::Document { source } => encode_media_source(source, "document"),
            UserPart::ToolOutput { id, result, error, .. } => serde_json::json!({
                "type": "tool_result",
                "tool_use_id": id,
                "is_error": error.is_some(),
                "content": match (error, result) {
                    (Some(message), _) => message.clone(),
                    (None, crate::content::ToolOutputResult::Text(text)) => text.clone(),
                    (None, crate::content::ToolOutputResult::Value(v)) => v.to_string(),
                }
            }),
        })
        .collect();
    serde_json::json!({"role": "user", "content": blocks})
}

fn encode_assistant_message(parts: &[AssistantPart]) -> serde_json::Value {
    let blocks: Vec<serde_json::Value> = parts
        .iter()
        .map(|part| match part {
            AssistantPart::Text { text } => serde_json::json!({"type": "text", "text": text}),
            AssistantPart::Thought { thought } => serde_json::json!({"type": "thinking", "thinking": thought}),
            AssistantPart::ToolCall { id, name, args } => serde_json::json!({
                "type": "tool_use",
                "id": id,
                "name": name,
                "input": serde_json::from_str::<serde_json::Value>(args).unwrap_or(serde_json::Value::Null),
            }),
        })
        .collect();
    serde_json::json!({"role": "assistant", "content": blocks})
}

fn encode_tool(tool: &crate::tool::ToolSchema) -> serde_json::Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

fn decode_response(raw: serde_json::Value, request: &CallRequest, encode_thoughts_as_text: bool) -> DecodedCall {
    let mut parts = Vec::new();
    if let Some(blocks) = raw.get("content").and_then(|c| c.as_array()) {
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        parts.push(AssistantPart::Text { text: text.to_string() });
                    }
                }
                Some("thinking") => {
                    if encode_thoughts_as_text {
                        if let Some(text) = block.get("thinking").and_then(|t| t.as_str()) {
                            parts.push(AssistantPart::Text { text: text.to_string() });
                        }
                    } else if let Some(text) = block.get("thinking").and_then(|t| t.as_str()) {
                        parts.push(AssistantPart::Thought { thought: text.to_string() });
                    }
                }
                Some("tool_use") => {
                    let id = block.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let name = block.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let args = block.get("input").cloned().unwrap_or(serde_json::Value::Object(Default::default())).to_string();
                    parts.push(AssistantPart::ToolCall { id, name, args });
                }
                _ => {}
            }
        }
    }
    let finish_reason = raw
        .get("stop_reason")
        .and_then(|v| v.as_str())
        .map(FinishReason::from_provider_code)
        .unwrap_or(FinishReason::None);
    let usage = raw
        .get("usage")
        .map(|u| Usage {
            input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            cache_read_tokens: u.get("cache_read_input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            cache_write_tokens: u.get("cache_creation_input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            reasoning_tokens: 0,
            raw: Some(u.clone()),
        })
        .unwrap_or_default();

    DecodedCall {
        assistant_message: Message::Assistant {
            content: parts,
            provider_id: "anthropic".to_string(),
            model_id: request.model_id.clone(),
            provider_model_name: request.model_name.clone(),
            raw_message: Some(raw),
            name: None,
        },
        finish_reason,
        usage,
    }
}

/// Translate one Anthropic SSE event (already JSON-decoded) into zero or one
/// [`ProviderStreamEvent`]s.
fn translate_stream_event(event: &serde_json::Value) -> Vec<ProviderStreamEvent> {
    let mut out = vec![ProviderStreamEvent::Raw { raw: event.clone() }];
    match event.get("type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => {
            if let Some(delta) = event.get("delta") {
                match delta.get("type").and_then(|t| t.as_str()) {
                    Some("text_delta") => {
                        if let Some(text) = delta.get("text").and_then(|t| t.as_str()) {
                            out.push(ProviderStreamEvent::TextDelta { delta: text.to_string() });
                        }
                    }
                    Some("thinking_delta") => {
                        if let Some(text) = delta.get("thinking").and_then(|t| t.as_str()) {
                            out.push(ProviderStreamEvent::ThoughtDelta { delta: text.to_string() });
                        }
                    }
                    Some("input_json_delta") => {
                        let index = event.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                        let partial = delta.get("partial_json").and_then(|v| v.as_str()).unwrap_or("").to_string();
                        out.push(ProviderStreamEvent::ToolCallDelta { index, id: None, name: None, delta: partial });
                    }
                    _ => {}
                }
            }
        }
        Some("content_block_start") => {
            if event.get("content_block").and_then(|b| b.get("type")).and_then(|t| t.as_str()) == Some("tool_use") {
                let index = event.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                let block = event.get("content_block").unwrap();
                let id = block.get("id").and_then(|v| v.as_str()).map(|s| s.to_string());
                let name = block.get("name").and_then(|v| v.as_str()).map(|s| s.to_string());
                out.push(ProviderStreamEvent::ToolCallDelta { index, id, name, delta: String::new() });
            }
        }
        Some("message_delta") => {
            let stop_reason = event.get("delta").and_then(|d| d.get("stop_reason")).and_then(|v| v.as_str());
            let usage = event.get("usage").map(|u| Usage {
                output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                ..Default::default()
            });
            if let Some(code) = stop_reason {
                out.push(ProviderStreamEvent::Finish { code: code.to_string(), usage });
            }
        }
        Some("message_stop") => {
            out.push(ProviderStreamEvent::FinalMessage { raw: event.clone() });
        }
        _ => {}
    }
    out
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn supports_strict_mode(&self, model_name: &str) -> bool {
        model_supports_strict(model_name)
    }

    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError> {
        let api_key = self.api_key(&request.model_id)?;
        let encode_thoughts_as_text = request.params.thinking.as_ref().map(|t| t.encode_thoughts_as_text).unwrap_or(false);
        let body = self.build_request_body(&request);
        let mut req = SHARED_HTTP_CLIENT
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        if let Some(beta) = self.beta_header_value(&request) {
            req = req.header("anthropic-beta", beta);
        }
        let response = req.send().await.map_err(|e| {
            let kind = classify_transport_error(&e);
            MicError::from_kind(kind, "anthropic", &request.model_id, Some(Box::new(e)))
        })?;
        if !response.status().is_success() {
            return Err(map_error_response("anthropic", &request.model_id, response).await);
        }
        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MicError::api("anthropic", &request.model_id, Some(Box::new(e))))?;
        Ok(decode_response(parsed, &request, encode_thoughts_as_text))
    }

    async fn stream(&self, request: CallRequest) -> Result<RawEventStream, MicError> {
        let api_key = self.api_key(&request.model_id)?;
        let mut body = self.build_request_body(&request);
        body["stream"] = serde_json::Value::Bool(true);
        let mut req = SHARED_HTTP_CLIENT
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        if let Some(beta) = self.beta_header_value(&request) {
            req = req.header("anthropic-beta", beta);
        }
        let model_id = request.model_id.clone();
        let response = req.send().await.map_err(|e| {
            let kind = classify_transport_error(&e);
            MicError::from_kind(kind, "anthropic", &model_id, Some(Box::new(e)))
        })?;
        if !response.status().is_success() {
            return Err(map_error_response("anthropic", &model_id, response).await);
        }
        let model_id_for_err = model_id.clone();
        let events = sse_data_events(response).map(move |payload| match payload {
            Ok(data) => serde_json::from_str::<serde_json::Value>(&data)
                .map_err(|e| MicError::api("anthropic", &model_id_for_err, Some(Box::new(e)))),
            Err(e) => {
                let kind = classify_transport_error(&e);
                Err(MicError::from_kind(kind, "anthropic", &model_id_for_err, Some(Box::new(e))))
            }
        });
        let translated = events.flat_map(|result| {
            let items: Vec<Result<ProviderStreamEvent, MicError>> = match result {
                Ok(event) => translate_stream_event(&event).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            futures_util::stream::iter(items)
        });
        Ok(Box::pin(translated))
    }
}
