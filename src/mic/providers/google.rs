//! The Google (Gemini) provider adapter.
//!
//! Targets the native `generativelanguage.googleapis.com` `generateContent`/
//! `streamGenerateContent` endpoints, using their native
//! `contents`/`parts`/`functionCall`/`functionResponse` request shape against
//! the normalized Request/Response Model.

use crate::content::MediaSource;
use crate::error::MicError;
use crate::format::FormatMode;
use crate::message::{AssistantPart, FinishReason, Message, Usage, UserPart};
use crate::provider::{CallRequest, DecodedCall, Provider, RawEventStream};
use crate::providers::common::{classify_transport_error, map_error_response, sse_data_events, SHARED_HTTP_CLIENT};
use crate::streaming::ProviderStreamEvent;
use async_trait::async_trait;
use futures_util::StreamExt;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn model_supports_strict(model_name: &str) -> bool {
    model_name.starts_with("gemini-2") || model_name.starts_with("gemini-1.5-pro")
}

pub struct GoogleProvider {
    api_key_lookup: crate::config::CredentialLookup,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(api_key_lookup: crate::config::CredentialLookup) -> Self {
        GoogleProvider { api_key_lookup, base_url: DEFAULT_BASE_URL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<String, MicError> {
        (self.api_key_lookup)().ok_or_else(|| MicError::MissingApiKey { provider: "google".to_string() })
    }

    fn endpoint(&self, model_name: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url.trim_end_matches('/'), model_name, method)
    }
}

fn encode_media_source(source: &MediaSource) -> serde_json::Value {
    match source {
        MediaSource::Base64 { data, mime } => serde_json::json!({"inlineData": {"mimeType": mime, "data": data}}),
        MediaSource::Url { url } => serde_json::json!({"fileData": {"fileUri": url}}),
        MediaSource::Text { data, .. } => serde_json::json!({"text": data}),
    }
}

fn encode_user_parts(parts: &[UserPart]) -> Vec<serde_json::Value> {
    parts
        .iter()
        .map(|part| match part {
            UserPart::Text { text } => serde_json::json!({"text": text}),
            UserPart::Image { source } => encode_media_source(source),
            UserPart::Audio { source } => encode_media_source(source),
            UserPart::Document { source } => encode_media_source(source),
            UserPart::ToolOutput { name, result, error, .. } => {
                let response = match (error, result) {
                    (Some(message), _) => serde_json::json!({"error": message}),
                    (None, crate::content::ToolOutputResult::Text(text)) => serde_json::json!({"result": text}),
                    (None, crate::content::ToolOutputResult::Value(v)) => serde_json::json!({"result": v}),
                };
                serde_json::json!({"functionResponse": {"name": name, "response": response}})
            }
        })
        .collect()
}

fn encode_assistant_parts(parts: &[AssistantPart], encode_thoughts_as_text: bool) -> Vec<serde_json::Value> {
    parts
        .iter()
        .map(|part| match part {
            AssistantPart::Text { text } => serde_json::json!({"text": text}),
            AssistantPart::Thought { thought } => {
                if encode_thoughts_as_text {
                    serde_json::json!({"text": thought})
                } else {
                    serde_json::json!({"text": thought, "thought": true})
                }
            }
            AssistantPart::ToolCall { name, args, .. } => serde_json::json!({
                "functionCall": {"name": name, "args": serde_json::from_str::<serde_json::Value>(args).unwrap_or(serde_json::Value::Null)}
            }),
        })
        .collect()
}

fn encode_tool(tool: &crate::tool::ToolSchema) -> serde_json::Value {
    serde_json::json!({"name": tool.name, "description": tool.description, "parameters": tool.parameters})
}

fn build_request_body(request: &CallRequest) -> serde_json::Value {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();
    for message in &request.messages {
        match message {
            Message::System { text } => system_parts.push(text.clone()),
            Message::User { content, .. } => contents.push(serde_json::json!({"role": "user", "parts": encode_user_parts(content)})),
            Message::Assistant { content, raw_message, .. } => {
                let encode_thoughts_as_text = request.params.thinking.as_ref().map(|t| t.encode_thoughts_as_text).unwrap_or(false);
                if message.can_reuse_raw("google", &request.model_name, encode_thoughts_as_text) {
                    if let Some(raw) = raw_message {
                        contents.push(raw.clone());
                        continue;
                    }
                }
                contents.push(serde_json::json!({"role": "model", "parts": encode_assistant_parts(content, encode_thoughts_as_text)}));
            }
        }
    }

    if let Some(format) = &request.format {
        if format.mode == FormatMode::Json {
            system_parts.insert(0, format.json_mode_instructions());
        }
    }

    let mut body = serde_json::json!({"contents": contents});
    if !system_parts.is_empty() {
        body["systemInstruction"] = serde_json::json!({"parts": [{"text": system_parts.join("\n\n")}]});
    }

    let mut tools: Vec<serde_json::Value> = request.tools.iter().map(encode_tool).collect();
    if let Some(format) = &request.format {
        if matches!(format.mode, FormatMode::Tool | FormatMode::Strict) {
            tools.push(encode_tool(&format.synthetic_tool()));
            body["toolConfig"] = if request.tools.is_empty() {
                serde_json::json!({"functionCallingConfig": {"mode": "ANY", "allowedFunctionNames": [crate::format::STRUCTURED_OUTPUT_TOOL_NAME]}})
            } else {
                serde_json::json!({"functionCallingConfig": {"mode": "ANY"}})
            };
        }
    }
    if !tools.is_empty() {
        body["tools"] = serde_json::json!([{"functionDeclarations": tools}]);
    }

    let mut generation_config = serde_json::json!({});
    if !request.params.is_reasoning() {
        if let Some(temperature) = request.params.temperature {
            generation_config["temperature"] = serde_json::json!(temperature);
        }
        if let Some(top_p) = request.params.top_p {
            generation_config["topP"] = serde_json::json!(top_p);
        }
        if !request.params.stop_sequences.is_empty() {
            generation_config["stopSequences"] = serde_json::json!(request.params.stop_sequences);
        }
    } else if log::log_enabled!(log::Level::Warn) {
        for key in request.params.reasoning_incompatible_keys() {
            log::warn!("google provider: param '{}' is not supported by reasoning model {} and was dropped", key, request.model_name);
        }
    }
    if let Some(top_k) = request.params.top_k {
        generation_config["topK"] = serde_json::json!(top_k);
    }
    if let Some(max_tokens) = request.params.max_tokens {
        generation_config["maxOutputTokens"] = serde_json::json!(max_tokens);
    }
    if let Some(format) = &request.format {
        if format.mode == FormatMode::Strict {
            generation_config["responseMimeType"] = serde_json::Value::String("application/json".to_string());
            generation_config["responseSchema"] = format.schema.clone();
        }
    }
    if let Some(thinking) = &request.params.thinking {
        if let Some(budget) = thinking.budget_tokens {
            generation_config["thinkingConfig"] = serde_json::json!({"thinkingBudget": budget, "includeThoughts": true});
        }
    }
    if let serde_json::Value::Object(map) = &generation_config {
        if !map.is_empty() {
            body["generationConfig"] = generation_config;
        }
    }
    for (key, value) in &request.params.passthrough {
        body[key.as_str()] = value.clone();
    }
    body
}

fn decode_response(raw: serde_json::Value, request: &CallRequest, encode_thoughts_as_text: bool) -> DecodedCall {
    let candidate = raw.get("candidates").and_then(|c| c.as_array()).and_then(|a| a.first());
    let mut parts = Vec::new();
    if let Some(candidate) = candidate {
        if let Some(blocks) = candidate.get("content").and_then(|c| c.get("parts")).and_then(|p| p.as_array()) {
            for block in blocks {
                if let Some(call) = block.get("functionCall") {
                    let name = call.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let args = call.get("args").cloned().unwrap_or(serde_json::Value::Object(Default::default())).to_string();
                    parts.push(AssistantPart::ToolCall { id: name.clone(), name, args });
                } else if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
                    let is_thought = block.get("thought").and_then(|v| v.as_bool()).unwrap_or(false);
                    if is_thought && !encode_thoughts_as_text {
                        parts.push(AssistantPart::Thought { thought: text.to_string() });
                    } else {
                        parts.push(AssistantPart::Text { text: text.to_string() });
                    }
                }
            }
        }
    }
    let finish_reason = candidate
        .and_then(|c| c.get("finishReason"))
        .and_then(|v| v.as_str())
        .map(|code| match code {
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" | "RECITATION" => FinishReason::Refusal,
            _ => FinishReason::None,
        })
        .unwrap_or(FinishReason::None);
    let usage = raw
        .get("usageMetadata")
        .map(|u| Usage {
            input_tokens: u.get("promptTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u.get("candidatesTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            cache_read_tokens: u.get("cachedContentTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            cache_write_tokens: 0,
            reasoning_tokens: u.get("thoughtsTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            raw: Some(u.clone()),
        })
        .unwrap_or_default();
    DecodedCall {
        assistant_message: Message::Assistant {
            content: parts,
            provider_id: "google".to_string(),
            model_id: request.model_id.clone(),
            provider_model_name: request.model_name.clone(),
            raw_message: candidate.and_then(|c| c.get("content")).cloned(),
            name: None,
        },
        finish_reason,
        usage,
    }
}

fn translate_stream_event(event: &serde_json::Value) -> Vec<ProviderStreamEvent> {
    let mut out = vec![ProviderStreamEvent::Raw { raw: event.clone() }];
    let Some(candidate) = event.get("candidates").and_then(|c| c.as_array()).and_then(|a| a.first()) else {
        return out;
    };
    if let Some(blocks) = candidate.get("content").and_then(|c| c.get("parts")).and_then(|p| p.as_array()) {
        for (index, block) in blocks.iter().enumerate() {
            if let Some(call) = block.get("functionCall") {
                let name = call.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let args = call.get("args").cloned().unwrap_or(serde_json::Value::Object(Default::default())).to_string();
                out.push(ProviderStreamEvent::ToolCallDelta {
                    index: index as u32,
                    id: Some(name.clone()),
                    name: Some(name),
                    delta: args,
                });
            } else if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
                let is_thought = block.get("thought").and_then(|v| v.as_bool()).unwrap_or(false);
                if is_thought {
                    out.push(ProviderStreamEvent::ThoughtDelta { delta: text.to_string() });
                } else {
                    out.push(ProviderStreamEvent::TextDelta { delta: text.to_string() });
                }
            }
        }
    }
    if let Some(reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
        let usage = event.get("usageMetadata").map(|u| Usage {
            input_tokens: u.get("promptTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u.get("candidatesTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            ..Default::default()
        });
        out.push(ProviderStreamEvent::Finish { code: reason.to_string(), usage });
    }
    out
}

#[async_trait]
impl Provider for GoogleProvider {
    fn provider_id(&self) -> &str {
        "google"
    }

    fn supports_strict_mode(&self, model_name: &str) -> bool {
        model_supports_strict(model_name)
    }

    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError> {
        let api_key = self.api_key()?;
        let encode_thoughts_as_text = request.params.thinking.as_ref().map(|t| t.encode_thoughts_as_text).unwrap_or(false);
        let body = build_request_body(&request);
        let endpoint = self.endpoint(&request.model_name, "generateContent");
        let response = SHARED_HTTP_CLIENT
            .post(endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = classify_transport_error(&e);
                MicError::from_kind(kind, "google", &request.model_id, Some(Box::new(e)))
            })?;
        if !response.status().is_success() {
            return Err(map_error_response("google", &request.model_id, response).await);
        }
        let parsed: serde_json::Value = response.json().await.map_err(|e| MicError::api("google", &request.model_id, Some(Box::new(e))))?;
        Ok(decode_response(parsed, &request, encode_thoughts_as_text))
    }

    async fn stream(&self, request: CallRequest) -> Result<RawEventStream, MicError> {
        let api_key = self.api_key()?;
        let body = build_request_body(&request);
        let endpoint = format!("{}?alt=sse", self.endpoint(&request.model_name, "streamGenerateContent"));
        let model_id = request.model_id.clone();
        let response = SHARED_HTTP_CLIENT
            .post(endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = classify_transport_error(&e);
                MicError::from_kind(kind, "google", &model_id, Some(Box::new(e)))
            })?;
        if !response.status().is_success() {
            return Err(map_error_response("google", &model_id, response).await);
        }
        let model_id_for_err = model_id.clone();
        let events = sse_data_events(response).map(move |payload| match payload {
            Ok(data) => serde_json::from_str::<serde_json::Value>(&data).map_err(|e| MicError::api("google", &model_id_for_err, Some(Box::new(e)))),
            Err(e) => {
                let kind = classify_transport_error(&e);
                Err(MicError::from_kind(kind, "google", &model_id_for_err, Some(Box::new(e))))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CallRequest {
        CallRequest {
            model_name: "gemini-2.0-flash".to_string(),
            model_id: "google/gemini-2.0-flash".to_string(),
            messages: vec![],
            tools: vec![],
            format: None,
            params: crate::params::Params::new(),
        }
    }

    #[test]
    fn raw_message_reuse_checks_the_request_model_not_itself() {
        let stored_raw = serde_json::json!({"parts": [{"text": "stale"}]});
        let assistant = Message::Assistant {
            content: vec![AssistantPart::Text { text: "hi".to_string() }],
            provider_id: "google".to_string(),
            model_id: "google/gemini-2.0-flash".to_string(),
            provider_model_name: "gemini-2.0-flash".to_string(),
            raw_message: Some(stored_raw.clone()),
            name: None,
        };

        let mut request = sample_request();
        request.messages = vec![assistant.clone()];
        let body = build_request_body(&request);
        assert_eq!(body["contents"][0], stored_raw);

        let mut request = sample_request();
        request.model_name = "gemini-1.5-flash".to_string();
        request.messages = vec![assistant];
        let body = build_request_body(&request);
        assert_ne!(body["contents"][0], stored_raw);
        assert_eq!(body["contents"][0]["role"], serde_json::json!("model"));
    }

    #[test]
    fn tool_config_forces_any_call_when_regular_tools_are_also_present() {
        use crate::format::{FormatMode, FormatSpec};
        use crate::tool::ToolSchema;

        let mut request = sample_request();
        request.tools = vec![ToolSchema::new("lookup", "look something up", serde_json::json!({"type": "object"}))];
        request.format = Some(FormatSpec {
            mode: FormatMode::Tool,
            schema: serde_json::json!({"type": "object"}),
            formatting_instructions: None,
        });
        let body = build_request_body(&request);
        assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], serde_json::json!("ANY"));
        assert!(body["toolConfig"]["functionCallingConfig"]["allowedFunctionNames"].is_null());
        assert_eq!(body["tools"][0]["functionDeclarations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn tool_config_narrows_to_synthetic_tool_when_no_regular_tools_present() {
        use crate::format::{FormatMode, FormatSpec};

        let mut request = sample_request();
        request.format = Some(FormatSpec {
            mode: FormatMode::Tool,
            schema: serde_json::json!({"type": "object"}),
            formatting_instructions: None,
        });
        let body = build_request_body(&request);
        assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], serde_json::json!("ANY"));
        assert_eq!(
            body["toolConfig"]["functionCallingConfig"]["allowedFunctionNames"],
            serde_json::json!([crate::format::STRUCTURED_OUTPUT_TOOL_NAME])
        );
    }

    #[test]
    fn decodes_text_and_function_call_parts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "hi"}, {"functionCall": {"name": "add", "args": {"a": 1}}}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 5}
        });
        let decoded = decode_response(raw, &sample_request(), false);
        assert_eq!(decoded.usage.total_tokens(), 8);
        match decoded.assistant_message {
            Message::Assistant { content, .. } => {
                assert_eq!(content.len(), 2);
                assert!(matches!(content[1], AssistantPart::ToolCall { .. }));
            }
            _ => panic!("expected assistant message"),
        }
    }

    #[test]
    fn max_tokens_finish_reason_maps_correctly() {
        let raw = serde_json::json!({"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]});
        let decoded = decode_response(raw, &sample_request(), false);
        assert_eq!(decoded.finish_reason, FinishReason::MaxTokens);
    }

    #[test]
    fn stream_event_with_thought_part_translates_to_thought_delta() {
        let event = serde_json::json!({"candidates": [{"content": {"parts": [{"text": "thinking...", "thought": true}]}}]});
        let chunks = translate_stream_event(&event);
        assert!(chunks.iter().any(|c| matches!(c, ProviderStreamEvent::ThoughtDelta { .. })));
    }
}
