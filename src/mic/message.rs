//! Messages, roles, usage accounting, and finish reasons — the rest of the
//! normalized Request/Response Model.

use crate::content::ContentPart;
use std::ops::Add;

/// A content part a user message may carry.
///
/// A restriction of [`ContentPart`]: user turns may not carry `thought` or
/// `tool_call` parts.
#[derive(Debug, Clone)]
pub enum UserPart {
    Text { text: String },
    Image { source: crate::content::MediaSource },
    Audio { source: crate::content::MediaSource },
    Document { source: crate::content::MediaSource },
    ToolOutput {
        id: String,
        name: String,
        result: crate::content::ToolOutputResult,
        error: Option<String>,
    },
}

impl UserPart {
    pub fn text(text: impl Into<String>) -> Self {
        UserPart::Text { text: text.into() }
    }

    pub fn into_content_part(self) -> ContentPart {
        match self {
            UserPart::Text { text } => ContentPart::Text { text },
            UserPart::Image { source } => ContentPart::Image { source },
            UserPart::Audio { source } => ContentPart::Audio { source },
            UserPart::Document { source } => ContentPart::Document { source },
            UserPart::ToolOutput { id, name, result, error } => ContentPart::ToolOutput { id, name, result, error },
        }
    }
}

/// A content part an assistant message may carry.
///
/// A restriction of [`ContentPart`]: assistant turns may not carry `image`,
/// `audio`, `document`, or `tool_output` parts.
#[derive(Debug, Clone)]
pub enum AssistantPart {
    Text { text: String },
    Thought { thought: String },
    ToolCall { id: String, name: String, args: String },
}

impl AssistantPart {
    pub fn into_content_part(self) -> ContentPart {
        match self {
            AssistantPart::Text { text } => ContentPart::Text { text },
            AssistantPart::Thought { thought } => ContentPart::Thought { thought },
            AssistantPart::ToolCall { id, name, args } => ContentPart::ToolCall { id, name, args },
        }
    }
}

/// A single chat turn, closed by role as a tagged-variant enum rather than a
/// flat struct with optional fields: system turns carry only text, user
/// turns carry [`UserPart`]s, assistant turns carry [`AssistantPart`]s plus
/// enough provenance to support exact round-trip on
/// [`crate::response::Response::resume`].
#[derive(Debug, Clone)]
pub enum Message {
    System { text: String },
    User { content: Vec<UserPart>, name: Option<String> },
    Assistant {
        content: Vec<AssistantPart>,
        /// Provider id that produced this message (e.g. `"anthropic"`).
        provider_id: String,
        /// Full model identifier, e.g. `"anthropic/claude-sonnet-4-5"`.
        model_id: String,
        /// The provider's own model name, without the `<provider>/` prefix or
        /// `:api_selector` suffix — used to decide whether `raw_message` can be
        /// reused verbatim on resume.
        provider_model_name: String,
        /// The provider-serialized payload, preserved as opaque JSON for exact
        /// round-trip. MUST NOT be re-serialized through our own type model
        /// when reused.
        raw_message: Option<serde_json::Value>,
        name: Option<String>,
    },
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Message::System { text: text.into() }
    }

    pub fn user(parts: Vec<UserPart>) -> Self {
        Message::User { content: parts, name: None }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Message::User { content: vec![UserPart::text(text)], name: None }
    }

    /// Whether `raw_message` can be reused verbatim for the given target
    /// provider/model: the provider id and provider model name must both
    /// match, and the caller must not be requesting thought-as-text
    /// re-encoding.
    pub fn can_reuse_raw(
        &self,
        target_provider_id: &str,
        target_provider_model_name: &str,
        encode_thoughts_as_text: bool,
    ) -> bool {
        match self {
            Message::Assistant { provider_id, provider_model_name, raw_message, .. } => {
                raw_message.is_some()
                    && provider_id == target_provider_id
                    && provider_model_name == target_provider_model_name
                    && !encode_thoughts_as_text
            }
            _ => false,
        }
    }
}

/// `MAX_TOKENS`, a refusal, or normal completion (`null`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishReason {
    MaxTokens,
    Refusal,
    /// Normal completion; tool-call stops are also represented as `None`.
    #[default]
    None,
}

impl FinishReason {
    /// Translate a provider's native finish/stop code per the canonical table
    /// in §4.3.
    pub fn from_provider_code(code: &str) -> FinishReason {
        match code {
            "length" | "max_tokens" => FinishReason::MaxTokens,
            "content_filter" | "refusal" => FinishReason::Refusal,
            "stop" | "tool_calls" | "function_call" | "end_turn" | "stop_sequence" | "tool_use" | "pause_turn" => {
                FinishReason::None
            }
            _ => FinishReason::None,
        }
    }
}

/// Token accounting for a single call, componentwise-additive.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub reasoning_tokens: u64,
    pub raw: Option<serde_json::Value>,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            cache_read_tokens: self.cache_read_tokens + rhs.cache_read_tokens,
            cache_write_tokens: self.cache_write_tokens + rhs.cache_write_tokens,
            reasoning_tokens: self.reasoning_tokens + rhs.reasoning_tokens,
            raw: None,
        }
    }
}
