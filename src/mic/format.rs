//! Structured output formats.
//!
//! A [`Format`] describes how to coerce a model's raw output into a typed
//! value `T`. Three modes are supported:
//!
//! - `Tool` — a synthetic tool is appended to the request; the model's
//!   invocation of that tool carries the structured payload.
//! - `Json` — relies on the provider's native JSON mode; formatting
//!   instructions are prepended as a system message instead.
//! - `Strict` — like `Tool`, but asks the provider to enforce the schema
//!   server-side, where supported.
//!
//! Providers that cannot support a requested mode fail with
//! [`MicError::FeatureNotSupported`] rather than silently
//! downgrading.

use crate::error::MicError;
use crate::tool::ToolSchema;
use std::sync::Arc;

/// The well-known synthetic tool name used for tool-mode structured output.
pub const STRUCTURED_OUTPUT_TOOL_NAME: &str = "structured_output";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    Tool,
    Json,
    Strict,
}

/// The provider-facing, non-generic half of a [`Format`]: mode, schema, and
/// instructions, without the typed parser. Provider adapters only ever need
/// this shape for encoding;
/// only [`crate::response::Response::format`] needs the typed parser.
#[derive(Debug, Clone)]
pub struct FormatSpec {
    pub mode: FormatMode,
    pub schema: serde_json::Value,
    pub formatting_instructions: Option<String>,
}

/// A parser from the raw JSON a model produced to a typed value.
///
/// Boxed as `Arc<dyn Fn>` so a [`Format`] stays `Clone` without requiring `T`
/// to be; callers typically build one `Format<T>` per call site via
/// `Format::new`.
pub type ParseFn<T> = Arc<dyn Fn(&serde_json::Value) -> Result<T, String> + Send + Sync>;

/// A structured-output specification: mode, schema, optional formatting
/// instructions, and a parse function for the typed result.
#[derive(Clone)]
pub struct Format<T> {
    pub mode: FormatMode,
    pub schema: serde_json::Value,
    pub formatting_instructions: Option<String>,
    parse_fn: ParseFn<T>,
}

impl<T> Format<T> {
    pub fn new(mode: FormatMode, schema: serde_json::Value, parse_fn: ParseFn<T>) -> Self {
        Format { mode, schema, formatting_instructions: None, parse_fn }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.formatting_instructions = Some(instructions.into());
        self
    }

    /// The non-generic view a provider adapter encodes against.
    pub fn spec(&self) -> FormatSpec {
        FormatSpec {
            mode: self.mode,
            schema: self.schema.clone(),
            formatting_instructions: self.formatting_instructions.clone(),
        }
    }

    /// Parse a model's raw structured-output payload into `T`, failing with
    /// [`MicError::ResponseValidation`] on mismatch`).
    pub fn parse(&self, raw: &serde_json::Value, provider: &str, model_id: &str) -> Result<T, MicError> {
        (self.parse_fn)(raw).map_err(|message| MicError::ResponseValidation {
            provider: provider.to_string(),
            model_id: model_id.to_string(),
            message,
        })
    }

    /// The synthetic tool created for tool-mode/strict-mode formats
    pub fn synthetic_tool(&self) -> ToolSchema {
        let mut tool = ToolSchema::new(
            STRUCTURED_OUTPUT_TOOL_NAME,
            "Emit the final structured response matching the required schema.",
            self.schema.clone(),
        );
        if self.mode == FormatMode::Strict {
            tool = tool.strict(true);
        }
        tool
    }

    /// Default JSON-mode formatting instructions, prepended as a system
    /// message ahead of the rest of the conversation.
    pub fn json_mode_instructions(&self) -> String {
        self.formatting_instructions.clone().unwrap_or_else(|| {
            format!(
                "Respond with a single JSON object matching this schema, and nothing else:\n{}",
                self.schema
            )
        })
    }
}

impl<T> std::fmt::Debug for Format<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Format")
            .field("mode", &self.mode)
            .field("schema", &self.schema)
            .field("formatting_instructions", &self.formatting_instructions)
            .finish()
    }
}

impl FormatSpec {
    /// The synthetic tool created for tool-mode/strict-mode formats
    pub fn synthetic_tool(&self) -> ToolSchema {
        let mut tool = ToolSchema::new(
            STRUCTURED_OUTPUT_TOOL_NAME,
            "Emit the final structured response matching the required schema.",
            self.schema.clone(),
        );
        if self.mode == FormatMode::Strict {
            tool = tool.strict(true);
        }
        tool
    }

    /// Default JSON-mode formatting instructions, prepended as a system
    /// message ahead of the rest of the conversation.
    pub fn json_mode_instructions(&self) -> String {
        self.formatting_instructions.clone().unwrap_or_else(|| {
            format!(
                "Respond with a single JSON object matching this schema, and nothing else:\n{}",
                self.schema
            )
        })
    }
}

/// Whether `mode` is supported given a provider's strict-mode capability flag.
/// Callers raise [`MicError::FeatureNotSupported`] when this returns `false`
pub fn mode_supported(mode: FormatMode, supports_strict: bool) -> bool {
    match mode {
        FormatMode::Tool | FormatMode::Json => true,
        FormatMode::Strict => supports_strict,
    }
}
