//! Tool schemas and the toolkit that binds them to handlers.
//!
//! A [`Toolkit`] never propagates a tool failure as a `Result::Err` — parse
//! failures, schema validation failures, and handler panics all become a
//! [`ToolOutput`] carrying an error string, so a single bad tool call never
//! aborts a [`crate::response::Response::execute_tools`] batch.

use crate::error::MicError;
use async_trait::async_trait;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

/// A tool's JSON-Schema-described parameter contract.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// Must describe a JSON Schema object (`{"type": "object", ...}`).
    pub parameters: serde_json::Value,
    /// Whether the provider should enforce the schema strictly, where supported.
    pub strict: Option<bool>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: serde_json::Value) -> Self {
        ToolSchema { name: name.into(), description: description.into(), parameters, strict: None }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

/// A raw tool invocation the model requested, prior to execution.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments.
    pub args: String,
}

/// The payload a model's eventual follow-up turn receives for a tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub id: String,
    pub name: String,
    pub result: serde_json::Value,
    pub error: Option<String>,
}

impl ToolOutput {
    fn ok(id: impl Into<String>, name: impl Into<String>, result: serde_json::Value) -> Self {
        ToolOutput { id: id.into(), name: name.into(), result, error: None }
    }

    fn err(id: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        ToolOutput { id: id.into(), name: name.into(), result: serde_json::Value::Null, error: Some(message.into()) }
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, String>> + Send>>;

/// A tool's executable handler. Handlers report failure by returning `Err`,
/// never by panicking — though a panic is still caught and turned into a
/// [`ToolOutput`] error rather than unwinding through the toolkit.
pub type ToolHandler = Arc<dyn Fn(serde_json::Value) -> HandlerFuture + Send + Sync>;

/// A tool bound to its handler.
#[derive(Clone)]
pub struct Tool {
    pub schema: ToolSchema,
    pub handler: ToolHandler,
}

/// A mapping from tool name to tool, plus the single `execute` entry point.
#[derive(Clone, Default)]
pub struct Toolkit {
    tools: HashMap<String, Tool>,
    /// When set, [`Toolkit::try_execute`] raises [`MicError::ToolNotFound`]
    /// for an unrecognized tool name instead of returning an
    /// error-carrying [`ToolOutput`]. Has no effect on [`Toolkit::execute`],
    /// which always reports a missing tool as data.
    strict: bool,
}

impl Toolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) -> &mut Self {
        self.tools.insert(tool.schema.name.clone(), tool);
        self
    }

    /// Enable strict mode: a tool call for a name the toolkit doesn't expose
    /// is reported via [`Toolkit::try_execute`] as [`MicError::ToolNotFound`]
    /// instead of folded into the returned [`ToolOutput`] as data.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute one tool call, never returning `Err`: a missing tool, a parse
    /// failure, a schema mismatch, or a handler panic all become an
    /// `error`-carrying [`ToolOutput`].
    pub async fn execute(&self, call: &ToolCallRequest) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolOutput::err(&call.id, &call.name, format!("unknown tool '{}'", call.name));
        };
        execute_tool(tool, call).await
    }

    /// Like [`Toolkit::execute`], except an unrecognized tool name raises
    /// [`MicError::ToolNotFound`] when this toolkit was built with
    /// [`Toolkit::strict`] `true`. Every other failure mode (parse, schema,
    /// handler panic) still becomes data in the returned [`ToolOutput`].
    pub async fn try_execute(&self, call: &ToolCallRequest) -> Result<ToolOutput, MicError> {
        if self.strict && !self.tools.contains_key(&call.name) {
            return Err(MicError::ToolNotFound { tool_name: call.name.clone() });
        }
        Ok(self.execute(call).await)
    }
}

async fn execute_tool(tool: &Tool, call: &ToolCallRequest) -> ToolOutput {
    let parsed: serde_json::Value = match serde_json::from_str(&call.args) {
        Ok(v) => v,
        Err(e) => return ToolOutput::err(&call.id, &call.name, format!("argument parse failure: {}", e)),
    };
    if let Err(reason) = validate_against_schema(&tool.schema.parameters, &parsed) {
        return ToolOutput::err(&call.id, &call.name, format!("schema validation failure: {}", reason));
    }

    let handler = tool.handler.clone();
    match AssertUnwindSafe(handler(parsed)).catch_unwind().await {
        Ok(Ok(value)) => ToolOutput::ok(&call.id, &call.name, value),
        Ok(Err(message)) => ToolOutput::err(&call.id, &call.name, message),
        Err(panic) => {
            let message = panic_message(panic);
            ToolOutput::err(&call.id, &call.name, format!("tool handler panicked: {}", message))
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A structural (not full-spec) JSON Schema validator: checks `type`,
/// `required`, and per-property primitive types. Sufficient to check
/// whether an argument object satisfies a tool's declared shape, without
/// pulling in a full schema-validation dependency.
fn validate_against_schema(schema: &serde_json::Value, instance: &serde_json::Value) -> Result<(), String> {
    let Some(schema_type) = schema.get("type").and_then(|t| t.as_str()) else {
        return Ok(());
    };
    if schema_type == "object" {
        let obj = instance.as_object().ok_or_else(|| "expected a JSON object".to_string())?;
        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            for req in required {
                let Some(key) = req.as_str() else { continue };
                if !obj.contains_key(key) {
                    return Err(format!("missing required property '{}'", key));
                }
            }
        }
        if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
            for (key, value) in obj {
                if let Some(prop_schema) = properties.get(key) {
                    check_primitive_type(prop_schema, value, key)?;
                }
            }
        }
    }
    Ok(())
}

fn check_primitive_type(prop_schema: &serde_json::Value, value: &serde_json::Value, key: &str) -> Result<(), String> {
    let Some(expected) = prop_schema.get("type").and_then(|t| t.as_str()) else {
        return Ok(());
    };
    let matches = match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    };
    if matches {
        Ok(())
    } else {
        Err(format!("property '{}' expected type '{}'", key, expected))
    }
}

/// A toolkit whose invocations thread an ambient context value through to
/// the handler. The context is not persisted between calls.
#[async_trait]
pub trait ContextToolkit<Ctx: Send + Sync>: Send + Sync {
    async fn execute_with_context(&self, call: &ToolCallRequest, ctx: &Ctx) -> ToolOutput;
    fn schemas(&self) -> Vec<ToolSchema>;
}

/// Surface a `ToolOutput` carrying an error as a [`MicError::ToolExecution`],
/// for call sites (e.g. strict toolkits) that want to treat tool failure as a
/// hard error instead of data.
pub fn tool_output_to_error(output: &ToolOutput) -> Option<MicError> {
    output.error.as_ref().map(|message| MicError::ToolExecution {
        tool_name: output.name.clone(),
        message: message.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_tool() -> Tool {
        Tool {
            schema: ToolSchema::new(
                "add",
                "Adds two integers",
                serde_json::json!({
                    "type": "object",
                    "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                    "required": ["a", "b"]
                }),
            ),
            handler: Arc::new(|args| {
                Box::pin(async move {
                    let a = args.get("a").and_then(|v| v.as_i64()).ok_or("missing a")?;
                    let b = args.get("b").and_then(|v| v.as_i64()).ok_or("missing b")?;
                    Ok(serde_json::json!(a + b))
                })
            }),
        }
    }

    #[tokio::test]
    async fn executes_successfully() {
        let mut toolkit = Toolkit::new();
        toolkit.register(add_tool());
        let call = ToolCallRequest { id: "t1".to_string(), name: "add".to_string(), args: r#"{"a":2,"b":3}"#.to_string() };
        let output = toolkit.execute(&call).await;
        assert_eq!(output.result, serde_json::json!(5));
        assert!(output.error.is_none());
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_output_not_err() {
        let toolkit = Toolkit::new();
        let call = ToolCallRequest { id: "t1".to_string(), name: "missing".to_string(), args: "{}".to_string() };
        let output = toolkit.execute(&call).await;
        assert!(output.error.is_some());
    }

    #[tokio::test]
    async fn parse_failure_becomes_error_output() {
        let mut toolkit = Toolkit::new();
        toolkit.register(add_tool());
        let call = ToolCallRequest { id: "t1".to_string(), name: "add".to_string(), args: "not json".to_string() };
        let output = toolkit.execute(&call).await;
        assert!(output.error.unwrap().contains("parse failure"));
    }

    #[tokio::test]
    async fn schema_validation_failure_becomes_error_output() {
        let mut toolkit = Toolkit::new();
        toolkit.register(add_tool());
        let call = ToolCallRequest { id: "t1".to_string(), name: "add".to_string(), args: r#"{"a":2}"#.to_string() };
        let output = toolkit.execute(&call).await;
        assert!(output.error.unwrap().contains("schema validation"));
    }

    #[tokio::test]
    async fn unknown_tool_raises_in_strict_mode() {
        let toolkit = Toolkit::new().strict(true);
        let call = ToolCallRequest { id: "t1".to_string(), name: "missing".to_string(), args: "{}".to_string() };
        let err = toolkit.try_execute(&call).await.unwrap_err();
        assert!(matches!(err, MicError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn known_tool_still_executes_in_strict_mode() {
        let mut toolkit = Toolkit::new().strict(true);
        toolkit.register(add_tool());
        let call = ToolCallRequest { id: "t1".to_string(), name: "add".to_string(), args: r#"{"a":2,"b":3}"#.to_string() };
        let output = toolkit.try_execute(&call).await.unwrap();
        assert_eq!(output.result, serde_json::json!(5));
    }

    #[tokio::test]
    async fn handler_panic_becomes_error_output() {
        let mut toolkit = Toolkit::new();
        toolkit.register(Tool {
            schema: ToolSchema::new("boom", "panics", serde_json::json!({"type": "object"})),
            handler: Arc::new(|_| Box::pin(async move { panic!("kaboom") })),
        });
        let call = ToolCallRequest { id: "t1".to_string(), name: "boom".to_string(), args: "{}".to_string() };
        let output = toolkit.execute(&call).await;
        assert!(output.error.is_some());
    }
}
