//! Response objects: the non-streaming [`Response`] and the
//! streaming [`StreamResponse`], plus their context-threading counterparts
//! [`ContextResponse`] and [`ContextStreamResponse`].
//!
//! [`StreamResponse`] follows the pull-based design called for by REDESIGN
//! FLAG "Streaming suspension": a single `next_chunk` primitive the caller
//! awaits repeatedly, with `collect`/`text_stream` built as convenience
//! wrappers on top, rather than implementing `futures::Stream` by hand for
//! every consumption shape.

use crate::error::MicError;
use crate::format::Format;
use crate::message::{AssistantPart, FinishReason, Message, Usage};
use crate::model::{CallContent, CallOverrides, Model};
use crate::provider::RawEventStream;
use crate::streaming::StreamResponseChunk;
use crate::tool::{ContextToolkit, ToolCallRequest, ToolOutput};
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;

fn assistant_tool_calls(message: &Message) -> Vec<ToolCallRequest> {
    match message {
        Message::Assistant { content, .. } => content
            .iter()
            .filter_map(|part| match part {
                AssistantPart::ToolCall { id, name, args } => {
                    Some(ToolCallRequest { id: id.clone(), name: name.clone(), args: args.clone() })
                }
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}

fn assistant_text(message: &Message) -> String {
    match message {
        Message::Assistant { content, .. } => content
            .iter()
            .filter_map(|part| match part {
                AssistantPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

fn assistant_thoughts(message: &Message) -> Vec<String> {
    match message {
        Message::Assistant { content, .. } => content
            .iter()
            .filter_map(|part| match part {
                AssistantPart::Thought { thought } => Some(thought.clone()),
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}

/// A non-streaming model response.
#[derive(Clone)]
pub struct Response {
    model: Model,
    pub input_messages: Vec<Message>,
    pub assistant_message: Message,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl Response {
    pub fn new(model: Model, input_messages: Vec<Message>, decoded: crate::provider::DecodedCall) -> Self {
        Response {
            model,
            input_messages,
            assistant_message: decoded.assistant_message,
            finish_reason: decoded.finish_reason,
            usage: decoded.usage,
        }
    }

    /// Concatenation of the assistant message's text parts.
    pub fn text(&self) -> String {
        assistant_text(&self.assistant_message)
    }

    /// The assistant's thought parts, possibly empty.
    pub fn thoughts(&self) -> Vec<String> {
        assistant_thoughts(&self.assistant_message)
    }

    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        assistant_tool_calls(&self.assistant_message)
    }

    pub fn raw_message(&self) -> Option<&serde_json::Value> {
        match &self.assistant_message {
            Message::Assistant { raw_message, .. } => raw_message.as_ref(),
            _ => None,
        }
    }

    /// Execute every tool call in the assistant message concurrently,
    /// preserving input order in the output.
    pub async fn execute_tools(&self) -> Vec<ToolOutput> {
        let calls = self.tool_calls();
        let Some(toolkit) = &self.model.toolkit else {
            return calls
                .iter()
                .map(|c| ToolOutput {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    result: serde_json::Value::Null,
                    error: Some("no toolkit configured on this model".to_string()),
                })
                .collect();
        };
        let futures = calls.iter().map(|call| toolkit.execute(call));
        futures_util::future::join_all(futures).await
    }

    /// Run the format's parser against this response's structured output
    /// payload, failing with [`MicError::ResponseValidation`] on mismatch
    ///
    /// Tool-mode/strict-mode formats read the synthetic
    /// `structured_output` tool call's arguments; json-mode reads the
    /// response text as a JSON document.
    pub fn format<T>(&self, format: &Format<T>) -> Result<T, MicError> {
        let provider = self.model.id.provider_id();
        let model_id = self.model.id.as_str();
        let raw = match format.mode {
            crate::format::FormatMode::Tool | crate::format::FormatMode::Strict => {
                let call = self
                    .tool_calls()
                    .into_iter()
                    .find(|c| c.name == crate::format::STRUCTURED_OUTPUT_TOOL_NAME)
                    .ok_or_else(|| MicError::ResponseValidation {
                        provider: provider.to_string(),
                        model_id: model_id.to_string(),
                        message: "no structured-output tool call found in response".to_string(),
                    })?;
                serde_json::from_str(&call.args).map_err(|e| MicError::ResponseValidation {
                    provider: provider.to_string(),
                    model_id: model_id.to_string(),
                    message: format!("structured-output arguments were not valid JSON: {}", e),
                })?
            }
            crate::format::FormatMode::Json => {
                serde_json::from_str(&self.text()).map_err(|e| MicError::ResponseValidation {
                    provider: provider.to_string(),
                    model_id: model_id.to_string(),
                    message: format!("response text was not valid JSON: {}", e),
                })?
            }
        };
        format.parse(&raw, provider, model_id)
    }

    /// Append `user{content}` to `[...messages, assistantMessage]` and
    /// invoke the owning model again.
    pub async fn resume(&self, content: impl Into<CallContent>) -> Result<Response, MicError> {
        let messages = self.resumed_messages(content.into());
        self.model.call(messages, CallOverrides::default()).await
    }

    pub async fn resume_stream(&self, content: impl Into<CallContent>) -> Result<StreamResponse, MicError> {
        let messages = self.resumed_messages(content.into());
        self.model.stream(messages, CallOverrides::default()).await
    }

    fn resumed_messages(&self, content: CallContent) -> Vec<Message> {
        let mut messages = self.input_messages.clone();
        messages.push(self.assistant_message.clone());
        match content {
            CallContent::Text(text) => messages.push(Message::user_text(text)),
            CallContent::UserParts(parts) => messages.push(Message::user(parts)),
            CallContent::Messages(mut more) => messages.append(&mut more),
        }
        messages
    }
}

/// Internal state a [`StreamResponse`] accumulates as it is driven, so that
/// `collect`/`tool_calls`/`text_stream` agree regardless of consumption order.
#[derive(Default)]
struct StreamAccumulator {
    text: String,
    current_thought: String,
    thoughts: Vec<String>,
    tool_calls: Vec<ToolCallRequest>,
    finish_reason: FinishReason,
    usage: Usage,
    raw_message: Option<serde_json::Value>,
}

impl StreamAccumulator {
    fn observe(&mut self, chunk: &StreamResponseChunk) {
        match chunk {
            StreamResponseChunk::TextChunk { delta } => self.text.push_str(delta),
            StreamResponseChunk::ThoughtChunk { delta } => self.current_thought.push_str(delta),
            StreamResponseChunk::ThoughtEnd => {
                self.thoughts.push(std::mem::take(&mut self.current_thought));
            }
            StreamResponseChunk::ToolCallStart { id, name } => {
                self.tool_calls.push(ToolCallRequest { id: id.clone(), name: name.clone(), args: String::new() });
            }
            StreamResponseChunk::ToolCallChunk { id, delta } => {
                if let Some(call) = self.tool_calls.iter_mut().find(|c| &c.id == id) {
                    call.args.push_str(delta);
                }
            }
            StreamResponseChunk::FinishReasonChunk { reason } => self.finish_reason = *reason,
            StreamResponseChunk::UsageDeltaChunk { usage } => {
                self.usage = std::mem::take(&mut self.usage) + usage.clone();
            }
            StreamResponseChunk::RawMessageChunk { raw } => self.raw_message = Some(raw.clone()),
            StreamResponseChunk::TextStart | StreamResponseChunk::ToolCallEnd { .. } | StreamResponseChunk::RawStreamEventChunk { .. } => {}
        }
    }

    /// Consume the accumulator into its final `(assistant message, finish
    /// reason, usage)` triple.
    fn finish(self, model: &Model) -> (Message, FinishReason, Usage) {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(AssistantPart::Text { text: self.text });
        }
        for thought in self.thoughts {
            parts.push(AssistantPart::Thought { thought });
        }
        for call in self.tool_calls {
            parts.push(AssistantPart::ToolCall { id: call.id, name: call.name, args: call.args });
        }
        let message = Message::Assistant {
            content: parts,
            provider_id: model.id.provider_id().to_string(),
            model_id: model.id.as_str().to_string(),
            provider_model_name: model.id.model_name().to_string(),
            raw_message: self.raw_message,
            name: None,
        };
        (message, self.finish_reason, self.usage)
    }
}

/// A streaming model response. Single-consumer: the chunk
/// sequence is lazy and non-restartable.
pub struct StreamResponse {
    model: Model,
    input_messages: Vec<Message>,
    raw: Option<RawEventStream>,
    decoder: crate::streaming::StreamDecoder,
    pending: VecDeque<StreamResponseChunk>,
    accumulator: StreamAccumulator,
    completed: Option<Response>,
    /// Set once the raw stream has been reported exhausted via `Ok(None)`;
    /// a further `next_chunk` call past that point means the single
    /// consumer is polling a stream it already drained, which is the
    /// "double consumption" `spec.md` §5 requires to fail loudly.
    terminated: bool,
}

impl StreamResponse {
    pub fn new(model: Model, input_messages: Vec<Message>, raw: RawEventStream) -> Self {
        StreamResponse {
            model,
            input_messages,
            raw: Some(raw),
            decoder: crate::streaming::StreamDecoder::new(),
            pending: VecDeque::new(),
            accumulator: StreamAccumulator::default(),
            completed: None,
            terminated: false,
        }
    }

    /// Pull the next canonical chunk, driving the underlying raw provider
    /// stream and decoder as needed. Returns `Ok(None)` once the stream is
    /// exhausted; polling again after that returns [`MicError::StreamAlreadyConsumed`].
    pub async fn next_chunk(&mut self) -> Result<Option<StreamResponseChunk>, MicError> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                self.accumulator.observe(&chunk);
                return Ok(Some(chunk));
            }
            let Some(raw) = self.raw.as_mut() else {
                if self.terminated {
                    return Err(MicError::StreamAlreadyConsumed);
                }
                self.terminated = true;
                return Ok(None);
            };
            match raw.next().await {
                Some(Ok(event)) => {
                    let chunks = self.decoder.feed(event)?;
                    self.pending.extend(chunks);
                    if self.pending.is_empty() {
                        continue;
                    }
                }
                Some(Err(e)) => {
                    self.raw = None;
                    self.terminated = true;
                    return Err(e);
                }
                None => {
                    self.raw = None;
                    continue;
                }
            }
        }
    }

    /// Drive the stream to completion and materialize a [`Response`].
    /// Idempotent: repeated calls return the cached result.
    pub async fn collect(&mut self) -> Result<&Response, MicError> {
        if self.completed.is_none() {
            while self.next_chunk().await?.is_some() {}
            let accumulator = std::mem::take(&mut self.accumulator);
            let (assistant_message, finish_reason, usage) = accumulator.finish(&self.model);
            self.completed = Some(Response {
                model: self.model.clone(),
                input_messages: self.input_messages.clone(),
                assistant_message,
                finish_reason,
                usage,
            });
        }
        Ok(self.completed.as_ref().expect("just populated"))
    }

    /// Concatenation of `TextChunk` deltas up to the first `TextEnd`.
    /// Still drives the underlying chunk sequence forward;
    /// call `collect` afterward to retrieve tool calls/usage/finish reason.
    pub async fn text_stream(&mut self) -> Result<String, MicError> {
        if let Some(completed) = &self.completed {
            return Ok(completed.text());
        }
        loop {
            match self.next_chunk().await? {
                Some(StreamResponseChunk::TextEnd) | None => break,
                Some(_) => continue,
            }
        }
        Ok(self.accumulator.text.clone())
    }

    /// Available only after [`StreamResponse::collect`] has run.
    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.completed.as_ref().map(|r| r.tool_calls()).unwrap_or_default()
    }

    /// Release the underlying transport and close any open decoder block
    /// without emitting its `End` chunk.
    pub fn cancel(&mut self) {
        self.decoder.cancel();
        self.raw = None;
    }
}

/// The context parameter threaded through [`ContextResponse::execute_tools`]
/// and [`ContextResponse::resume`].
pub struct ContextResponse<Ctx: Send + Sync + 'static> {
    pub response: Response,
    pub ctx: Arc<Ctx>,
    pub toolkit: Arc<dyn ContextToolkit<Ctx>>,
}

impl<Ctx: Send + Sync + 'static> ContextResponse<Ctx> {
    pub async fn execute_tools(&self) -> Vec<ToolOutput> {
        let calls = self.response.tool_calls();
        let futures = calls.iter().map(|call| self.toolkit.execute_with_context(call, &self.ctx));
        futures_util::future::join_all(futures).await
    }

    pub async fn resume(&self, content: impl Into<CallContent>, model: &Model) -> Result<Response, MicError> {
        let mut messages = self.response.input_messages.clone();
        messages.push(self.response.assistant_message.clone());
        match content.into() {
            CallContent::Text(text) => messages.push(Message::user_text(text)),
            CallContent::UserParts(parts) => messages.push(Message::user(parts)),
            CallContent::Messages(mut more) => messages.append(&mut more),
        }
        model.call(messages, CallOverrides::default()).await
    }
}

/// The streaming counterpart of [`ContextResponse`]: wraps a [`StreamResponse`]
/// with the context value and [`ContextToolkit`] needed to execute the tool
/// calls it accumulates.
pub struct ContextStreamResponse<Ctx: Send + Sync + 'static> {
    pub stream: StreamResponse,
    pub ctx: Arc<Ctx>,
    pub toolkit: Arc<dyn ContextToolkit<Ctx>>,
}

impl<Ctx: Send + Sync + 'static> ContextStreamResponse<Ctx> {
    /// Pull the next decoded chunk. See [`StreamResponse::next_chunk`].
    pub async fn next_chunk(&mut self) -> Result<Option<StreamResponseChunk>, MicError> {
        self.stream.next_chunk().await
    }

    /// Drain the stream into a completed [`Response`]. See [`StreamResponse::collect`].
    pub async fn collect(&mut self) -> Result<&Response, MicError> {
        self.stream.collect().await
    }

    pub async fn text_stream(&mut self) -> Result<String, MicError> {
        self.stream.text_stream().await
    }

    /// Tool calls accumulated so far; reliable only once the stream has been
    /// drained via [`ContextStreamResponse::collect`].
    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.stream.tool_calls()
    }

    pub fn cancel(&mut self) {
        self.stream.cancel()
    }

    /// Execute every accumulated tool call concurrently against `ctx`,
    /// preserving input order in the output. Call after [`ContextStreamResponse::collect`].
    pub async fn execute_tools(&self) -> Vec<ToolOutput> {
        let calls = self.tool_calls();
        let futures = calls.iter().map(|call| self.toolkit.execute_with_context(call, &self.ctx));
        futures_util::future::join_all(futures).await
    }

    /// Append `user{content}` to `[...messages, assistantMessage]` of the
    /// collected response and invoke `model` again.
    pub async fn resume(&mut self, content: impl Into<CallContent>, model: &Model) -> Result<Response, MicError> {
        let response = self.collect().await?.clone();
        let mut messages = response.input_messages.clone();
        messages.push(response.assistant_message.clone());
        match content.into() {
            CallContent::Text(text) => messages.push(Message::user_text(text)),
            CallContent::UserParts(parts) => messages.push(Message::user(parts)),
            CallContent::Messages(mut more) => messages.append(&mut more),
        }
        model.call(messages, CallOverrides::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DecodedCall;
    use crate::tool::Toolkit;

    fn test_model() -> Model {
        Model::new("anthropic/claude-sonnet-4-5").unwrap()
    }

    fn assistant(text: &str) -> Message {
        Message::Assistant {
            content: vec![AssistantPart::Text { text: text.to_string() }],
            provider_id: "anthropic".to_string(),
            model_id: "anthropic/claude-sonnet-4-5".to_string(),
            provider_model_name: "claude-sonnet-4-5".to_string(),
            raw_message: None,
            name: None,
        }
    }

    #[test]
    fn response_text_matches_assistant_text_parts() {
        let response = Response::new(
            test_model(),
            vec![Message::user_text("Hello!")],
            DecodedCall {
                assistant_message: assistant("Hi there."),
                finish_reason: FinishReason::None,
                usage: Usage { input_tokens: 2, output_tokens: 3, ..Default::default() },
            },
        );
        assert_eq!(response.text(), "Hi there.");
        assert_eq!(response.finish_reason, FinishReason::None);
        assert_eq!(response.usage.total_tokens(), 5);
    }

    #[tokio::test]
    async fn execute_tools_runs_and_preserves_order() {
        let mut toolkit = Toolkit::new();
        toolkit.register(crate::tool::Tool {
            schema: crate::tool::ToolSchema::new(
                "add",
                "add two numbers",
                serde_json::json!({"type": "object", "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}}, "required": ["a", "b"]}),
            ),
            handler: Arc::new(|args| {
                Box::pin(async move {
                    let a = args.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
                    let b = args.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
                    Ok(serde_json::json!(a + b))
                })
            }),
        });
        let model = test_model().with_toolkit(toolkit);
        let response = Response::new(
            model,
            vec![],
            DecodedCall {
                assistant_message: Message::Assistant {
                    content: vec![AssistantPart::ToolCall { id: "t1".to_string(), name: "add".to_string(), args: r#"{"a":2,"b":3}"#.to_string() }],
                    provider_id: "anthropic".to_string(),
                    model_id: "anthropic/claude-sonnet-4-5".to_string(),
                    provider_model_name: "claude-sonnet-4-5".to_string(),
                    raw_message: None,
                    name: None,
                },
                finish_reason: FinishReason::None,
                usage: Usage::default(),
            },
        );
        let outputs = response.execute_tools().await;
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].id, "t1");
        assert_eq!(outputs[0].result, serde_json::json!(5));
        assert!(outputs[0].error.is_none());
    }

    #[tokio::test]
    async fn collected_stream_text_matches_text_stream_concatenation() {
        use crate::streaming::ProviderStreamEvent;

        let events: Vec<Result<ProviderStreamEvent, MicError>> = vec![
            Ok(ProviderStreamEvent::TextDelta { delta: "foo".to_string() }),
            Ok(ProviderStreamEvent::TextDelta { delta: "bar".to_string() }),
            Ok(ProviderStreamEvent::Finish { code: "stop".to_string(), usage: None }),
        ];
        let raw: RawEventStream = Box::pin(futures_util::stream::iter(events));
        let mut stream_response = StreamResponse::new(test_model(), vec![], raw);
        let streamed_text = stream_response.text_stream().await.unwrap();
        let collected = stream_response.collect().await.unwrap();
        assert_eq!(collected.text(), "foobar");
        assert_eq!(streamed_text, "foobar");
    }

    #[tokio::test]
    async fn text_stream_after_collect_observes_cached_completion() {
        use crate::streaming::ProviderStreamEvent;

        let events: Vec<Result<ProviderStreamEvent, MicError>> = vec![
            Ok(ProviderStreamEvent::TextDelta { delta: "foo".to_string() }),
            Ok(ProviderStreamEvent::TextDelta { delta: "bar".to_string() }),
            Ok(ProviderStreamEvent::Finish { code: "stop".to_string(), usage: None }),
        ];
        let raw: RawEventStream = Box::pin(futures_util::stream::iter(events));
        let mut stream_response = StreamResponse::new(test_model(), vec![], raw);
        stream_response.collect().await.unwrap();
        // Calling text_stream after collect must still observe "foobar",
        // not the emptied in-flight accumulator.
        let streamed_text = stream_response.text_stream().await.unwrap();
        assert_eq!(streamed_text, "foobar");
    }

    #[tokio::test]
    async fn next_chunk_after_exhaustion_raises_stream_already_consumed() {
        use crate::streaming::ProviderStreamEvent;

        let events: Vec<Result<ProviderStreamEvent, MicError>> = vec![
            Ok(ProviderStreamEvent::TextDelta { delta: "hi".to_string() }),
            Ok(ProviderStreamEvent::Finish { code: "stop".to_string(), usage: None }),
        ];
        let raw: RawEventStream = Box::pin(futures_util::stream::iter(events));
        let mut stream_response = StreamResponse::new(test_model(), vec![], raw);
        while stream_response.next_chunk().await.unwrap().is_some() {}
        let err = stream_response.next_chunk().await.unwrap_err();
        assert!(matches!(err, MicError::StreamAlreadyConsumed));
    }

    struct CtxEchoProvider;

    #[async_trait::async_trait]
    impl crate::provider::Provider for CtxEchoProvider {
        fn provider_id(&self) -> &str {
            "ctxecho"
        }
        fn supports_strict_mode(&self, _model_name: &str) -> bool {
            false
        }
        async fn call(&self, request: crate::provider::CallRequest) -> Result<DecodedCall, MicError> {
            Ok(DecodedCall {
                assistant_message: Message::Assistant {
                    content: vec![AssistantPart::ToolCall { id: "t1".to_string(), name: "lookup".to_string(), args: "{}".to_string() }],
                    provider_id: "ctxecho".to_string(),
                    model_id: request.model_id,
                    provider_model_name: request.model_name,
                    raw_message: None,
                    name: None,
                },
                finish_reason: FinishReason::None,
                usage: Usage::default(),
            })
        }
        async fn stream(&self, _request: crate::provider::CallRequest) -> Result<RawEventStream, MicError> {
            use crate::streaming::ProviderStreamEvent;
            let events: Vec<Result<ProviderStreamEvent, MicError>> =
                vec![Ok(ProviderStreamEvent::TextDelta { delta: "hi".to_string() }), Ok(ProviderStreamEvent::Finish { code: "stop".to_string(), usage: None })];
            Ok(Box::pin(futures_util::stream::iter(events)))
        }
    }

    struct CountingToolkit;

    #[async_trait::async_trait]
    impl crate::tool::ContextToolkit<std::sync::atomic::AtomicUsize> for CountingToolkit {
        async fn execute_with_context(&self, call: &ToolCallRequest, ctx: &std::sync::atomic::AtomicUsize) -> ToolOutput {
            ctx.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            ToolOutput { id: call.id.clone(), name: call.name.clone(), result: serde_json::json!("ok"), error: None }
        }
        fn schemas(&self) -> Vec<crate::tool::ToolSchema> {
            vec![]
        }
    }

    #[tokio::test]
    async fn context_call_threads_ctx_into_execute_tools() {
        crate::provider::reset_provider_registry();
        crate::provider::register_provider(Arc::new(CtxEchoProvider));
        let model = Model::new("ctxecho/model").unwrap();
        let ctx = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let toolkit: Arc<dyn ContextToolkit<std::sync::atomic::AtomicUsize>> = Arc::new(CountingToolkit);
        let context_response = model.context_call("hi", CallOverrides::default(), ctx.clone(), toolkit).await.unwrap();
        let outputs = context_response.execute_tools().await;
        assert_eq!(outputs.len(), 1);
        assert_eq!(ctx.load(std::sync::atomic::Ordering::SeqCst), 1);
        crate::provider::reset_provider_registry();
    }

    #[tokio::test]
    async fn context_stream_collects_and_executes_with_shared_ctx() {
        crate::provider::reset_provider_registry();
        crate::provider::register_provider(Arc::new(CtxEchoProvider));
        let model = Model::new("ctxecho/model").unwrap();
        let ctx = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let toolkit: Arc<dyn ContextToolkit<std::sync::atomic::AtomicUsize>> = Arc::new(CountingToolkit);
        let mut context_stream = model.context_stream("hi", CallOverrides::default(), ctx.clone(), toolkit).await.unwrap();
        let collected = context_stream.collect().await.unwrap();
        assert_eq!(collected.text(), "hi");
        let outputs = context_stream.execute_tools().await;
        assert!(outputs.is_empty());
        crate::provider::reset_provider_registry();
    }
}
