//! Black-box scenarios driving the public API against a hand-rolled mock
//! provider, with no network I/O involved.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mic::{
    AssistantPart, CallOverrides, CallRequest, DecodedCall, ErrorKind, FinishReason, Message,
    MicError, Model, Orchestrator, Provider, ProviderStreamEvent, RetryPolicy, Tool, ToolSchema,
    Toolkit, Usage,
};

fn register(provider: impl Provider + 'static) {
    mic::register_provider(Arc::new(provider));
}

fn assistant_text(model_id: &str, provider_id: &str, provider_model_name: &str, text: &str) -> Message {
    Message::Assistant {
        content: vec![AssistantPart::Text { text: text.to_string() }],
        provider_id: provider_id.to_string(),
        model_id: model_id.to_string(),
        provider_model_name: provider_model_name.to_string(),
        raw_message: None,
        name: None,
    }
}

/// A provider whose single call always succeeds with a fixed reply.
struct StaticTextProvider {
    id: &'static str,
    text: &'static str,
}

#[async_trait]
impl Provider for StaticTextProvider {
    fn provider_id(&self) -> &str {
        self.id
    }
    fn supports_strict_mode(&self, _model_name: &str) -> bool {
        false
    }
    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError> {
        Ok(DecodedCall {
            assistant_message: assistant_text(&request.model_id, self.id, &request.model_name, self.text),
            finish_reason: FinishReason::None,
            usage: Usage { input_tokens: 2, output_tokens: 3, ..Default::default() },
        })
    }
    async fn stream(&self, _request: CallRequest) -> Result<mic::provider::RawEventStream, MicError> {
        Err(MicError::FeatureNotSupported { provider: self.id.into(), model_id: "n/a".into(), feature: "stream".into() })
    }
}

#[tokio::test]
async fn normal_call_returns_text_and_usage() {
    mic::provider::reset_provider_registry();
    register(StaticTextProvider { id: "scenario1", text: "Hi there." });

    let model = Model::new("scenario1/model-a").unwrap();
    let response = model.call("Hello!", CallOverrides::default()).await.unwrap();

    assert_eq!(response.text(), "Hi there.");
    assert_eq!(response.finish_reason, FinishReason::None);
    assert_eq!(response.usage.total_tokens(), 5);
    mic::provider::reset_provider_registry();
}

/// A provider that always replies with a single tool call for `add`.
struct ToolCallingProvider;

#[async_trait]
impl Provider for ToolCallingProvider {
    fn provider_id(&self) -> &str {
        "scenario2"
    }
    fn supports_strict_mode(&self, _model_name: &str) -> bool {
        false
    }
    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError> {
        Ok(DecodedCall {
            assistant_message: Message::Assistant {
                content: vec![AssistantPart::ToolCall {
                    id: "t1".to_string(),
                    name: "add".to_string(),
                    args: r#"{"a":2,"b":3}"#.to_string(),
                }],
                provider_id: "scenario2".to_string(),
                model_id: request.model_id,
                provider_model_name: request.model_name,
                raw_message: None,
                name: None,
            },
            finish_reason: FinishReason::None,
            usage: Usage::default(),
        })
    }
    async fn stream(&self, _request: CallRequest) -> Result<mic::provider::RawEventStream, MicError> {
        unimplemented!("not exercised by this scenario")
    }
}

#[tokio::test]
async fn tool_use_executes_and_reports_result() {
    mic::provider::reset_provider_registry();
    register(ToolCallingProvider);

    let mut toolkit = Toolkit::new();
    toolkit.register(Tool {
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
                let a = args.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
                let b = args.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(serde_json::json!(a + b))
            })
        }),
    });

    let model = Model::new("scenario2/model-a").unwrap().with_toolkit(toolkit);
    let response = model.call("add 2 and 3", CallOverrides::default()).await.unwrap();
    let outputs = response.execute_tools().await;

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].id, "t1");
    assert_eq!(outputs[0].name, "add");
    assert_eq!(outputs[0].result, serde_json::json!(5));
    assert!(outputs[0].error.is_none());
    mic::provider::reset_provider_registry();
}

/// A provider whose raw stream replays a fixed event sequence: two text
/// deltas, a tool call split across two chunks, then finish.
struct StreamingProvider;

#[async_trait]
impl Provider for StreamingProvider {
    fn provider_id(&self) -> &str {
        "scenario3"
    }
    fn supports_strict_mode(&self, _model_name: &str) -> bool {
        false
    }
    async fn call(&self, _request: CallRequest) -> Result<DecodedCall, MicError> {
        unimplemented!("not exercised by this scenario")
    }
    async fn stream(&self, _request: CallRequest) -> Result<mic::provider::RawEventStream, MicError> {
        let events: Vec<Result<ProviderStreamEvent, MicError>> = vec![
            Ok(ProviderStreamEvent::TextDelta { delta: "foo".to_string() }),
            Ok(ProviderStreamEvent::TextDelta { delta: "bar".to_string() }),
            Ok(ProviderStreamEvent::ToolCallDelta {
                index: 0,
                id: Some("x".to_string()),
                name: Some("n".to_string()),
                delta: "{\"a\":".to_string(),
            }),
            Ok(ProviderStreamEvent::ToolCallDelta { index: 0, id: None, name: None, delta: "1}".to_string() }),
            Ok(ProviderStreamEvent::Finish { code: "stop".to_string(), usage: None }),
        ];
        Ok(Box::pin(futures_util::stream::iter(events)))
    }
}

#[tokio::test]
async fn streaming_chunk_order_matches_decoder_invariants() {
    mic::provider::reset_provider_registry();
    register(StreamingProvider);

    let model = Model::new("scenario3/model-a").unwrap();
    let mut stream = model.stream("go", CallOverrides::default()).await.unwrap();

    let mut kinds = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.unwrap() {
        kinds.push(match chunk {
            mic::StreamResponseChunk::TextStart => "TextStart",
            mic::StreamResponseChunk::TextChunk { .. } => "TextChunk",
            mic::StreamResponseChunk::TextEnd => "TextEnd",
            mic::StreamResponseChunk::ToolCallStart { .. } => "ToolCallStart",
            mic::StreamResponseChunk::ToolCallChunk { .. } => "ToolCallChunk",
            mic::StreamResponseChunk::ToolCallEnd { .. } => "ToolCallEnd",
            mic::StreamResponseChunk::FinishReasonChunk { .. } => "FinishReasonChunk",
            _ => "other",
        });
    }

    assert_eq!(
        kinds,
        vec![
            "TextStart", "TextChunk", "TextChunk", "TextEnd", "ToolCallStart", "ToolCallChunk", "ToolCallChunk",
            "ToolCallEnd", "FinishReasonChunk",
        ]
    );
    mic::provider::reset_provider_registry();
}

/// A provider that fails with a given `ErrorKind` a fixed number of times
/// before succeeding, counting attempts per process.
struct FlakyProvider {
    id: &'static str,
    fail_kind: ErrorKind,
    fail_times: usize,
    attempts: AtomicUsize,
}

impl FlakyProvider {
    fn new(id: &'static str, fail_kind: ErrorKind, fail_times: usize) -> Self {
        FlakyProvider { id, fail_kind, fail_times, attempts: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Provider for FlakyProvider {
    fn provider_id(&self) -> &str {
        self.id
    }
    fn supports_strict_mode(&self, _model_name: &str) -> bool {
        false
    }
    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            return Err(MicError::from_kind(self.fail_kind, self.id, request.model_id.as_str(), None));
        }
        Ok(DecodedCall {
            assistant_message: assistant_text(&request.model_id, self.id, &request.model_name, "recovered"),
            finish_reason: FinishReason::None,
            usage: Usage::default(),
        })
    }
    async fn stream(&self, _request: CallRequest) -> Result<mic::provider::RawEventStream, MicError> {
        unimplemented!("not exercised by this scenario")
    }
}

#[tokio::test]
async fn retry_succeeds_on_second_attempt_with_one_recorded_failure() {
    mic::provider::reset_provider_registry();
    register(FlakyProvider::new("scenario4", ErrorKind::RateLimit, 1));

    let model = Model::new("scenario4/model-a").unwrap();
    let policy = RetryPolicy {
        initial_delay: std::time::Duration::from_millis(0),
        max_delay: std::time::Duration::from_millis(0),
        backoff_multiplier: 2.0,
        jitter: 0.0,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(model, policy).unwrap();

    let (response, failures, _next) = orchestrator.call("Hello!", CallOverrides::default).await.unwrap();

    assert_eq!(response.text(), "recovered");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].exception, ErrorKind::RateLimit);
    mic::provider::reset_provider_registry();
}

/// A provider that always fails with the same retryable error, for exhausting
/// a variant's retry budget.
struct AlwaysFailsProvider {
    id: &'static str,
    kind: ErrorKind,
}

#[async_trait]
impl Provider for AlwaysFailsProvider {
    fn provider_id(&self) -> &str {
        self.id
    }
    fn supports_strict_mode(&self, _model_name: &str) -> bool {
        false
    }
    async fn call(&self, request: CallRequest) -> Result<DecodedCall, MicError> {
        Err(MicError::from_kind(self.kind, self.id, request.model_id.as_str(), None))
    }
    async fn stream(&self, _request: CallRequest) -> Result<mic::provider::RawEventStream, MicError> {
        unimplemented!("not exercised by this scenario")
    }
}

#[tokio::test]
async fn fallback_succeeds_after_primary_exhausts_retries() {
    mic::provider::reset_provider_registry();
    register(AlwaysFailsProvider { id: "scenario5-primary", kind: ErrorKind::Timeout });
    register(StaticTextProvider { id: "scenario5-fallback", text: "from fallback" });

    let primary = Model::new("scenario5-primary/model-a").unwrap();
    let fallback = Model::new("scenario5-fallback/model-a").unwrap();
    let policy = RetryPolicy {
        max_retries: 3,
        initial_delay: std::time::Duration::from_millis(0),
        max_delay: std::time::Duration::from_millis(0),
        fallback_models: vec![fallback],
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(primary, policy).unwrap();

    let (response, failures, next) = orchestrator.call("Hello!", CallOverrides::default).await.unwrap();

    assert_eq!(response.text(), "from fallback");
    assert_eq!(failures.len(), 4);
    assert_eq!(next.primary.id.provider_id(), "scenario5-fallback");
    mic::provider::reset_provider_registry();
}

#[tokio::test]
async fn non_retryable_error_propagates_without_sleeping_or_falling_back() {
    mic::provider::reset_provider_registry();
    register(AlwaysFailsProvider { id: "scenario6-primary", kind: ErrorKind::Authentication });
    register(StaticTextProvider { id: "scenario6-fallback", text: "should not be reached" });

    let primary = Model::new("scenario6-primary/model-a").unwrap();
    let fallback = Model::new("scenario6-fallback/model-a").unwrap();
    let policy = RetryPolicy { fallback_models: vec![fallback], ..Default::default() };
    let orchestrator = Orchestrator::new(primary, policy).unwrap();

    let start = std::time::Instant::now();
    let err = orchestrator.call("Hello!", CallOverrides::default).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, MicError::Authentication(_)));
    assert!(elapsed < std::time::Duration::from_millis(200));
    mic::provider::reset_provider_registry();
}

#[tokio::test]
async fn cancelling_during_retry_backoff_short_circuits_the_sleep() {
    mic::provider::reset_provider_registry();
    register(AlwaysFailsProvider { id: "scenario7", kind: ErrorKind::RateLimit });

    let model = Model::new("scenario7/model-a").unwrap();
    let policy = RetryPolicy {
        initial_delay: std::time::Duration::from_secs(60),
        max_delay: std::time::Duration::from_secs(60),
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(model, policy).unwrap();
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();

    let start = std::time::Instant::now();
    let err = orchestrator.call_cancellable("Hello!", CallOverrides::default, Some(&token)).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, MicError::Cancelled));
    assert!(elapsed < std::time::Duration::from_millis(500));
    mic::provider::reset_provider_registry();
}
