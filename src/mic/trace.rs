//! The trace/observability seam MIC exposes to its caller.
//!
//! Tracing, analytics ingestion, and persistence are explicitly out of
//! scope — this module only defines the narrow interface the core calls
//! into, never what's on the other side of it. Cut down to four hooks:
//! request start, stream chunk, request end, and error.

use async_trait::async_trait;

/// Hooks a caller can install to observe request lifecycle events without
/// the core ever blocking on their completion.
#[async_trait]
pub trait TraceHook: Send + Sync {
    async fn on_request_start(&self, provider: &str, model_id: &str) {
        let _ = (provider, model_id);
    }

    async fn on_chunk(&self, provider: &str, model_id: &str, chunk: &crate::streaming::StreamResponseChunk) {
        let _ = (provider, model_id, chunk);
    }

    async fn on_request_end(&self, provider: &str, model_id: &str) {
        let _ = (provider, model_id);
    }

    async fn on_error(&self, provider: &str, model_id: &str, error: &crate::error::MicError) {
        let _ = (provider, model_id, error);
    }
}

/// A hook that does nothing; the default when no tracing is configured.
pub struct NoopTraceHook;

#[async_trait]
impl TraceHook for NoopTraceHook {}

/// Fire `hook.on_request_end` without awaiting its completion: the core
/// never blocks on hook return, so this is spawned onto the runtime and
/// the caller's request path proceeds immediately.
pub fn notify_request_end(hook: std::sync::Arc<dyn TraceHook>, provider: String, model_id: String) {
    tokio::spawn(async move { hook.on_request_end(&provider, &model_id).await });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_hook_does_nothing_observable() {
        let hook = NoopTraceHook;
        hook.on_request_start("anthropic", "anthropic/claude-sonnet-4-5").await;
        hook.on_request_end("anthropic", "anthropic/claude-sonnet-4-5").await;
    }
}
