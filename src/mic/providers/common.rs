//! Shared plumbing for the per-provider adapters: the pooled HTTP client,
//! HTTP-status-to-`ErrorKind` mapping, and a hand-rolled SSE line reader.

use crate::error::{ErrorKind, MicError};
use futures_util::{Stream, StreamExt};
use lazy_static::lazy_static;
use std::pin::Pin;
use std::time::Duration;

lazy_static! {
    /// Shared, pooled HTTP client reused by every provider adapter's
    /// non-streaming calls and SSE stream opens.
    pub static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build shared HTTP client");
}

/// Map a `reqwest` send failure to the canonical [`ErrorKind`]: a timed-out
/// request maps to `Timeout`, anything else that never reached a server
/// (DNS, TCP connect, TLS) maps to `Connection`.
pub fn classify_transport_error(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Connection
    }
}

/// Map an HTTP response's status to a [`MicError`], reading the body for the
/// `originalException` context. Call only on a non-2xx response.
pub async fn map_error_response(provider: &str, model_id: &str, response: reqwest::Response) -> MicError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let kind = ErrorKind::from_http_status(status);
    MicError::from_kind(kind, provider, model_id, Some(Box::new(HttpBodyError { status, body })))
}

#[derive(Debug)]
struct HttpBodyError {
    status: u16,
    body: String,
}

impl std::fmt::Display for HttpBodyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.body)
    }
}

impl std::error::Error for HttpBodyError {}

/// One `data: ...` payload parsed out of an `text/event-stream` response, or
/// `None` for a framing/keepalive line the caller should ignore (blank
/// lines, `event:` lines, `: comment` lines).
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))
}

/// Adapt a `reqwest::Response`'s byte stream into a stream of SSE `data:`
/// payloads (already stripped of the `data: ` prefix), splitting on `\n\n`
/// event boundaries. Hand-rolled over `futures_util` combinators rather than
/// pulling in a dedicated SSE parsing crate.
pub fn sse_data_events(response: reqwest::Response) -> Pin<Box<dyn Stream<Item = Result<String, reqwest::Error>> + Send>> {
    let byte_stream = response.bytes_stream();
    let buffered = futures_util::stream::unfold(
        (byte_stream, Vec::<u8>::new()),
        |(mut stream, mut buf)| async move {
            loop {
                if let Some(pos) = find_double_newline(&buf) {
                    let event_bytes = buf.drain(..pos + 2).collect::<Vec<u8>>();
                    let event = String::from_utf8_lossy(&event_bytes).to_string();
                    let data = event
                        .lines()
                        .filter_map(parse_sse_line)
                        .collect::<Vec<_>>()
                        .join("\n");
                    if data.is_empty() {
                        continue;
                    }
                    return Some((Ok(data), (stream, buf)));
                }
                match stream.next().await {
                    Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (stream, buf))),
                    None => {
                        if buf.is_empty() {
                            return None;
                        }
                        let event = String::from_utf8_lossy(&buf).to_string();
                        buf.clear();
                        let data = event.lines().filter_map(parse_sse_line).collect::<Vec<_>>().join("\n");
                        if data.is_empty() {
                            return None;
                        }
                        return Some((Ok(data), (stream, buf)));
                    }
                }
            }
        },
    );
    Box::pin(buffered)
}

fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}
