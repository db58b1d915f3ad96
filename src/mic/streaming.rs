//! The per-request streaming decoder.
//!
//! [`StreamDecoder`] is a small state machine that turns a provider's raw,
//! heterogeneous streaming events into the canonical [`StreamResponseChunk`]
//! sequence, enforcing block-boundary invariants: start/end events balance
//! per kind, tool-call chunks only appear between their matching start/end,
//! and tool-call indices never go backwards.

use crate::message::FinishReason;
use crate::message::Usage;

/// One event emitted by a provider's raw stream, already lifted out of its
/// wire-specific shape by the provider adapter. The decoder consumes a
/// sequence of these and emits [`StreamResponseChunk`]s.
#[derive(Debug, Clone)]
pub enum ProviderStreamEvent {
    TextDelta { delta: String },
    ThoughtDelta { delta: String },
    /// `id`/`name` MUST be present on the first delta for a given `index`
    /// — absence there is fatal.
    ToolCallDelta { index: u32, id: Option<String>, name: Option<String>, delta: String },
    /// The provider's terminal marker: closes open blocks, reports the
    /// finish reason, and optionally carries final usage.
    Finish { code: String, usage: Option<Usage> },
    /// Passed through verbatim as `RawStreamEventChunk`.
    Raw { raw: serde_json::Value },
    /// The provider's final serialized message, for `RawMessageChunk` /
    /// `raw_message` round-trip.
    FinalMessage { raw: serde_json::Value },
}

/// The canonical, typed chunk sequence a [`crate::response::StreamResponse`]
/// yields.
#[derive(Debug, Clone)]
pub enum StreamResponseChunk {
    TextStart,
    TextChunk { delta: String },
    TextEnd,
    ThoughtStart,
    ThoughtChunk { delta: String },
    ThoughtEnd,
    ToolCallStart { id: String, name: String },
    ToolCallChunk { id: String, delta: String },
    ToolCallEnd { id: String },
    FinishReasonChunk { reason: FinishReason },
    UsageDeltaChunk { usage: Usage },
    RawStreamEventChunk { raw: serde_json::Value },
    RawMessageChunk { raw: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq)]
enum DecoderState {
    Idle,
    InText,
    InThought,
    InToolCall { index: u32, id: String },
}

/// Per-stream decoder state. One instance per request; never shared across
/// streams.
#[derive(Debug)]
pub struct StreamDecoder {
    state: DecoderState,
    closed: bool,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        StreamDecoder { state: DecoderState::Idle, closed: false }
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw provider event, producing zero or more canonical chunks.
    ///
    /// Returns `Err(MicError::DecoderInvariant)` on an out-of-order tool-call
    /// index or a tool-call delta missing `id`/`name` on its first chunk for
    /// that index — both are fatal protocol-drift errors,
    /// not retryable.
    pub fn feed(&mut self, event: ProviderStreamEvent) -> Result<Vec<StreamResponseChunk>, crate::error::MicError> {
        if self.closed {
            return Ok(vec![]);
        }
        let mut out = Vec::new();
        match event {
            ProviderStreamEvent::TextDelta { delta } => {
                self.enter_text(&mut out);
                out.push(StreamResponseChunk::TextChunk { delta });
            }
            ProviderStreamEvent::ThoughtDelta { delta } => {
                self.enter_thought(&mut out);
                out.push(StreamResponseChunk::ThoughtChunk { delta });
            }
            ProviderStreamEvent::ToolCallDelta { index, id, name, delta } => {
                self.feed_tool_call(index, id, name, delta, &mut out)?;
            }
            ProviderStreamEvent::Finish { code, usage } => {
                self.close_open_block(&mut out);
                out.push(StreamResponseChunk::FinishReasonChunk { reason: FinishReason::from_provider_code(&code) });
                if let Some(usage) = usage {
                    out.push(StreamResponseChunk::UsageDeltaChunk { usage });
                }
                self.closed = true;
            }
            ProviderStreamEvent::Raw { raw } => {
                out.push(StreamResponseChunk::RawStreamEventChunk { raw });
            }
            ProviderStreamEvent::FinalMessage { raw } => {
                out.push(StreamResponseChunk::RawMessageChunk { raw });
            }
        }
        Ok(out)
    }

    /// Close any still-open block without emitting its `End` chunk to the
    /// consumer, per the cancellation semantics in §5.
    pub fn cancel(&mut self) {
        self.state = DecoderState::Idle;
        self.closed = true;
    }

    fn enter_text(&mut self, out: &mut Vec<StreamResponseChunk>) {
        if self.state == DecoderState::InText {
            return;
        }
        self.close_open_block(out);
        out.push(StreamResponseChunk::TextStart);
        self.state = DecoderState::InText;
    }

    fn enter_thought(&mut self, out: &mut Vec<StreamResponseChunk>) {
        if self.state == DecoderState::InThought {
            return;
        }
        self.close_open_block(out);
        out.push(StreamResponseChunk::ThoughtStart);
        self.state = DecoderState::InThought;
    }

    fn feed_tool_call(
        &mut self,
        index: u32,
        id: Option<String>,
        name: Option<String>,
        delta: String,
        out: &mut Vec<StreamResponseChunk>,
    ) -> Result<(), crate::error::MicError> {
        match &self.state {
            DecoderState::InToolCall { index: current_index, id: current_id } if *current_index == index => {
                out.push(StreamResponseChunk::ToolCallChunk { id: current_id.clone(), delta });
                Ok(())
            }
            DecoderState::InToolCall { index: current_index, .. } if index < *current_index => {
                Err(crate::error::MicError::DecoderInvariant {
                    message: format!("tool-call index regressed from {} to {}", current_index, index),
                })
            }
            _ => {
                self.close_open_block(out);
                let (id, name) = match (id, name) {
                    (Some(id), Some(name)) => (id, name),
                    _ => {
                        return Err(crate::error::MicError::DecoderInvariant {
                            message: format!("tool-call at index {} opened without id/name on its first chunk", index),
                        })
                    }
                };
                out.push(StreamResponseChunk::ToolCallStart { id: id.clone(), name });
                out.push(StreamResponseChunk::ToolCallChunk { id: id.clone(), delta });
                self.state = DecoderState::InToolCall { index, id };
                Ok(())
            }
        }
    }

    fn close_open_block(&mut self, out: &mut Vec<StreamResponseChunk>) {
        match std::mem::replace(&mut self.state, DecoderState::Idle) {
            DecoderState::Idle => {}
            DecoderState::InText => out.push(StreamResponseChunk::TextEnd),
            DecoderState::InThought => out.push(StreamResponseChunk::ThoughtEnd),
            DecoderState::InToolCall { id, .. } => out.push(StreamResponseChunk::ToolCallEnd { id }),
        }
    }
}
