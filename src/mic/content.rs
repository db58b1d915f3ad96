//! Normalized content parts, independent of any provider wire format.
//!
//! [`ContentPart`] is the closed sum type every [`crate::message::Message`] variant is
//! built from. Factories here enforce size limits and magic-byte type inference
//! so callers get a typed, validated part instead of a loose `(bytes, mime)` pair.
//!
//! # Example
//!
//! ```rust
//! use mic::content::ContentPart;
//!
//! let png_bytes = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0];
//! let part = ContentPart::image_from_bytes(&png_bytes).unwrap();
//! assert!(matches!(part, ContentPart::Image { .. }));
//! ```

use crate::error::MicError;
use base64::Engine;

/// Images larger than this are rejected.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
/// Audio larger than this is rejected.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Recognized audio codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMime {
    Wav,
    Mp3,
    Aiff,
    Aac,
    Ogg,
    Flac,
}

impl AudioMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMime::Wav => "audio/wav",
            AudioMime::Mp3 => "audio/mpeg",
            AudioMime::Aiff => "audio/aiff",
            AudioMime::Aac => "audio/aac",
            AudioMime::Ogg => "audio/ogg",
            AudioMime::Flac => "audio/flac",
        }
    }
}

/// Where a binary or text-sourced content part's bytes come from.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// Standard (non-URL-safe) base64, as required for embedding in data URIs.
    Base64 { data: String, mime: String },
    /// A reference the provider fetches itself; MIC never downloads this
    /// unless the caller explicitly asks.
    Url { url: String },
    /// Inline document text (documents only).
    Text { data: String, mime: String },
}

/// A single tagged content part.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text { text: String },
    /// Assistant-only; dropped or rendered as text depending on `params.thinking`.
    Thought { thought: String },
    Image { source: MediaSource },
    Audio { source: MediaSource },
    Document { source: MediaSource },
    /// `args` is a JSON string, possibly incremental mid-stream.
    ToolCall { id: String, name: String, args: String },
    ToolOutput {
        id: String,
        name: String,
        result: ToolOutputResult,
        error: Option<String>,
    },
}

/// A tool's result payload: either structured JSON or a plain string.
#[derive(Debug, Clone)]
pub enum ToolOutputResult {
    Value(serde_json::Value),
    Text(String),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn thought(thought: impl Into<String>) -> Self {
        ContentPart::Thought { thought: thought.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::Image { source: MediaSource::Url { url: url.into() } }
    }

    pub fn document_url(url: impl Into<String>) -> Self {
        ContentPart::Document { source: MediaSource::Url { url: url.into() } }
    }

    /// Classify raw image bytes by magic number, enforce the size limit, and
    /// base64-encode them into an [`ContentPart::Image`].
    ///
    /// Fails with [`MicError::UnsupportedMediaType`] when the magic bytes don't
    /// match a recognized image format, or when `bytes.len()` exceeds
    /// [`MAX_IMAGE_BYTES`].
    pub fn image_from_bytes(bytes: &[u8]) -> Result<Self, MicError> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(MicError::UnsupportedMediaType {
                message: format!("image of {} bytes exceeds the {} byte limit", bytes.len(), MAX_IMAGE_BYTES),
            });
        }
        let mime = sniff_image_mime(bytes).ok_or_else(|| MicError::UnsupportedMediaType {
            message: "unrecognized image magic bytes (expected JPEG/PNG/GIF/WEBP/HEIC)".to_string(),
        })?;
        Ok(ContentPart::Image {
            source: MediaSource::Base64 { data: encode_base64(bytes), mime: mime.to_string() },
        })
    }

    /// Classify raw audio bytes by magic number, enforce the size limit, and
    /// base64-encode them into an [`ContentPart::Audio`].
    pub fn audio_from_bytes(bytes: &[u8]) -> Result<Self, MicError> {
        if bytes.len() > MAX_AUDIO_BYTES {
            return Err(MicError::UnsupportedMediaType {
                message: format!("audio of {} bytes exceeds the {} byte limit", bytes.len(), MAX_AUDIO_BYTES),
            });
        }
        let mime = sniff_audio_mime(bytes).ok_or_else(|| MicError::UnsupportedMediaType {
            message: "unrecognized audio magic bytes (expected WAV/MP3/AIFF/OGG/FLAC/AAC)".to_string(),
        })?;
        Ok(ContentPart::Audio {
            source: MediaSource::Base64 { data: encode_base64(bytes), mime: mime.as_str().to_string() },
        })
    }

    /// Build a document part from already-known bytes and an explicit mime type
    /// (documents, unlike images/audio, are not restricted to a closed magic-byte
    /// table — callers commonly attach arbitrary PDFs/text files).
    pub fn document_from_bytes(bytes: &[u8], mime: impl Into<String>) -> Self {
        ContentPart::Document {
            source: MediaSource::Base64 { data: encode_base64(bytes), mime: mime.into() },
        }
    }

    pub fn document_text(data: impl Into<String>, mime: impl Into<String>) -> Self {
        ContentPart::Document { source: MediaSource::Text { data: data.into(), mime: mime.into() } }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, args: impl Into<String>) -> Self {
        ContentPart::ToolCall { id: id.into(), name: name.into(), args: args.into() }
    }

    pub fn tool_output_value(id: impl Into<String>, name: impl Into<String>, result: serde_json::Value) -> Self {
        ContentPart::ToolOutput {
            id: id.into(),
            name: name.into(),
            result: ToolOutputResult::Value(result),
            error: None,
        }
    }

    pub fn tool_output_error(id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        ContentPart::ToolOutput {
            id: id.into(),
            name: name.into(),
            result: ToolOutputResult::Text(String::new()),
            error: Some(error.into()),
        }
    }
}

fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Sniff an image mime type from magic bytes. Returns `None` when unrecognized.
fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && matches!(&bytes[8..12], b"heic" | b"heix" | b"mif1" | b"msf1") {
        return Some("image/heic");
    }
    None
}

/// Sniff an audio mime type from magic bytes. Returns `None` when unrecognized.
fn sniff_audio_mime(bytes: &[u8]) -> Option<AudioMime> {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return Some(AudioMime::Wav);
    }
    if bytes.starts_with(&[0xFF, 0xFB]) || bytes.starts_with(&[0xFF, 0xF3]) || bytes.starts_with(&[0xFF, 0xF2]) || bytes.starts_with(b"ID3") {
        return Some(AudioMime::Mp3);
    }
    if bytes.starts_with(b"FORM") && bytes.len() >= 12 && &bytes[8..12] == b"AIFF" {
        return Some(AudioMime::Aiff);
    }
    if bytes.starts_with(b"OggS") {
        return Some(AudioMime::Ogg);
    }
    if bytes.starts_with(b"fLaC") {
        return Some(AudioMime::Flac);
    }
    if bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xF6) == 0xF0 {
        return Some(AudioMime::Aac);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_png_magic_bytes() {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let part = ContentPart::image_from_bytes(&bytes).unwrap();
        match part {
            ContentPart::Image { source: MediaSource::Base64 { mime, .. } } => assert_eq!(mime, "image/png"),
            _ => panic!("expected image part"),
        }
    }

    #[test]
    fn rejects_unrecognized_image_bytes() {
        let err = ContentPart::image_from_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, MicError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn rejects_oversized_image() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
            .into_iter()
            .chain(std::iter::repeat(0u8).take(MAX_IMAGE_BYTES))
            .collect::<Vec<u8>>();
        let err = ContentPart::image_from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, MicError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn recognizes_wav_magic_bytes() {
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(b"WAVE");
        let part = ContentPart::audio_from_bytes(&bytes).unwrap();
        match part {
            ContentPart::Audio { source: MediaSource::Base64 { mime, .. } } => assert_eq!(mime, "audio/wav"),
            _ => panic!("expected audio part"),
        }
    }
}
