//! The error taxonomy surfaced at the MIC boundary.
//!
//! Every error exposes the provider and model identifier it was raised
//! against, and transport-shaped errors preserve the underlying cause via
//! `#[source]` so nothing is lost in the mapping from a provider's wire error
//! to the canonical [`ErrorKind`].
//!
//! # Example
//!
//! ```rust
//! use mic::error::{ErrorKind, MicError};
//!
//! let err = MicError::rate_limit("anthropic", "anthropic/claude-sonnet-4-5", None);
//! assert_eq!(err.kind(), Some(ErrorKind::RateLimit));
//! assert!(err.retryable());
//! ```

use std::fmt;

/// Boxed transport/decoder cause, preserved verbatim as `originalException`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The coarse retry-relevant classification of a provider-facing failure.
///
/// This is the tag stored in a [`crate::retry::RetryFailure`] — lightweight and
/// `Copy` so a failure trail can be accumulated without cloning the original
/// error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    Permission,
    BadRequest,
    NotFound,
    RateLimit,
    Server,
    Connection,
    Timeout,
    Api,
}

impl ErrorKind {
    /// Map an HTTP status code to its canonical [`ErrorKind`].
    pub fn from_http_status(status: u16) -> ErrorKind {
        match status {
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Permission,
            400 => ErrorKind::BadRequest,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimit,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Api,
        }
    }

    /// The default retryable set: `{Connection, RateLimit, Server, Timeout}`.
    pub fn default_retryable() -> &'static [ErrorKind] {
        &[
            ErrorKind::Connection,
            ErrorKind::RateLimit,
            ErrorKind::Server,
            ErrorKind::Timeout,
        ]
    }

    pub fn is_retryable_by_default(&self) -> bool {
        Self::default_retryable().contains(self)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Permission => "permission",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Server => "server",
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Api => "api",
        };
        write!(f, "{}", s)
    }
}

/// Context shared by every transport-shaped error variant.
#[derive(Debug)]
pub struct ProviderContext {
    pub provider: String,
    pub model_id: String,
    pub original: Option<BoxError>,
}

/// The full MIC error taxonomy.
///
/// Transport-shaped variants (`Authentication` through `Api`) carry a
/// [`ProviderContext`]; decode/validation/tool/registry errors carry just
/// what they need to name the failure precisely.
#[derive(Debug, thiserror::Error)]
pub enum MicError {
    #[error("authentication failed for {provider}/{model_id}")]
    Authentication(ProviderContext),

    #[error("permission denied for {provider}/{model_id}")]
    Permission(ProviderContext),

    #[error("bad request to {provider}/{model_id}")]
    BadRequest(ProviderContext),

    #[error("model not found: {provider}/{model_id}")]
    NotFound(ProviderContext),

    #[error("rate limited by {provider}/{model_id}")]
    RateLimit(ProviderContext),

    #[error("server error from {provider}/{model_id}")]
    Server(ProviderContext),

    #[error("connection failure reaching {provider}/{model_id}")]
    Connection(ProviderContext),

    #[error("request to {provider}/{model_id} timed out")]
    Timeout(ProviderContext),

    #[error("unclassified API error from {provider}/{model_id}")]
    Api(ProviderContext),

    #[error("response from {provider}/{model_id} failed validation: {message}")]
    ResponseValidation {
        provider: String,
        model_id: String,
        message: String,
    },

    #[error("tool error: {message}")]
    Tool { message: String },

    #[error("tool '{tool_name}' failed to execute: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("the model invoked unknown tool '{tool_name}'")]
    ToolNotFound { tool_name: String },

    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("{provider}/{model_id} does not support {feature}")]
    FeatureNotSupported {
        provider: String,
        model_id: String,
        feature: String,
    },

    #[error("no provider registered for identifier prefix '{provider_id}'")]
    NoRegisteredProvider { provider_id: String },

    #[error("missing API key for provider '{provider}'")]
    MissingApiKey { provider: String },

    #[error("invalid model identifier '{identifier}': {reason}")]
    InvalidModelIdentifier { identifier: String, reason: String },

    #[error("invalid retry policy: {reason}")]
    InvalidRetryPolicy { reason: String },

    #[error("streaming decoder invariant violated: {message}")]
    DecoderInvariant { message: String },

    #[error("unsupported media type: {message}")]
    UnsupportedMediaType { message: String },

    #[error("stream was already consumed")]
    StreamAlreadyConsumed,

    #[error("request was cancelled")]
    Cancelled,

    #[error("retries exhausted after {} failures", .trail.len())]
    RetriesExhausted {
        trail: Vec<crate::retry::RetryFailure>,
    },

    /// Raised from chunk consumption when a retryable error restarts the
    /// underlying stream. Not a terminal failure: the caller re-iterates the
    /// wrapped replacement stream.
    #[error("stream restarted after a retryable error")]
    StreamRestarted {
        trail: Vec<crate::retry::RetryFailure>,
        #[source]
        cause: Box<MicError>,
    },
}

impl MicError {
    pub fn authentication(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::Authentication(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn permission(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::Permission(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn bad_request(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::BadRequest(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn not_found(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::NotFound(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn rate_limit(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::RateLimit(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn server(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::Server(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn connection(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::Connection(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn timeout(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::Timeout(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    pub fn api(provider: impl Into<String>, model_id: impl Into<String>, original: Option<BoxError>) -> Self {
        MicError::Api(ProviderContext { provider: provider.into(), model_id: model_id.into(), original })
    }

    /// Construct the transport-shaped variant matching `kind`, for use by the
    /// per-provider error-mapping table.
    pub fn from_kind(
        kind: ErrorKind,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        original: Option<BoxError>,
    ) -> Self {
        let provider = provider.into();
        let model_id = model_id.into();
        match kind {
            ErrorKind::Authentication => Self::authentication(provider, model_id, original),
            ErrorKind::Permission => Self::permission(provider, model_id, original),
            ErrorKind::BadRequest => Self::bad_request(provider, model_id, original),
            ErrorKind::NotFound => Self::not_found(provider, model_id, original),
            ErrorKind::RateLimit => Self::rate_limit(provider, model_id, original),
            ErrorKind::Server => Self::server(provider, model_id, original),
            ErrorKind::Connection => Self::connection(provider, model_id, original),
            ErrorKind::Timeout => Self::timeout(provider, model_id, original),
            ErrorKind::Api => Self::api(provider, model_id, original),
        }
    }

    /// The [`ErrorKind`] this error maps to, if it is a transport-shaped error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            MicError::Authentication(_) => Some(ErrorKind::Authentication),
            MicError::Permission(_) => Some(ErrorKind::Permission),
            MicError::BadRequest(_) => Some(ErrorKind::BadRequest),
            MicError::NotFound(_) => Some(ErrorKind::NotFound),
            MicError::RateLimit(_) => Some(ErrorKind::RateLimit),
            MicError::Server(_) => Some(ErrorKind::Server),
            MicError::Connection(_) => Some(ErrorKind::Connection),
            MicError::Timeout(_) => Some(ErrorKind::Timeout),
            MicError::Api(_) => Some(ErrorKind::Api),
            _ => None,
        }
    }

    /// Whether this error is retryable under the *default* retry policy.
    /// Orchestrators with a custom `retry_on` set should consult [`MicError::kind`]
    /// directly instead.
    pub fn retryable(&self) -> bool {
        self.kind().map(|k| k.is_retryable_by_default()).unwrap_or(false)
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            MicError::Authentication(c)
            | MicError::Permission(c)
            | MicError::BadRequest(c)
            | MicError::NotFound(c)
            | MicError::RateLimit(c)
            | MicError::Server(c)
            | MicError::Connection(c)
            | MicError::Timeout(c)
            | MicError::Api(c) => Some(&c.provider),
            MicError::ResponseValidation { provider, .. } => Some(provider),
            MicError::FeatureNotSupported { provider, .. } => Some(provider),
            MicError::MissingApiKey { provider, .. } => Some(provider),
            _ => None,
        }
    }

    pub fn model_id(&self) -> Option<&str> {
        match self {
            MicError::Authentication(c)
            | MicError::Permission(c)
            | MicError::BadRequest(c)
            | MicError::NotFound(c)
            | MicError::RateLimit(c)
            | MicError::Server(c)
            | MicError::Connection(c)
            | MicError::Timeout(c)
            | MicError::Api(c) => Some(&c.model_id),
            MicError::ResponseValidation { model_id, .. } => Some(model_id),
            MicError::FeatureNotSupported { model_id, .. } => Some(model_id),
            _ => None,
        }
    }
}

pub type MicResult<T> = Result<T, MicError>;
