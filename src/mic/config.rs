//! Ambient configuration: retry/backoff defaults and the credential-lookup
//! strategy.
//!
//! A plain struct with a `Default` impl — no file-format parsing dependency.

use crate::retry::RetryPolicy;
use std::sync::Arc;

/// A callable returning a provider's API key, looked up lazily at first
/// request rather than at construction. The default
/// implementation reads the provider's conventional environment variable.
pub type CredentialLookup = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Build the default credential lookup for a provider: reads `env_var` from
/// the process environment, returning `None` (never panicking) when unset —
/// construction never fails on a missing key; only the
/// first request that actually needs it raises [`crate::error::MicError::MissingApiKey`].
pub fn env_credential_lookup(env_var: impl Into<String>) -> CredentialLookup {
    let env_var = env_var.into();
    Arc::new(move || std::env::var(&env_var).ok())
}

/// Global MIC configuration: retry/backoff defaults and how each provider
/// resolves its credential.
pub struct MicConfig {
    pub default_retry_policy: RetryPolicy,
    pub anthropic_credential: CredentialLookup,
    pub openai_credential: CredentialLookup,
    pub google_credential: CredentialLookup,
}

impl Default for MicConfig {
    fn default() -> Self {
        MicConfig {
            default_retry_policy: RetryPolicy::default(),
            anthropic_credential: env_credential_lookup("ANTHROPIC_API_KEY"),
            openai_credential: env_credential_lookup("OPENAI_API_KEY"),
            google_credential: env_credential_lookup("GOOGLE_API_KEY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_lookup_reads_the_named_variable() {
        std::env::set_var("MIC_CONFIG_TEST_KEY", "secret-value");
        let lookup = env_credential_lookup("MIC_CONFIG_TEST_KEY");
        assert_eq!(lookup(), Some("secret-value".to_string()));
        std::env::remove_var("MIC_CONFIG_TEST_KEY");
    }

    #[test]
    fn missing_env_var_returns_none_not_panic() {
        std::env::remove_var("MIC_CONFIG_TEST_MISSING");
        let lookup = env_credential_lookup("MIC_CONFIG_TEST_MISSING");
        assert_eq!(lookup(), None);
    }
}
