//! The request parameter bag.
//!
//! Known keys are named fields on a closed struct; anything else is carried
//! through in `passthrough` so providers that understand bespoke options
//! still receive them, while providers that don't can warn instead of
//! failing.

use std::collections::HashMap;

/// Reasoning effort level for thinking-capable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingLevel {
    Low,
    Medium,
    High,
}

/// Extended-thinking configuration, set via `params.thinking`.
#[derive(Debug, Clone, Default)]
pub struct ThinkingConfig {
    pub level: Option<ThinkingLevel>,
    pub budget_tokens: Option<u32>,
    /// When `true`, thought blocks are rendered as assistant text parts
    /// instead of being dropped, and also forces a full re-encode of
    /// `raw_message` on reuse.
    pub encode_thoughts_as_text: bool,
}

/// The recognized request parameters plus an open passthrough bag.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub seed: Option<u64>,
    pub stop_sequences: Vec<String>,
    pub thinking: Option<ThinkingConfig>,
    /// Unknown keys, carried through verbatim. Providers that don't recognize
    /// a key MUST warn, not fail.
    pub passthrough: HashMap<String, serde_json::Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_thinking(mut self, thinking: ThinkingConfig) -> Self {
        self.thinking = Some(thinking);
        self
    }

    /// Whether this configuration targets a reasoning model, per the presence
    /// of a `thinking` block — reasoning models reject `temperature`/`top_p`/
    /// `stop_sequences`.
    pub fn is_reasoning(&self) -> bool {
        self.thinking.is_some()
    }

    /// Merge `overrides` on top of `self`, call-site values winning. Used by
    /// [`crate::model::Model::call`] to merge call-site params over model
    /// defaults.
    pub fn merged_with(&self, overrides: &Params) -> Params {
        let mut merged = self.clone();
        if overrides.max_tokens.is_some() {
            merged.max_tokens = overrides.max_tokens;
        }
        if overrides.temperature.is_some() {
            merged.temperature = overrides.temperature;
        }
        if overrides.top_p.is_some() {
            merged.top_p = overrides.top_p;
        }
        if overrides.top_k.is_some() {
            merged.top_k = overrides.top_k;
        }
        if overrides.seed.is_some() {
            merged.seed = overrides.seed;
        }
        if !overrides.stop_sequences.is_empty() {
            merged.stop_sequences = overrides.stop_sequences.clone();
        }
        if overrides.thinking.is_some() {
            merged.thinking = overrides.thinking.clone();
        }
        for (k, v) in &overrides.passthrough {
            merged.passthrough.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Parameters that a reasoning model must drop, with a warning:
    /// reasoning models reject `temperature`/`topP`/`stopSequences`.
    pub fn reasoning_incompatible_keys(&self) -> Vec<&'static str> {
        let mut dropped = Vec::new();
        if self.temperature.is_some() {
            dropped.push("temperature");
        }
        if self.top_p.is_some() {
            dropped.push("topP");
        }
        if !self.stop_sequences.is_empty() {
            dropped.push("stopSequences");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_site_overrides_win_on_merge() {
        let defaults = Params::new().with_max_tokens(100).with_temperature(0.2);
        let overrides = Params::new().with_temperature(0.9);
        let merged = defaults.merged_with(&overrides);
        assert_eq!(merged.max_tokens, Some(100));
        assert_eq!(merged.temperature, Some(0.9));
    }

    #[test]
    fn reasoning_model_flags_incompatible_keys() {
        let params = Params {
            temperature: Some(0.5),
            top_p: Some(0.9),
            thinking: Some(ThinkingConfig::default()),
            ..Default::default()
        };
        assert!(params.is_reasoning());
        let dropped = params.reasoning_incompatible_keys();
        assert!(dropped.contains(&"temperature"));
        assert!(dropped.contains(&"topP"));
    }
}
