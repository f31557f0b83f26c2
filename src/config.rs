//! Session configuration
//!
//! Every field has a default so the content script can pass `null`, a partial
//! object, or nothing at all.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{FellowshipError, Result};
use crate::names::AllocationPolicy;

/// Tags whose subtrees are never read or rewritten.
pub const DEFAULT_SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "textarea"];

/// Names shorter than this (in chars, after stripping) are left alone.
pub const DEFAULT_MIN_NAME_LEN: usize = 2;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Toggle state from the storage collaborator. Missing means enabled.
    pub enabled: bool,
    pub policy: AllocationPolicy,
    /// Fixed seed for the balanced allocator. `None` draws one from the
    /// platform RNG at session start.
    pub seed: Option<u64>,
    /// Lowercase tag names to skip along with their subtrees.
    pub skip_tags: Vec<String>,
    pub min_name_len: usize,
    /// Run the part sweep after each primary pass.
    pub sweep: bool,
    /// One of "trace", "debug", "info", "warn", "error".
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: AllocationPolicy::default(),
            seed: None,
            skip_tags: DEFAULT_SKIP_TAGS.iter().map(|t| t.to_string()).collect(),
            min_name_len: DEFAULT_MIN_NAME_LEN,
            sweep: true,
            log_level: "info".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| FellowshipError::InvalidConfig(e.to_string()))?;
        config.validate()
    }

    /// Parse from a JS object. `null`/`undefined` yields the defaults.
    pub fn from_js(value: JsValue) -> Result<Self> {
        if value.is_null() || value.is_undefined() {
            return Ok(Self::default());
        }
        let config: SessionConfig = serde_wasm_bindgen::from_value(value)
            .map_err(|e| FellowshipError::InvalidConfig(e.to_string()))?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self> {
        if self.min_name_len == 0 {
            return Err(FellowshipError::InvalidConfig(
                "min_name_len must be at least 1".to_string(),
            ));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(FellowshipError::InvalidConfig(format!(
                "unknown log level {:?}",
                self.log_level
            )));
        }
        for tag in &mut self.skip_tags {
            *tag = tag.trim().to_ascii_lowercase();
        }
        self.skip_tags.retain(|t| !t.is_empty());
        Ok(self)
    }

    /// True if `tag` (any case) is in the skip set.
    pub fn is_skipped_tag(&self, tag: &str) -> bool {
        self.skip_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
