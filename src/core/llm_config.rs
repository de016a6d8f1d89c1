//! # LLM Configuration
//!
//! The `{provider, model, temperature, max_tokens}` snapshot sent with every
//! request, the closed provider → model catalog, and `ConfigPanel`, the only
//! place that mutates a live configuration.
//!
//! ```text
//! Provider ──┬── Meta     → llama-3.3 (default), llama-3.1
//!            ├── Google   → gemma2-9b
//!            ├── Mistral  → mixtral-8x7b
//!            └── Alibaba  → qwen-2.5
//! ```
//!
//! The panel guarantees the model always belongs to the provider: switching
//! provider resets the model to that provider's default. `validate()` checks the
//! same invariant for configurations that did not come through the panel.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::ChatError;

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 1000..=8000;
pub const TEMPERATURE_STEP: f32 = 0.1;
pub const MAX_TOKENS_STEP: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Inference vendor. Serialized with the exact names the backend expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Provider {
    #[default]
    Meta,
    Google,
    Mistral,
    Alibaba,
}

/// A model the backend can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Identifier sent on the wire.
    pub id: &'static str,
    /// Full upstream model name, for display.
    pub label: &'static str,
}

const META_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "llama-3.3", label: "llama-3.3-70b-versatile" },
    ModelInfo { id: "llama-3.1", label: "llama-3.1-8b-instant" },
];
const GOOGLE_MODELS: &[ModelInfo] = &[ModelInfo { id: "gemma2-9b", label: "gemma2-9b-it" }];
const MISTRAL_MODELS: &[ModelInfo] = &[ModelInfo { id: "mixtral-8x7b", label: "mixtral-8x7b-32768" }];
const ALIBABA_MODELS: &[ModelInfo] = &[ModelInfo { id: "qwen-2.5", label: "qwen-2.5-32b" }];

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Meta,
        Provider::Google,
        Provider::Mistral,
        Provider::Alibaba,
    ];

    /// The fixed, non-empty model list for this provider. The first entry is the default.
    pub fn models(self) -> &'static [ModelInfo] {
        match self {
            Provider::Meta => META_MODELS,
            Provider::Google => GOOGLE_MODELS,
            Provider::Mistral => MISTRAL_MODELS,
            Provider::Alibaba => ALIBABA_MODELS,
        }
    }

    pub fn default_model(self) -> &'static str {
        self.models()[0].id
    }

    pub fn allows(self, model: &str) -> bool {
        self.models().iter().any(|m| m.id == model)
    }

    /// Wire and display name.
    pub fn name(self) -> &'static str {
        match self {
            Provider::Meta => "Meta",
            Provider::Google => "Google",
            Provider::Mistral => "Mistral",
            Provider::Alibaba => "Alibaba",
        }
    }

    /// Next provider in catalog order (wraps around).
    pub fn next(self) -> Provider {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous provider in catalog order (wraps around).
    pub fn prev(self) -> Provider {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ChatError;

    /// Case-insensitive; also accepts "Alibaba Cloud".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "meta" => Ok(Provider::Meta),
            "google" => Ok(Provider::Google),
            "mistral" => Ok(Provider::Mistral),
            "alibaba" | "alibaba cloud" => Ok(Provider::Alibaba),
            _ => Err(ChatError::InvalidConfig(format!("unknown provider '{}'", s.trim()))),
        }
    }
}

/// Configuration snapshot attached to every outbound request.
///
/// Serializes straight into the wire `config` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmConfig {
    #[serde(rename = "llmProvider")]
    pub provider: Provider,
    pub model: String,
    pub temperature: f32,
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: Provider::default().default_model().to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LlmConfig {
    /// Checks the provider/model pairing and the numeric ranges.
    pub fn validate(&self) -> Result<(), ChatError> {
        if !self.provider.allows(&self.model) {
            return Err(ChatError::InvalidConfig(format!(
                "model '{}' is not offered by {}",
                self.model, self.provider
            )));
        }
        if !self.temperature.is_finite() || !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(ChatError::InvalidConfig(format!(
                "temperature {} outside {}..={}",
                self.temperature,
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }
        if !MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(ChatError::InvalidConfig(format!(
                "max tokens {} outside {}..={}",
                self.max_tokens,
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end()
            )));
        }
        Ok(())
    }

    /// One-line summary for title bars.
    pub fn summary(&self) -> String {
        format!(
            "{} / {} · temp {:.1} · {} tok",
            self.provider, self.model, self.temperature, self.max_tokens
        )
    }
}

/// Clamp into the temperature range and snap to one decimal.
pub fn normalize_temperature(value: f32) -> f32 {
    if !value.is_finite() {
        return DEFAULT_TEMPERATURE;
    }
    let clamped = value.clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end());
    (clamped * 10.0).round() / 10.0
}

pub fn normalize_max_tokens(value: u32) -> u32 {
    value.clamp(*MAX_TOKENS_RANGE.start(), *MAX_TOKENS_RANGE.end())
}

/// Editable holder of the live configuration.
///
/// Every mutation keeps the configuration valid, so `snapshot()` always
/// passes `LlmConfig::validate`.
#[derive(Debug, Clone)]
pub struct ConfigPanel {
    config: LlmConfig,
}

impl Default for ConfigPanel {
    fn default() -> Self {
        Self::new(LlmConfig::default())
    }
}

impl ConfigPanel {
    /// Wraps `config`, repairing anything invalid (foreign model, out-of-range numbers).
    pub fn new(config: LlmConfig) -> Self {
        let model = if config.provider.allows(&config.model) {
            config.model
        } else {
            config.provider.default_model().to_string()
        };
        Self {
            config: LlmConfig {
                provider: config.provider,
                model,
                temperature: normalize_temperature(config.temperature),
                max_tokens: normalize_max_tokens(config.max_tokens),
            },
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Copy of the current configuration, taken at send time.
    pub fn snapshot(&self) -> LlmConfig {
        self.config.clone()
    }

    /// Switch provider. The model is reset to the new provider's default.
    pub fn select_provider(&mut self, provider: Provider) {
        if provider == self.config.provider {
            return;
        }
        debug!(
            "Provider {} -> {}, model reset to {}",
            self.config.provider,
            provider,
            provider.default_model()
        );
        self.config.provider = provider;
        self.config.model = provider.default_model().to_string();
    }

    /// Select a model of the current provider.
    pub fn select_model(&mut self, model: &str) -> Result<(), ChatError> {
        if !self.config.provider.allows(model) {
            return Err(ChatError::InvalidConfig(format!(
                "model '{}' is not offered by {}",
                model, self.config.provider
            )));
        }
        self.config.model = model.to_string();
        Ok(())
    }

    pub fn cycle_provider(&mut self, forward: bool) {
        let next = if forward {
            self.config.provider.next()
        } else {
            self.config.provider.prev()
        };
        self.select_provider(next);
    }

    /// Move to the next/previous model of the current provider (wraps around).
    pub fn cycle_model(&mut self, forward: bool) {
        let models = self.config.provider.models();
        let idx = models
            .iter()
            .position(|m| m.id == self.config.model)
            .unwrap_or(0);
        let next = if forward {
            (idx + 1) % models.len()
        } else {
            (idx + models.len() - 1) % models.len()
        };
        self.config.model = models[next].id.to_string();
    }

    pub fn set_temperature(&mut self, value: f32) {
        self.config.temperature = normalize_temperature(value);
    }

    /// Adjust temperature by whole steps of 0.1.
    pub fn step_temperature(&mut self, steps: i32) {
        self.set_temperature(self.config.temperature + steps as f32 * TEMPERATURE_STEP);
    }

    pub fn set_max_tokens(&mut self, value: u32) {
        self.config.max_tokens = normalize_max_tokens(value);
    }

    /// Adjust max tokens by whole steps of 1000.
    pub fn step_max_tokens(&mut self, steps: i32) {
        let delta = steps.unsigned_abs().saturating_mul(MAX_TOKENS_STEP);
        let value = if steps >= 0 {
            self.config.max_tokens.saturating_add(delta)
        } else {
            self.config.max_tokens.saturating_sub(delta)
        };
        self.set_max_tokens(value);
    }
}
