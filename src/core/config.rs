//! # Configuration
//!
//! Settings with a fixed override order:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.kfchat/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//!
//! Resolution never fails. Bad values (unknown provider, a model the provider
//! does not offer, numbers out of range, a non-WebSocket URL) are logged and
//! replaced, so the client always starts with a valid `LlmConfig`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::llm_config::{
    LlmConfig, MAX_TOKENS_RANGE, Provider, TEMPERATURE_RANGE, normalize_max_tokens,
    normalize_temperature,
};
use crate::core::session::DEFAULT_REPLY_TIMEOUT;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct KfchatConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub reply_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LlmSection {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000/ws/chat";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const ENV_SERVER_URL: &str = "KFCHAT_SERVER_URL";
pub const ENV_PROVIDER: &str = "KFCHAT_PROVIDER";
pub const ENV_MODEL: &str = "KFCHAT_MODEL";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub server_url: String,
    pub reply_timeout: Duration,
    pub connect_timeout: Duration,
    pub llm: LlmConfig,
}

/// Values given on the command line (None = flag not passed).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub reply_timeout_secs: Option<u64>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.kfchat/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kfchat").join("config.toml"))
}

/// Load config from `~/.kfchat/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `KfchatConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<KfchatConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(KfchatConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(KfchatConfig::default());
    }

    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<KfchatConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: KfchatConfig = toml::from_str(&contents)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn generate_default_config(path: &Path) {
    let default_content = r#"# kfchat configuration
# All settings are optional; defaults are used for anything not specified.
# Override order: defaults → this file → env vars → CLI flags.

# [server]
# url = "ws://localhost:8000/ws/chat"   # Or set KFCHAT_SERVER_URL
# reply_timeout_secs = 120              # Give up on a reply after this long
# connect_timeout_secs = 10

# [llm]
# provider = "Meta"                     # "Meta", "Google", "Mistral", "Alibaba"
# model = "llama-3.3"                   # Must be offered by the provider
# temperature = 0.5                     # 0.0 - 1.0, step 0.1
# max_tokens = 4000                     # 1000 - 8000, step 1000
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &KfchatConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// `resolve` with an injectable environment lookup.
pub fn resolve_with_env(
    config: &KfchatConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Server URL: CLI → env → config → default
    let raw_url = cli
        .url
        .clone()
        .or_else(|| env(ENV_SERVER_URL))
        .or_else(|| config.server.url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let server_url = if is_websocket_url(&raw_url) {
        raw_url
    } else {
        warn!("'{}' is not a ws:// or wss:// URL, using {}", raw_url, DEFAULT_SERVER_URL);
        DEFAULT_SERVER_URL.to_string()
    };

    let reply_timeout = match cli.reply_timeout_secs.or(config.server.reply_timeout_secs) {
        Some(0) => {
            warn!("Reply timeout of 0s ignored, using {}s", DEFAULT_REPLY_TIMEOUT.as_secs());
            DEFAULT_REPLY_TIMEOUT
        }
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_REPLY_TIMEOUT,
    };
    let connect_timeout = Duration::from_secs(
        config
            .server
            .connect_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
    );

    ResolvedConfig {
        server_url,
        reply_timeout,
        connect_timeout,
        llm: resolve_llm(config, cli, &env),
    }
}

fn resolve_llm(
    config: &KfchatConfig,
    cli: &CliOverrides,
    env: &impl Fn(&str) -> Option<String>,
) -> LlmConfig {
    // Provider: CLI → env → config → default
    let provider = match cli.provider {
        Some(p) => p,
        None => env(ENV_PROVIDER)
            .or_else(|| config.llm.provider.clone())
            .map(|name| {
                name.parse::<Provider>().unwrap_or_else(|e| {
                    warn!("{}, using {}", e, Provider::default());
                    Provider::default()
                })
            })
            .unwrap_or_default(),
    };

    // Model: CLI → env → config → provider default
    let model = match cli
        .model
        .clone()
        .or_else(|| env(ENV_MODEL))
        .or_else(|| config.llm.model.clone())
    {
        Some(model) if provider.allows(&model) => model,
        Some(model) => {
            warn!(
                "Model '{}' is not offered by {}, using {}",
                model,
                provider,
                provider.default_model()
            );
            provider.default_model().to_string()
        }
        None => provider.default_model().to_string(),
    };

    let defaults = LlmConfig::default();

    let temperature = cli
        .temperature
        .or(config.llm.temperature)
        .unwrap_or(defaults.temperature);
    let temperature = if temperature.is_finite() && TEMPERATURE_RANGE.contains(&temperature) {
        normalize_temperature(temperature)
    } else {
        let repaired = normalize_temperature(temperature);
        warn!("Temperature {} out of range, using {}", temperature, repaired);
        repaired
    };

    let max_tokens = cli
        .max_tokens
        .or(config.llm.max_tokens)
        .unwrap_or(defaults.max_tokens);
    let max_tokens = if MAX_TOKENS_RANGE.contains(&max_tokens) {
        max_tokens
    } else {
        let repaired = normalize_max_tokens(max_tokens);
        warn!("Max tokens {} out of range, using {}", max_tokens, repaired);
        repaired
    };

    LlmConfig {
        provider,
        model,
        temperature,
        max_tokens,
    }
}

fn is_websocket_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("ws://") || lower.starts_with("wss://")
}
