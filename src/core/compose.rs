//! Request composition: user text + configuration snapshot → wire payload.

use crate::connection::wire::OutboundPayload;
use crate::core::error::ChatError;
use crate::core::llm_config::LlmConfig;

/// Validate `text` and `config` and build the payload for one user turn.
///
/// The message is the trimmed text; the config is copied, so later panel
/// edits never reach a payload that was already composed.
pub fn compose(text: &str, config: &LlmConfig) -> Result<OutboundPayload, ChatError> {
    let message = text.trim();
    if message.is_empty() {
        return Err(ChatError::EmptyInput);
    }
    config.validate()?;
    Ok(OutboundPayload::new(message.to_string(), config.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm_config::Provider;

    #[test]
    fn test_compose_trims_and_keeps_inner_text() {
        let payload = compose("  How do I   install Kubeflow?\n", &LlmConfig::default()).unwrap();
        assert_eq!(payload.message(), "How do I   install Kubeflow?");
        assert_eq!(payload.config(), &LlmConfig::default());
    }

    #[test]
    fn test_compose_rejects_blank_text() {
        assert_eq!(compose("", &LlmConfig::default()), Err(ChatError::EmptyInput));
        assert_eq!(compose(" \t\n ", &LlmConfig::default()), Err(ChatError::EmptyInput));
    }

    #[test]
    fn test_empty_input_wins_over_invalid_config() {
        let bad = LlmConfig { max_tokens: 0, ..LlmConfig::default() };
        assert_eq!(compose("   ", &bad), Err(ChatError::EmptyInput));
    }

    #[test]
    fn test_compose_rejects_foreign_model() {
        let config = LlmConfig {
            provider: Provider::Meta,
            model: "gemma2-9b".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(compose("hi", &config), Err(ChatError::InvalidConfig(_))));
    }

    #[test]
    fn test_compose_is_idempotent() {
        let config = LlmConfig {
            provider: Provider::Google,
            model: "gemma2-9b".to_string(),
            temperature: 0.9,
            max_tokens: 7000,
        };
        let first = compose("Explain Kubeflow Trainer", &config).unwrap();
        let second = compose("Explain Kubeflow Trainer", &config).unwrap();
        assert_eq!(first, second);
    }
}
