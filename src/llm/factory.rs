use std::sync::Arc;

use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use super::traits::Provider;
use crate::config::LlmConfig;
use crate::error::LlmError;

/// Resolve an API key from config and environment variables.
///
/// Resolution order:
/// 1. Explicitly configured `api_key` (trimmed, filtered if empty)
/// 2. Provider-specific environment variable (e.g. `OPENAI_API_KEY`)
/// 3. Generic fallback variables (`WEEKENDSCOUT_API_KEY`, `API_KEY`)
fn resolve_api_key(name: &str, explicit_api_key: Option<&str>) -> Option<String> {
    if let Some(key) = explicit_api_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    let provider_env_candidates: &[&str] = match name {
        "openai" => &["OPENAI_API_KEY"],
        _ => &[],
    };

    for env_var in provider_env_candidates {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    for env_var in ["WEEKENDSCOUT_API_KEY", "API_KEY"] {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Build the chat provider named in `[llm]` config.
pub fn create_provider(llm: &LlmConfig) -> Result<Arc<dyn Provider>, LlmError> {
    match llm.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            llm.base_url.as_deref(),
            &llm.model,
            llm.temperature,
        ))),
        "openai" => {
            let resolved_key = resolve_api_key("openai", llm.api_key.as_deref());
            Ok(Arc::new(OpenAiProvider::new(
                resolved_key.as_deref(),
                llm.base_url.as_deref(),
                &llm.model,
                llm.temperature,
            )))
        }
        other => Err(LlmError::UnknownProvider {
            name: other.to_string(),
        }),
    }
}
