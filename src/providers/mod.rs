/*!
 * Provider implementations for different LLM services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and compatible endpoints (DeepSeek, LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: In-process provider with scripted behaviours for tests
 *
 * Providers are fallible transports. The alignment engine never talks to
 * them directly; it goes through [`crate::generation::ProviderGenerator`],
 * which turns their errors into marker text.
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Text produced by a provider along with the usage it reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Prompt tokens, when the provider reports them
    pub prompt_tokens: Option<u64>,
    /// Completion tokens, when the provider reports them
    pub completion_tokens: Option<u64>,
}

impl Completion {
    /// A completion carrying only text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind the generation port.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short identifier used in logs, e.g. `ollama`
    fn name(&self) -> &str;

    /// Complete a single user prompt
    ///
    /// # Arguments
    /// * `prompt` - The prompt text
    ///
    /// # Returns
    /// * `Result<Completion, ProviderError>` - The generated text or an error
    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Generation settings shared by every provider client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Model name
    pub model: String,
    /// System prompt sent with every request
    pub system_prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Request timeout
    pub timeout: Duration,
}

fn has_scheme(endpoint: &str) -> bool {
    endpoint.starts_with("http://") || endpoint.starts_with("https://")
}

/// Parse an endpoint string into host and port
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if has_scheme(endpoint) {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    let host = url.host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?
        .to_string();

    let port = url.port().unwrap_or(if url.scheme() == "https" { 443 } else { 80 });

    Ok((host, port))
}

/// Get the maximum number of tokens to request for a given model
fn max_tokens_for_model(model: &str) -> u32 {
    match model {
        "gpt-4" | "gpt-4-0613" => 8192,
        "gpt-3.5-turbo" | "gpt-3.5-turbo-0613" => 4096,
        "deepseek-chat" | "deepseek-reasoner" => 8192,
        m if m.starts_with("claude-") => 4096,
        _ => 2048,
    }
}

/// Build the provider selected in the translation config
pub fn create_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let model = config.get_model();
    let settings = ClientSettings {
        max_tokens: max_tokens_for_model(&model),
        model,
        system_prompt: config.common.system_prompt.clone(),
        temperature: config.common.temperature,
        timeout: Duration::from_secs(config.get_timeout_secs()),
    };

    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::Ollama => {
            let endpoint = config.get_endpoint();
            if has_scheme(&endpoint) {
                // Keep scheme and path prefix, e.g. an https reverse proxy
                Url::parse(&endpoint)
                    .with_context(|| format!("Invalid Ollama endpoint: {}", endpoint))?;
                Arc::new(ollama::Ollama::new(&endpoint, 0, settings))
            } else {
                let (host, port) = parse_endpoint(&endpoint)?;
                Arc::new(ollama::Ollama::new(&host, port, settings))
            }
        }
        TranslationProvider::OpenAI => {
            Arc::new(openai::OpenAI::new(config.get_api_key(), config.get_endpoint(), settings))
        }
        TranslationProvider::LMStudio => {
            // LM Studio accepts any key
            let api_key = {
                let k = config.get_api_key();
                if k.is_empty() { "lm-studio".to_string() } else { k }
            };
            Arc::new(openai::OpenAI::new(api_key, config.get_endpoint(), settings).named("lmstudio"))
        }
        TranslationProvider::Anthropic => {
            Arc::new(anthropic::Anthropic::new(config.get_api_key(), config.get_endpoint(), settings))
        }
    };

    Ok(provider)
}
