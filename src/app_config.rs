//! Application configuration module
//! This module handles the application configuration including loading,
//! validating and saving configuration settings.

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::language_utils::LanguagePair;

/// Upper bound accepted for `max_iterations` in a config file
pub const MAX_ITERATIONS_LIMIT: usize = 10;

/// Environment variable that supplies the API key of the active provider
pub const API_KEY_ENV: &str = "IBUT_API_KEY";

/// Settings for one `ibut` run, read from `conf.json`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// ISO 639 code of the language sentences are written in
    pub source_language: String,

    /// ISO 639 code of the language to translate into
    pub target_language: String,

    /// Maximum number of judgment/refinement rounds per sentence
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Model access
    pub translation: TranslationConfig,

    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Verbosity unless overridden by `--log-level`
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Which model service the generator talks to
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    Ollama,
    // @provider: OpenAI-compatible API (DeepSeek by default)
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Whether the provider is a hosted API that needs a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Connection settings of one provider, keyed by `type`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Lowercase provider name, see TranslationProvider
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Base URL, empty for the public default
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            timeout_secs: default_timeout_for(&provider_type),
        }
    }
}

/// The active provider and the settings of every known provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Provider used for every generation
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Per-provider settings, one entry per `type`
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common generation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Generation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System message sent with every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retries after a retryable provider error
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff before the first retry, doubled after each
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Batch processing settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Number of sentences translated at the same time
    #[serde(default = "default_concurrent_sessions")]
    pub concurrent_sessions: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrent_sessions: default_concurrent_sessions(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_max_iterations() -> usize {
    3
}

fn default_concurrent_sessions() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_timeout_for(provider: &TranslationProvider) -> u64 {
    match provider {
        // Local models are slow on long understanding prompts
        TranslationProvider::Ollama | TranslationProvider::LMStudio => 120,
        _ => default_timeout_secs(),
    }
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_temperature() -> f32 {
    1.3
}

fn default_system_prompt() -> String {
    "You are a helpful assistant specializing in language understanding and translation.".to_string()
}

fn default_endpoint(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "http://localhost:11434".to_string(),
        TranslationProvider::OpenAI => "https://api.deepseek.com".to_string(),
        TranslationProvider::Anthropic => "https://api.anthropic.com".to_string(),
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        TranslationProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_model(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "qwen2.5:7b".to_string(),
        TranslationProvider::OpenAI => "deepseek-chat".to_string(),
        TranslationProvider::Anthropic => "claude-3-5-haiku-latest".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        TranslationProvider::LMStudio => "local-model".to_string(),
    }
}

impl Config {
    /// Load the configuration from `path`, writing a default one first if the file is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());

            let config = Config::default();
            let config_json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config to JSON")?;
            std::fs::write(path, config_json)
                .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

            Ok(config)
        }
    }

    /// Resolve the configured language pair
    pub fn language_pair(&self) -> Result<LanguagePair> {
        LanguagePair::new(&self.source_language, &self.target_language)
            .context("Invalid language configuration")
    }

    /// Fill an empty API key of the active provider from [`API_KEY_ENV`]
    pub fn apply_env_api_key(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() && self.translation.get_api_key().is_empty() {
                self.translation.set_api_key(key);
            }
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let pair = self.language_pair()?;
        if pair.is_same_language() {
            warn!(
                "Source and target language are both {}; the judgment phase will compare two understandings in the same language",
                pair.source_name()
            );
        }

        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(anyhow!(
                "max_iterations must be at most {}, got {}",
                MAX_ITERATIONS_LIMIT,
                self.max_iterations
            ));
        }

        if self.batch.concurrent_sessions == 0 {
            return Err(anyhow!("batch.concurrent_sessions must be at least 1"));
        }

        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider (set it in the config or via {})",
                self.translation.provider.display_name(),
                API_KEY_ENV
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "zh".to_string(),
            target_language: "en".to_string(),
            max_iterations: default_max_iterations(),
            translation: TranslationConfig::default(),
            batch: BatchConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created with defaults if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => &mut self.available_providers[index],
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                let last = self.available_providers.len() - 1;
                &mut self.available_providers[last]
            }
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.model.is_empty() => provider_config.model.clone(),
            _ => default_model(&self.provider),
        }
    }

    /// Override the model of the active provider
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.active_provider_config_mut().model = model.into();
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Override the API key of the active provider
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.active_provider_config_mut().api_key = api_key.into();
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.endpoint.is_empty() => provider_config.endpoint.clone(),
            _ => default_endpoint(&self.provider),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        match self.get_active_provider_config() {
            Some(provider_config) if provider_config.timeout_secs > 0 => provider_config.timeout_secs,
            _ => default_timeout_for(&self.provider),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
