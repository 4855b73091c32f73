use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ClientSettings, Completion, Provider};
use crate::errors::ProviderError;

/// OpenAI-compatible chat completions client.
///
/// Also used for DeepSeek and LM Studio, which expose the same API.
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Generation settings
    settings: ClientSettings,
    /// Name reported in logs
    name: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// The generated message
    pub message: OpenAIMessage,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Completion choices, first one is used
    pub choices: Vec<OpenAIChoice>,
    /// Token usage, not reported by every compatible server
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl OpenAIRequest {
    /// Create a new chat request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAI {
    /// Create a new OpenAI-compatible client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, settings: ClientSettings) -> Self {
        Self {
            client: Client::builder()
                .timeout(settings.timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            settings,
            name: "openai".to_string(),
        }
    }

    /// Override the name reported in logs
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn api_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.openai.com/v1/chat/completions".to_string()
        } else {
            format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
        }
    }

    /// Send a chat completion request
    pub async fn send(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let response = self.client.post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("{} API error ({}): {}", self.name, status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        response.json::<OpenAIResponse>().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    /// Extract text from a chat completion response
    pub fn extract_text(response: &OpenAIResponse) -> Option<String> {
        response.choices.first().map(|choice| choice.message.content.clone())
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let request = OpenAIRequest::new(self.settings.model.as_str())
            .add_message("system", self.settings.system_prompt.as_str())
            .add_message("user", prompt)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens);

        let response = self.send(&request).await?;
        let text = Self::extract_text(&response).ok_or(ProviderError::EmptyResponse)?;

        Ok(Completion {
            text,
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens as u64),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens as u64),
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = OpenAIRequest::new(self.settings.model.as_str())
            .add_message("user", "Hello")
            .max_tokens(10);
        self.send(&request).await.map(|_| ())
    }
}
