/*!
 * Client for the Anthropic messages API.
 */

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ClientSettings, Completion, Provider};
use crate::errors::ProviderError;

const DEFAULT_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anthropic messages client
#[derive(Debug)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    /// Base URL, the public API when empty
    endpoint: String,
    settings: ClientSettings,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    fn user(model: &'a str, max_tokens: u32, prompt: &'a str) -> Self {
        Self {
            model,
            max_tokens,
            messages: [Message { role: "user", content: prompt }],
            system: None,
            temperature: None,
        }
    }

    /// The messages API accepts temperatures in 0.0..=1.0 only
    fn sampled(mut self, system: &'a str, temperature: f32) -> Self {
        if !system.is_empty() {
            self.system = Some(system);
        }
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }
}

/// Reported token counts
#[derive(Debug, Deserialize)]
pub struct MessagesUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One block of response content
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// Body of a successful messages call
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<ContentBlock>,
    pub usage: MessagesUsage,
}

impl Anthropic {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, settings: ClientSettings) -> Self {
        Self {
            client: Client::builder()
                .timeout(settings.timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            settings,
        }
    }

    fn messages_url(&self) -> String {
        if self.endpoint.is_empty() {
            DEFAULT_MESSAGES_URL.to_string()
        } else {
            format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
        }
    }

    async fn post_messages(&self, request: &MessagesRequest<'_>) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Anthropic returned {}: {}", status, body);
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        response
            .json::<AnthropicResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    /// Concatenated text blocks of a response
    pub fn extract_text(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect()
    }
}

#[async_trait]
impl Provider for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let request = MessagesRequest::user(&self.settings.model, self.settings.max_tokens, prompt)
            .sampled(&self.settings.system_prompt, self.settings.temperature);

        let response = self.post_messages(&request).await?;
        Ok(Completion {
            text: Self::extract_text(&response),
            prompt_tokens: Some(response.usage.input_tokens),
            completion_tokens: Some(response.usage.output_tokens),
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = MessagesRequest::user(&self.settings.model, 10, "Hello");
        self.post_messages(&request).await.map(|_| ())
    }
}
