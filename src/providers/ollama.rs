/*!
 * Client for a local Ollama server (`/api/generate`).
 */

use async_trait::async_trait;
use log::{error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ClientSettings, Completion, Provider};
use crate::errors::ProviderError;

#[derive(Debug)]
pub struct Ollama {
    base_url: String,
    client: Client,
    settings: ClientSettings,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: SamplingOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
    num_predict: u32,
}

/// Body of a non-streamed `/api/generate` call
#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    pub prompt_eval_count: Option<u64>,
    pub eval_count: Option<u64>,
}

/// Rebuild a response from JSONL pieces.
///
/// Some Ollama versions stream even with `stream: false`. Text is joined in
/// order and the counters come from the last piece.
fn parse_streamed_response(body: &str) -> Option<GenerateResponse> {
    let pieces: Vec<GenerateResponse> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    let last = pieces.last()?;
    Some(GenerateResponse {
        response: pieces.iter().map(|p| p.response.as_str()).collect(),
        done: last.done,
        prompt_eval_count: last.prompt_eval_count,
        eval_count: last.eval_count,
    })
}

impl Ollama {
    /// `host` may be a bare host name or a full `http(s)://` URL
    pub fn new(host: &str, port: u16, settings: ClientSettings) -> Self {
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}:{}", host, port)
        };

        let client = Client::builder()
            .timeout(settings.timeout)
            .http1_only()
            .build()
            .unwrap_or_default();

        Self { base_url, client, settings }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_for<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.settings.model,
            prompt,
            system: Some(self.settings.system_prompt.as_str()).filter(|s| !s.is_empty()),
            options: SamplingOptions {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
            stream: false,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<GenerateResponse, ProviderError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&self.request_for(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Ollama returned {}: {}", status, body);
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        serde_json::from_str::<GenerateResponse>(&body).or_else(|e| {
            warn!("Ollama answered with more than one JSON object ({}), reading it as JSONL", e);
            parse_streamed_response(&body).ok_or_else(|| {
                let head: String = body.chars().take(500).collect();
                ProviderError::ParseError(format!("{}. Raw response: {}", e, head))
            })
        })
    }

    /// Server version, from `/api/version`
    pub async fn version(&self) -> Result<String, ProviderError> {
        let body: serde_json::Value = self
            .client
            .get(format!("{}/api/version", self.base_url))
            .send()
            .await?
            .json()
            .await?;

        body["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("No version in /api/version response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let response = self.generate(prompt).await?;
        Ok(Completion {
            text: response.response,
            prompt_tokens: response.prompt_eval_count,
            completion_tokens: response.eval_count,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.version().await.map(|_| ())
    }
}
