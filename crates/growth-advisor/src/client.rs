use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, AdvisorResult};

/// Free-text generation backend used to estimate growth.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> AdvisorResult<String>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct HttpTextGenerator {
    client: reqwest::Client,
    config: AdvisorConfig,
}

impl HttpTextGenerator {
    pub fn new(config: AdvisorConfig) -> AdvisorResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing connection pool.
    pub fn with_client(client: reqwest::Client, config: AdvisorConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> AdvisorResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let mut builder = self.client.post(url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AdvisorError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AdvisorError::ServiceUnavailable(format!(
                "Text generation service returned {}",
                response.status()
            )));
        }

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AdvisorError::InvalidResponse("response had no choices".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
