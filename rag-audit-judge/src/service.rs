//! The external judge capability and its HTTP implementation.

use async_trait::async_trait;
use rag_audit_core::{CoreError, JudgeConfig};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::TransportError;
use crate::prompt::SYSTEM_PROMPT;

/// Submits one prompt to one model and returns the raw reply text.
#[async_trait]
pub trait JudgeService: Send + Sync {
    async fn submit(&self, prompt: &str, model: &str) -> Result<String, TransportError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Judge backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiJudgeService {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl OpenAiJudgeService {
    pub fn new(config: &JudgeConfig) -> Result<Self, CoreError> {
        let endpoint = Self::endpoint(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| CoreError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(base_url: &str) -> Result<Url, CoreError> {
        let base = base_url.trim_end_matches('/');
        Url::parse(&format!("{base}/chat/completions"))
            .map_err(|e| CoreError::Configuration(format!("invalid judge base_url {base_url:?}: {e}")))
    }

    pub fn endpoint_url(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl JudgeService for OpenAiJudgeService {
    async fn submit(&self, prompt: &str, model: &str) -> Result<String, TransportError> {
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(model, endpoint = %self.endpoint, "Submitting judge request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16(), text));
        }

        // Bodies that are not a completion envelope are passed through as the
        // reply; an empty reply is later classified as malformed.
        match serde_json::from_str::<ChatResponse>(&text) {
            Ok(parsed) if !parsed.choices.is_empty() => Ok(parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default()),
            _ => Ok(text),
        }
    }
}
