use crate::{errors::LlmError, providers::ai::LlmProvider};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

// --- DeepSeek-specific request and response structures ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: MessageResponse,
}

#[derive(Deserialize, Debug)]
struct MessageResponse {
    content: String,
}

// --- DeepSeek Provider implementation ---

/// A provider for the DeepSeek chat-completions API.
///
/// The API key comes from the store's `apikey` table; the per-request
/// deadline is wired into the HTTP client so a stalled response cannot
/// outlive the budget. There is no automatic retry in this release:
/// a failed article returns to the unprocessed set and the next run
/// picks it up.
#[derive(Clone, Debug)]
pub struct DeepSeekProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl DeepSeekProvider {
    pub fn new(
        api_url: String,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(LlmError::ClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            timeout_secs,
        })
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    async fn enrich(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::Network(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LlmError::Auth);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(LlmError::Body)?;

        Ok(chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}
