//! Chat-completion seam. The agent only ever sees [`LlmClient`]; the HTTP
//! client speaks the OpenAI-compatible `/chat/completions` dialect that Groq,
//! OpenAI and Ollama all expose.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hrdesk_core::config::LlmConfig;

const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Generation halts before any of these sequences.
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, stop: Vec::new() }
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

pub struct ChatCompletionsClient {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatCompletionsBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build LLM http client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_once(&self, body: &ChatCompletionsBody<'_>) -> Result<Attempt> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) if error.is_connect() || error.is_timeout() => {
                return Ok(Attempt::Retry(anyhow!(error).context("LLM request failed")))
            }
            Err(error) => return Err(anyhow!(error).context("LLM request failed")),
        };

        let status = response.status();
        if status.is_success() {
            let payload: ChatCompletionsResponse =
                response.json().await.context("LLM response was not valid JSON")?;
            return extract_content(payload).map(Attempt::Done);
        }

        let detail = response.text().await.unwrap_or_default();
        let error = anyhow!("LLM endpoint returned {status}: {}", truncate(&detail, 200));
        if is_retryable(status) {
            Ok(Attempt::Retry(error))
        } else {
            Err(error)
        }
    }
}

enum Attempt {
    Done(String),
    Retry(anyhow::Error),
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = ChatCompletionsBody {
            model: &self.model,
            messages: &request.messages,
            temperature: self.temperature,
            stop: &request.stop,
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await? {
                Attempt::Done(content) => {
                    debug!(
                        event_name = "hrdesk.llm.completed",
                        model = %self.model,
                        attempt,
                        "completion received"
                    );
                    return Ok(content);
                }
                Attempt::Retry(error) if attempt >= self.max_retries => return Err(error),
                Attempt::Retry(error) => {
                    attempt += 1;
                    let delay = BASE_RETRY_DELAY * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        event_name = "hrdesk.llm.retry",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying LLM request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn extract_content(payload: ChatCompletionsResponse) -> Result<String> {
    let Some(choice) = payload.choices.into_iter().next() else {
        bail!("LLM response contained no choices");
    };
    Ok(choice.message.content.unwrap_or_default())
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
