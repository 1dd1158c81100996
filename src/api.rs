//! Completion API interaction.
//!
//! This module sends a prompt pair to an OpenAI-compatible
//! `/chat/completions` endpoint and returns the raw reply text.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`ChatClient`]: `reqwest` implementation with bearer auth and a timeout
//! - [`analyze`]: Stage entry point that logs timing and outcome
//!
//! A run makes exactly one request. Any non-2xx status, timeout or transport
//! error is returned as an [`AnalysisError`] and ends the run; nothing is
//! retried.

use crate::config::CompletionSettings;
use crate::error::AnalysisError;
use crate::prompts::Prompt;
use crate::utils::truncate_for_log;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and return its reply. Tests
/// implement it with canned replies.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send the prompt pair and receive the reply.
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, AnalysisError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

/// `reqwest` client for an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(settings: &CompletionSettings) -> Result<Self, AnalysisError> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self::with_http(http, settings))
    }

    pub fn with_http(http: Client, settings: &CompletionSettings) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }

    fn headers(&self) -> Result<HeaderMap, AnalysisError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", self.api_key))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, AnalysisError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            response_format: prompt.response_format(),
        };

        debug!(
            endpoint = %self.endpoint,
            user_chars = prompt.user.chars().count(),
            "Sending completion request"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AnalysisError::EmptyReply)
    }
}

/// Send the prompt once and return the raw reply text.
#[instrument(level = "info", skip_all, fields(contract = ?prompt.contract))]
pub async fn analyze<A>(client: &A, prompt: &Prompt) -> Result<String, AnalysisError>
where
    A: AskAsync<Response = String>,
{
    let t0 = Instant::now();
    let res = client.ask(prompt).await;
    let dt = t0.elapsed();

    match &res {
        Ok(text) => info!(
            elapsed_ms = dt.as_millis() as u64,
            reply_chars = text.chars().count(),
            "Completion succeeded"
        ),
        Err(e) => error!(elapsed_ms = dt.as_millis() as u64, error = %e, "Completion failed"),
    }
    res
}
