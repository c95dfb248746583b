//! Rewrite client for the chat-completions generation service.
//!
//! One call per document, no retries, and no panics: every way the call can go
//! wrong comes back as a [`RewriteError`] so the batch loop can count it and
//! move on. Retry policy, if any, belongs to the caller.
//!
//! The client sends the system instructions and the user prompt as-is and
//! trusts the shape of what comes back; it does not check that the reply
//! actually contains diagrams, callouts or complexity annotations.
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use ureq::Agent;

use crate::config::ServiceConfig;

/// Maximum number of response body bytes echoed into a diagnostic.
const ERROR_BODY_PREVIEW_BYTES: usize = 500;

/// Inputs for rewriting one document.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    /// Stable document name, e.g. `EntityQuery_eng.md`.
    pub document: &'a str,
    pub content: &'a str,
    /// System-role instructions.
    pub instructions: &'a str,
}

/// Why a rewrite produced no content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// Network failure, timeout, or an unreadable body.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-2xx reply from the service.
    #[error("service error {status}: {message}")]
    Service { status: u16, message: String },
    /// 2xx reply that does not carry generated text where expected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

pub type RewriteResult = Result<String, RewriteError>;

/// A service that can rewrite a document.
///
/// The batch loop only talks to this trait, so tests can drive it with a
/// scripted implementation instead of a live endpoint.
pub trait RewriteService {
    fn rewrite(&self, request: &RewriteRequest<'_>, token: &str) -> RewriteResult;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Build the user-role prompt embedding the document verbatim.
pub fn user_prompt(document: &str, content: &str) -> String {
    format!(
        "Rewrite this file ({document}) matching the documentation white paper standard:\n\n{content}"
    )
}

/// Blocking HTTP client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsClient {
    agent: Agent,
    api_url: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionsClient {
    pub fn new(config: &ServiceConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(config.request_timeout)
            .http_status_as_error(false)
            .build();
        Self {
            agent: Agent::new_with_config(agent_config),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    fn request_body<'a>(&'a self, request: &RewriteRequest<'a>) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Cow::Borrowed(request.instructions),
                },
                ChatMessage {
                    role: "user",
                    content: Cow::Owned(user_prompt(request.document, request.content)),
                },
            ],
            temperature: self.temperature,
        }
    }
}

impl RewriteService for ChatCompletionsClient {
    fn rewrite(&self, request: &RewriteRequest<'_>, token: &str) -> RewriteResult {
        let body = self.request_body(request);
        let mut response = self
            .agent
            .post(self.api_url.as_str())
            .header("Authorization", format!("Bearer {token}"))
            .send_json(&body)
            .map_err(|err| RewriteError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| RewriteError::Transport(format!("read response body: {err}")))?;

        if !status.is_success() {
            return Err(service_error(status.as_u16(), &text));
        }
        parse_completion(&text)
    }
}

/// Extract the first choice's message text from a success body.
pub(crate) fn parse_completion(body: &str) -> RewriteResult {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|err| RewriteError::MalformedResponse(format!("decode JSON: {err}")))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RewriteError::MalformedResponse("response has no choices".to_string()))?;
    let content = choice.message.content.ok_or_else(|| {
        RewriteError::MalformedResponse("first choice has no message content".to_string())
    })?;
    if content.trim().is_empty() {
        return Err(RewriteError::MalformedResponse(
            "first choice has empty content".to_string(),
        ));
    }
    Ok(content)
}

/// Build a diagnostic from a non-2xx reply, preferring the structured message.
pub(crate) fn service_error(status: u16, body: &str) -> RewriteError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => crate::util::truncate_string(body.trim(), ERROR_BODY_PREVIEW_BYTES).to_string(),
    };
    RewriteError::Service { status, message }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
