//! Chat relay in front of a locally running Ollama server.

use crate::chat::ChatMessage;
use crate::config::ChatRelayConfig;
use crate::core;
use crate::error::RelayError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const SERVICE: &str = "Ollama";
const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.9;
const TOP_K: u32 = 40;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Model to answer with; the relay's configured default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Prior turns, oldest first.
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ChatResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ChatMessage>>,
}

impl ChatResult {
    #[must_use]
    pub fn succeeded(reply: ChatReply) -> Self {
        Self {
            success: true,
            response_time: Some(core::format_elapsed(reply.elapsed)),
            reply: Some(reply.reply),
            error: None,
            timestamp: core::timestamp(),
            model: Some(reply.model),
            history: None,
        }
    }

    #[must_use]
    pub fn failed(err: &RelayError) -> Self {
        Self {
            success: false,
            reply: None,
            error: Some(err.to_string()),
            response_time: None,
            timestamp: core::timestamp(),
            model: None,
            history: None,
        }
    }
}

/// A successful assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    pub model: String,
    pub elapsed: Duration,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unreachable,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_status: Option<u16>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub current_model: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: SamplingOptions,
}

#[derive(Serialize)]
struct SamplingOptions {
    temperature: f64,
    top_p: f64,
    top_k: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaReply>,
}

#[derive(Deserialize)]
struct OllamaReply {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Clone)]
pub struct ChatRelay {
    client: reqwest::Client,
    config: ChatRelayConfig,
}

impl ChatRelay {
    #[must_use]
    pub fn new(config: ChatRelayConfig) -> Self {
        Self {
            client: core::http_client(),
            config,
        }
    }

    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Sends one chat turn and reports the outcome without ever failing.
    ///
    /// `model` falls back to the configured default. On success the caller's
    /// `history` gains the user message followed by the assistant reply.
    pub async fn chat(
        &self,
        message: &str,
        history: Option<&mut Vec<ChatMessage>>,
        model: Option<&str>,
    ) -> ChatResult {
        let model = model.filter(|m| !core::is_blank(m)).unwrap_or(self.default_model());
        match self.try_chat(message, history, model).await {
            Ok(reply) => ChatResult::succeeded(reply),
            Err(e) => {
                tracing::warn!("Chat request failed: {e}");
                ChatResult::failed(&e)
            }
        }
    }

    /// Sends `history` plus the new user `message` to `model`.
    ///
    /// `history` is only touched after a reply has been received, so a failed
    /// call leaves it exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] when the message is blank, Ollama cannot be
    /// reached, answers with a non-200 status, or sends an unexpected body.
    pub async fn try_chat(
        &self,
        message: &str,
        history: Option<&mut Vec<ChatMessage>>,
        model: &str,
    ) -> Result<ChatReply, RelayError> {
        if core::is_blank(message) {
            return Err(RelayError::EmptyInput("message"));
        }

        let mut messages = history.as_deref().cloned().unwrap_or_default();
        messages.push(ChatMessage::user(message));

        let payload = OllamaChatRequest {
            model,
            messages: &messages,
            stream: false,
            options: SamplingOptions {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
            },
        };

        tracing::info!("Sending {} message(s) to {model}", messages.len());

        let started = Instant::now();
        let response = self
            .client
            .post(core::join_url(&self.config.base_url, "/api/chat"))
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::from_transport(SERVICE, &e))?;
        let elapsed = started.elapsed();

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
                detail: Some(body).filter(|b| !b.is_empty()),
            });
        }

        let body: OllamaChatResponse = response.json().await.map_err(|e| RelayError::InvalidResponse {
            service: SERVICE,
            reason: e.to_string(),
        })?;
        let reply = body
            .message
            .map(|m| m.content)
            .ok_or_else(|| RelayError::InvalidResponse {
                service: SERVICE,
                reason: "missing message.content".to_string(),
            })?;

        tracing::info!("{model} replied in {}", core::format_elapsed(elapsed));

        if let Some(history) = history {
            history.push(ChatMessage::user(message));
            history.push(ChatMessage::assistant(reply.clone()));
        }

        Ok(ChatReply {
            reply,
            model: model.to_string(),
            elapsed,
        })
    }

    /// Probes the model-listing endpoint with a short timeout.
    pub async fn health(&self) -> HealthReport {
        let report = match self
            .client
            .get(core::join_url(&self.config.base_url, "/api/tags"))
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let code = response.status();
                HealthReport {
                    status: if code == StatusCode::OK {
                        HealthStatus::Healthy
                    } else {
                        HealthStatus::Unhealthy
                    },
                    ollama_status: Some(code.as_u16()),
                }
            }
            Err(e) => {
                tracing::debug!("Health probe failed: {e}");
                HealthReport {
                    status: HealthStatus::Unreachable,
                    ollama_status: None,
                }
            }
        };

        tracing::info!("Ollama health: {}", report.status);
        report
    }

    /// Lists the models installed on the Ollama server.
    ///
    /// # Errors
    ///
    /// Any failure is returned as-is; there is no fallback model list.
    pub async fn list_models(&self) -> Result<Vec<String>, RelayError> {
        let response = self
            .client
            .get(core::join_url(&self.config.base_url, "/api/tags"))
            .timeout(self.config.health_timeout)
            .send()
            .await
            .map_err(|e| RelayError::from_transport(SERVICE, &e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
                detail: Some(core::excerpt(&body, 100)).filter(|b| !b.is_empty()),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(|e| RelayError::InvalidResponse {
            service: SERVICE,
            reason: e.to_string(),
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
