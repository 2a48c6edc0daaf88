//! OpenAI-compatible HTTP adapter for chat completion and embeddings.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ChatClient, ChatMessage, EmbeddingClient};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::{tlog_debug, tlog_trace};

/// Client for any service exposing `/chat/completions` and `/embeddings`.
///
/// Calls are made once; failures propagate to the caller unchanged.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    /// Build a client from provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the API key or either model
    /// name is missing. No request is made.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = required(&config.api_key, "provider.api_key (or TDQ_API_KEY)")?;
        let chat_model = required(&config.chat_model, "provider.chat_model")?;
        let embedding_model = required(&config.embedding_model, "provider.embedding_model")?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model,
            embedding_model,
            temperature: config.temperature,
        })
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("{} returned {}: {}", url, status, text)));
        }

        Ok(response.json::<T>().await?)
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::Configuration(format!("{} is not set", name))),
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        tlog_debug!(
            "chat request model={} messages={}",
            self.chat_model,
            messages.len()
        );
        let body = serde_json::json!({
            "model": self.chat_model,
            "messages": messages,
            "temperature": self.temperature,
        });
        let response: ChatResponse = self.post("chat/completions", &body).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Provider("chat response had no content".to_string()))?;
        tlog_trace!("chat response: {}", content);
        Ok(content)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": text,
        });
        let response: EmbeddingResponse = self.post("embeddings", &body).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Provider("embedding response had no data".to_string()))
    }
}
