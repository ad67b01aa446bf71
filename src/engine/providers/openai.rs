// chatsql Engine — OpenAI-Compatible Provider
// Handles: Groq, OpenAI, Ollama and any OpenAI-compatible REST API.
// Implements the TextGenerator trait: one-shot completions for SQL synthesis,
// SSE streaming for answers.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{FragmentStream, ProviderError, TextGenerator};
use crate::atoms::types::ProviderKind;
use crate::engine::config::AssistantConfig;
use crate::engine::http::{self, build_client, classify_status, parse_retry_after, truncate_utf8};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use log::{debug, error, info};
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt::Display;

// ── OpenAI provider struct ─────────────────────────────────────────────────

pub struct OpenAiProvider {
    client: Client,
    kind: ProviderKind,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(config: &AssistantConfig) -> EngineResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| config.provider.default_base_url().to_string());
        if base_url.is_empty() {
            return Err(EngineError::Config(format!(
                "provider '{}' has no base_url",
                config.provider.as_str()
            )));
        }
        Ok(OpenAiProvider {
            client: build_client(config.connect_timeout_secs, config.request_timeout_secs)?,
            kind: config.provider,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(prompt: &str, model: &str, temperature: Option<f64>, stream: bool) -> Value {
        let mut body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": stream,
        });
        if let Some(temp) = temperature {
            body["temperature"] = json!(temp);
        }
        body
    }

    /// POST the body and return the response once it is known to be a success.
    async fn send(&self, body: &Value, model: &str) -> Result<reqwest::Response, ProviderError> {
        let url = self.endpoint();
        info!("[provider] {} request to {} model={}", self.kind.as_str(), url, model);

        let mut req = self.client.post(&url).header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = req
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body_text = response.text().await.unwrap_or_default();
            error!(
                "[provider] {} error {}: {}",
                self.kind.as_str(),
                status,
                truncate_utf8(&body_text, 500)
            );
            return Err(classify_status(status, &body_text, retry_after));
        }

        Ok(response)
    }
}

/// Extract the message text from a non-streaming chat completion.
pub(crate) fn parse_completion(v: &Value) -> Result<String, ProviderError> {
    if let Some(message) = api_error_message(v) {
        return Err(ProviderError::Malformed(message));
    }
    v["choices"]
        .get(0)
        .and_then(|c| c["message"]["content"].as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            ProviderError::Malformed("no choices[0].message.content in completion".into())
        })
}

/// Parse one SSE `data:` payload. `Ok(None)` for chunks that carry no text
/// (role announcements, finish markers, usage-only chunks).
pub(crate) fn parse_sse_delta(data: &str) -> Result<Option<String>, ProviderError> {
    let v: Value = serde_json::from_str(data).map_err(|e| {
        ProviderError::Malformed(format!(
            "SSE parsing error: {}, data: {}",
            e,
            truncate_utf8(data, 200)
        ))
    })?;

    if let Some(message) = api_error_message(&v) {
        return Err(ProviderError::Malformed(format!("SSE API error: {}", message)));
    }

    Ok(v["choices"]
        .get(0)
        .and_then(|c| c["delta"]["content"].as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string()))
}

fn api_error_message(v: &Value) -> Option<String> {
    let error = v.get("error")?;
    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("An error occurred during streaming".to_string())
}

/// Turn a raw SSE byte stream into text fragments.
///
/// Ends on `[DONE]` or when the bytes run out. The first error is yielded
/// and ends the sequence; fragments already yielded stay valid.
pub(crate) fn sse_fragments<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let events = Box::pin(bytes.eventsource());
    let stream = futures::stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        loop {
            match events.next().await {
                None => return None,
                Some(Err(e)) => {
                    error!("[provider] SSE stream error: {}", e);
                    let err = ProviderError::Transport(format!("Stream read error: {}", e));
                    return Some((Err(err), None));
                }
                Some(Ok(event)) => {
                    if event.data == "[DONE]" {
                        return None;
                    }
                    match parse_sse_delta(&event.data) {
                        Ok(Some(text)) => return Some((Ok(text), Some(events))),
                        Ok(None) => continue,
                        Err(e) => {
                            error!("[provider] {}", e);
                            return Some((Err(e), None));
                        }
                    }
                }
            }
        }
    });
    Box::pin(stream)
}

// ── TextGenerator implementation ───────────────────────────────────────────

#[async_trait]
impl TextGenerator for OpenAiProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: Option<f64>,
    ) -> Result<String, ProviderError> {
        let body = Self::request_body(prompt, model, temperature, false);
        let response = self.send(&body, model).await?;
        let v: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("completion body: {}", e)))?;
        let text = parse_completion(&v)?;
        debug!("[provider] completion: {}", http::log_preview(&text, 200));
        Ok(text)
    }

    async fn complete_stream(
        &self,
        prompt: &str,
        model: &str,
        temperature: Option<f64>,
    ) -> Result<FragmentStream, ProviderError> {
        let body = Self::request_body(prompt, model, temperature, true);
        let response = self.send(&body, model).await?;
        Ok(sse_fragments(response.bytes_stream()))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
