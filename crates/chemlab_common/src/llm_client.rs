//! Analysis Collaborator client
//!
//! The session controller only sees the `AnalysisClient` trait. Production
//! wires in `HttpAnalysisClient` (Ollama or OpenAI-compatible endpoints in
//! JSON mode); tests use `FakeAnalysisClient` with scripted replies.

use crate::analysis::AnalysisRequest;
use crate::error::AnalysisError;
use crate::prompts::{analysis_prompt, ANALYSIS_SCHEMA, SAFETY_OFFICER_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// LLM configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// The analysis collaborator.
///
/// Returns the raw structured response; `analysis::interpret` validates it.
/// Implementations carry no ordering guarantee across concurrent calls.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<serde_json::Value, AnalysisError>;
}

/// Real collaborator over HTTP
pub struct HttpAnalysisClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl HttpAnalysisClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { config, client })
    }

    /// Check if endpoint is Ollama-style
    fn is_ollama_endpoint(&self) -> bool {
        self.config.endpoint.contains("11434") || self.config.endpoint.contains("ollama")
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::CollaboratorUnavailable(format!(
                "request timed out after {} seconds",
                self.config.timeout_secs
            ))
        } else {
            AnalysisError::CollaboratorUnavailable(format!("request failed: {}", e))
        }
    }

    async fn call_ollama(&self, prompt: &str) -> Result<serde_json::Value, AnalysisError> {
        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));

        let request_body = serde_json::json!({
            "model": self.config.model,
            "system": SAFETY_OFFICER_PROMPT,
            "prompt": prompt,
            "stream": false,
            "format": "json",
        });

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(AnalysisError::CollaboratorUnavailable(format!(
                "HTTP {} from Ollama",
                response.status()
            )));
        }

        let envelope: serde_json::Value = response.json().await.map_err(|e| {
            AnalysisError::CollaboratorUnavailable(format!("unreadable response body: {}", e))
        })?;

        let text = envelope
            .get("response")
            .and_then(|v| v.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AnalysisError::CollaboratorUnavailable("empty response".to_string()))?;

        parse_model_output(text)
    }

    async fn call_openai_compatible(&self, prompt: &str) -> Result<serde_json::Value, AnalysisError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SAFETY_OFFICER_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(AnalysisError::CollaboratorUnavailable(format!(
                "HTTP {} from OpenAI-compatible API",
                response.status()
            )));
        }

        let envelope: serde_json::Value = response.json().await.map_err(|e| {
            AnalysisError::CollaboratorUnavailable(format!("unreadable response body: {}", e))
        })?;

        let text = envelope
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AnalysisError::CollaboratorUnavailable("empty response".to_string()))?;

        parse_model_output(text)
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<serde_json::Value, AnalysisError> {
        if !self.config.enabled {
            return Err(AnalysisError::CollaboratorUnavailable(
                "LLM is disabled in configuration".to_string(),
            ));
        }

        let prompt = format!(
            "{}\n\nYou must respond with valid JSON matching this schema:\n{}",
            analysis_prompt(request),
            ANALYSIS_SCHEMA
        );

        debug!(
            "Analysis {} -> {} ({} chars)",
            request.id,
            self.config.endpoint,
            prompt.len()
        );

        if self.is_ollama_endpoint() {
            self.call_ollama(&prompt).await
        } else {
            self.call_openai_compatible(&prompt).await
        }
    }
}

/// Model output is text that should itself be JSON. Tolerates a ```json fence.
fn parse_model_output(text: &str) -> Result<serde_json::Value, AnalysisError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| {
        AnalysisError::InvalidResponse(format!("LLM output is not valid JSON: {}", e))
    })
}

/// One scripted reply
#[derive(Debug, Clone)]
pub struct FakeReply {
    pub delay: Duration,
    pub outcome: Result<serde_json::Value, AnalysisError>,
}

impl FakeReply {
    pub fn ok(json: serde_json::Value) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(json),
        }
    }

    pub fn err(error: AnalysisError) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(error),
        }
    }

    /// Settle only after `delay` (virtual time under a paused runtime)
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Fake collaborator for testing
///
/// Replies are consumed in order; the last one repeats forever.
pub struct FakeAnalysisClient {
    replies: Mutex<Vec<FakeReply>>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl FakeAnalysisClient {
    pub fn new(replies: Vec<FakeReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a fake client that always returns valid JSON
    pub fn always_valid(json: serde_json::Value) -> Self {
        Self::new(vec![FakeReply::ok(json)])
    }

    /// Create a fake client that always returns an error
    pub fn always_error(error: AnalysisError) -> Self {
        Self::new(vec![FakeReply::err(error)])
    }

    /// Get the number of calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received, in call order
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> FakeReply {
        let mut replies = self.replies.lock().unwrap();
        match replies.len() {
            0 => FakeReply::err(AnalysisError::CollaboratorUnavailable(
                "no scripted reply".to_string(),
            )),
            1 => replies[0].clone(),
            _ => replies.remove(0),
        }
    }
}

#[async_trait]
impl AnalysisClient for FakeAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<serde_json::Value, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.next_reply();

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        reply.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RequestId;

    fn request(id: u64) -> AnalysisRequest {
        AnalysisRequest::new(RequestId(id), Vec::new(), 25)
    }

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert!(config.enabled);
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2:3b");
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_parse_model_output_plain_and_fenced() {
        let plain = parse_model_output(r#"{"reaction": "none"}"#).unwrap();
        assert_eq!(plain["reaction"], "none");

        let fenced = parse_model_output("```json\n{\"riskScore\": 4}\n```").unwrap();
        assert_eq!(fenced["riskScore"], 4);
    }

    #[test]
    fn test_parse_model_output_rejects_prose() {
        let err = parse_model_output("The mixture is safe.").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_disabled_http_client_is_unavailable() {
        let client = HttpAnalysisClient::new(LlmConfig {
            enabled: false,
            ..LlmConfig::default()
        })
        .unwrap();

        let err = client.analyze(&request(1)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::CollaboratorUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fake_client_always_valid() {
        let json = serde_json::json!({"test": "data"});
        let client = FakeAnalysisClient::always_valid(json.clone());

        assert_eq!(client.analyze(&request(1)).await.unwrap(), json);
        assert_eq!(client.analyze(&request(2)).await.unwrap(), json);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fake_client_multiple_replies() {
        let client = FakeAnalysisClient::new(vec![
            FakeReply::ok(serde_json::json!({"response": 1})),
            FakeReply::err(AnalysisError::CollaboratorUnavailable("timeout".into())),
        ]);

        assert_eq!(client.analyze(&request(1)).await.unwrap()["response"], 1);
        assert!(client.analyze(&request(2)).await.is_err());
        assert!(client.analyze(&request(3)).await.is_err());

        let ids: Vec<_> = client.requests().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RequestId(1), RequestId(2), RequestId(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fake_client_delay_uses_virtual_time() {
        let client = FakeAnalysisClient::new(vec![
            FakeReply::ok(serde_json::json!({})).after(Duration::from_secs(5))
        ]);
        let start = tokio::time::Instant::now();
        client.analyze(&request(1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
