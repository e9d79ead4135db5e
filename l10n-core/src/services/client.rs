use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ProviderSettings;
use crate::error::{ConfigError, ProviderError};
use crate::services::request::TranslationRequest;
use crate::services::retry::RetryPolicy;

/// A translation model behind some transport.
///
/// `complete` makes exactly one attempt; retries belong to
/// [`TranslationClient`].
pub trait Translator: Send + Sync {
    fn complete(&self, request: &TranslationRequest) -> Result<String, ProviderError>;

    /// Model identifier; part of the cache version.
    fn model(&self) -> &str;

    fn provider_name(&self) -> &str;
}

/// Wraps a [`Translator`] with the retry policy and counts provider calls.
pub struct TranslationClient<'a> {
    translator: &'a dyn Translator,
    policy: RetryPolicy,
    calls: AtomicUsize,
}

impl<'a> TranslationClient<'a> {
    pub fn new(translator: &'a dyn Translator, policy: RetryPolicy) -> Self {
        Self {
            translator,
            policy,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        self.policy.run(|attempt| {
            self.calls.fetch_add(1, Ordering::Relaxed);
            debug!(key = %request.key(), attempt = attempt + 1, "provider call");
            self.translator.complete(request)
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

/// OpenAI-compatible chat completions endpoint.
pub struct OpenAiTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    provider: String,
    temperature: Option<f32>,
}

impl OpenAiTranslator {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        if settings.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "OPENAI_API_KEY is not configured. Set it in the environment.".into(),
            ));
        }

        let endpoint = endpoint_for(&settings.provider, settings.base_url.as_deref())?;

        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            provider: settings.provider.clone(),
            temperature: settings.temperature,
        })
    }
}

impl Translator for OpenAiTranslator {
    fn complete(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "response_format": { "type": "json_object" },
        });
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(map_transport_error)?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        // Read as text first so error bodies survive a JSON failure.
        let text = resp.text().map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(classify_status(status, retry_after, &text));
        }

        parse_completion(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}

fn endpoint_for(provider: &str, base_url: Option<&str>) -> Result<String, ConfigError> {
    if let Some(base) = base_url {
        return Ok(format!("{}/chat/completions", base.trim_end_matches('/')));
    }
    match provider {
        "openai" => Ok("https://api.openai.com/v1/chat/completions".into()),
        "deepseek" => Ok("https://api.deepseek.com/v1/chat/completions".into()),
        other => Err(ConfigError::Invalid(format!("unsupported provider: {other}"))),
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Provider(err.to_string())
    }
}

fn classify_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> ProviderError {
    let message = extract_error_message(status, body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Timeout(message)
        }
        s if s.is_server_error() => ProviderError::Provider(message),
        _ => ProviderError::Rejected(message),
    }
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet: String = if trimmed.chars().count() > 400 {
        format!("{}...", trimmed.chars().take(400).collect::<String>())
    } else {
        trimmed.to_string()
    };

    format!("HTTP {}: {}", status.as_u16(), snippet)
}

/// Pulls the translation out of a chat completion body.
///
/// The model is asked for `{"translation": "..."}`; bare text content is
/// accepted as-is.
fn parse_completion(text: &str) -> Result<String, ProviderError> {
    let v: Value = serde_json::from_str(text)
        .map_err(|_| ProviderError::Provider("invalid JSON from provider".into()))?;

    let content = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            ProviderError::Provider("invalid response: missing choices[0].message.content".into())
        })?;

    Ok(extract_translation(content))
}

fn extract_translation(content: &str) -> String {
    let trimmed = content.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => match map.get("translation").and_then(|t| t.as_str()) {
            Some(t) => t.to_string(),
            None => trimmed.to_string(),
        },
        _ => trimmed.to_string(),
    }
}
