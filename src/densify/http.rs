//! Densifiers that talk to an HTTP API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use super::error::DensifyError;
use super::prompt::{checked_user_prompt, parse_output, SYSTEM_PROMPT};
use super::{Densifier, DensifyOutput, DensifyRequest, Provider};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maps an unsuccessful HTTP status onto the densifier error taxonomy.
pub fn classify_status(status: StatusCode, body: &str, provider: Provider, model: &str) -> DensifyError {
    let detail = format!("{} API error ({}): {}", provider.display_name(), status, body.trim());
    let lowered = body.to_lowercase();
    let mentions_missing_model = lowered.contains("model")
        && (lowered.contains("not found")
            || lowered.contains("does not exist")
            || lowered.contains("not_found"));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DensifyError::AuthenticationFailed(detail),
        StatusCode::NOT_FOUND => model_unavailable(provider, model, detail),
        StatusCode::BAD_REQUEST if mentions_missing_model => model_unavailable(provider, model, detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => DensifyError::Timeout(detail),
        StatusCode::TOO_MANY_REQUESTS => DensifyError::Transient(detail),
        status if status.is_server_error() || status.as_u16() == 529 => DensifyError::Transient(detail),
        _ => DensifyError::Rejected(detail),
    }
}

fn model_unavailable(provider: Provider, model: &str, message: String) -> DensifyError {
    DensifyError::ModelUnavailable {
        model: model.to_string(),
        message,
        suggestions: provider
            .suggested_models()
            .iter()
            .filter(|suggestion| **suggestion != model)
            .map(|suggestion| suggestion.to_string())
            .collect(),
    }
}

fn classify_transport(err: reqwest::Error, provider: Provider) -> DensifyError {
    let detail = format!("{} request failed: {err}", provider.display_name());
    if err.is_timeout() {
        DensifyError::Timeout(detail)
    } else {
        DensifyError::Transient(detail)
    }
}

async fn send_json(request: RequestBuilder, provider: Provider, model: &str) -> Result<Value, DensifyError> {
    let response = request
        .send()
        .await
        .map_err(|err| classify_transport(err, provider))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, &body, provider, model));
    }

    response.json::<Value>().await.map_err(|err| {
        DensifyError::Transient(format!(
            "Invalid response from {}: {err}",
            provider.display_name()
        ))
    })
}

fn required_credential(request: &DensifyRequest) -> Result<&str, DensifyError> {
    request
        .credential
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            DensifyError::AuthenticationFailed(format!(
                "No API key configured for {}",
                request.provider.display_name()
            ))
        })
}

fn missing_field(provider: Provider) -> DensifyError {
    DensifyError::Transient(format!(
        "Invalid response format from {}",
        provider.display_name()
    ))
}

/// OpenAI chat completions (or any compatible endpoint).
pub struct OpenAiDensifier {
    client: Client,
    base_url: String,
    max_output_tokens: u32,
}

impl OpenAiDensifier {
    pub fn new(client: Client, base_url: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            max_output_tokens,
        }
    }
}

#[async_trait]
impl Densifier for OpenAiDensifier {
    async fn densify(&self, request: &DensifyRequest) -> Result<DensifyOutput, DensifyError> {
        let prompt = checked_user_prompt(request)?;
        let api_key = required_credential(request)?;

        let body = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.max_output_tokens,
            "temperature": 0.2
        });

        let http = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&body);
        let response = send_json(http, Provider::OpenAi, &request.model).await?;

        let text = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| missing_field(Provider::OpenAi))?;
        parse_output(text)
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }
}

/// Anthropic messages API.
pub struct AnthropicDensifier {
    client: Client,
    base_url: String,
    max_output_tokens: u32,
}

impl AnthropicDensifier {
    pub fn new(client: Client, base_url: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            max_output_tokens,
        }
    }
}

#[async_trait]
impl Densifier for AnthropicDensifier {
    async fn densify(&self, request: &DensifyRequest) -> Result<DensifyOutput, DensifyError> {
        let prompt = checked_user_prompt(request)?;
        let api_key = required_credential(request)?;

        let body = json!({
            "model": request.model,
            "max_tokens": self.max_output_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let http = self
            .client
            .post(format!("{}/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let response = send_json(http, Provider::Anthropic, &request.model).await?;

        let text = anthropic_text(&response).ok_or_else(|| missing_field(Provider::Anthropic))?;
        parse_output(&text)
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }
}

/// Concatenates the `text` blocks of a messages API reply.
fn anthropic_text(response: &Value) -> Option<String> {
    let blocks = response["content"].as_array()?;
    let text: Vec<&str> = blocks
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();
    (!text.is_empty()).then(|| text.join(""))
}

/// Ollama's `/api/chat`, non-streaming.
pub struct OllamaDensifier {
    client: Client,
    base_url: String,
    max_output_tokens: u32,
}

impl OllamaDensifier {
    pub fn new(client: Client, base_url: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            max_output_tokens,
        }
    }
}

#[async_trait]
impl Densifier for OllamaDensifier {
    async fn densify(&self, request: &DensifyRequest) -> Result<DensifyOutput, DensifyError> {
        let prompt = checked_user_prompt(request)?;

        let body = json!({
            "model": request.model,
            "stream": false,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "options": { "num_predict": self.max_output_tokens }
        });

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            // Nothing listening: the server is not installed or not started.
            Err(err) if err.is_connect() => {
                return Err(DensifyError::ToolNotFound(format!(
                    "Ollama is not reachable at {}: {err}",
                    self.base_url
                )))
            }
            Err(err) => return Err(classify_transport(err, Provider::Ollama)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body, Provider::Ollama, &request.model));
        }
        let response: Value = response
            .json()
            .await
            .map_err(|err| DensifyError::Transient(format!("Invalid response from Ollama: {err}")))?;

        let text = response["message"]["content"]
            .as_str()
            .ok_or_else(|| missing_field(Provider::Ollama))?;
        parse_output(text)
    }

    fn provider(&self) -> Provider {
        Provider::Ollama
    }
}
