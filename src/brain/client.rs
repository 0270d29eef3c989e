// Brain client - HTTP communication with the generateContent endpoint

use super::{BrainConfig, BrainError, BrainInitError, GenerateContentRequest, GenerateContentResponse};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Direct HTTP client. Holds no credential; the key is supplied per call.
#[derive(Clone)]
pub struct GeminiClient {
    config: BrainConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new client
    pub fn new(config: BrainConfig) -> Result<Self, BrainInitError> {
        info!(
            api_base = %config.api_base,
            model = %config.default_model,
            connect_timeout_secs = config.connect_timeout_secs,
            "initializing gemini client"
        );

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Get default model
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Get default timeout
    pub fn default_timeout_ms(&self) -> u64 {
        self.config.default_timeout_ms
    }

    /// Issue one `generateContent` call. No retries: retry policy belongs to the caller.
    pub async fn generate(
        &self,
        model: &str,
        secret: &str,
        request: &GenerateContentRequest,
        timeout: Duration,
    ) -> Result<GenerateContentResponse, BrainError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model
        );
        let timeout_ms = timeout.as_millis() as u64;

        info!(
            model = %model,
            contents = request.contents.len(),
            has_tools = request.tools.is_some(),
            timeout_ms = timeout_ms,
            "starting generateContent"
        );
        debug!(url = %url, "sending HTTP request");

        let start = Instant::now();
        let send = async {
            let response = self
                .client
                .post(&url)
                .query(&[("key", secret)])
                .json(request)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(timeout, send).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) if e.is_timeout() => return Err(BrainError::Timeout(timeout_ms)),
            // Strip the URL so the key query parameter never reaches logs or callers.
            Ok(Err(e)) => return Err(BrainError::Network(e.without_url())),
            Err(_) => {
                warn!(timeout_ms = timeout_ms, "generateContent timed out");
                return Err(BrainError::Timeout(timeout_ms));
            }
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(status = status.as_u16(), latency_ms = latency_ms, "received HTTP response");

        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), message = %message, "generateContent failed");
            return Err(map_status(status, message));
        }

        let body_preview: String = body.chars().take(200).collect();
        debug!(response_preview = %body_preview, "response body received");

        let response: GenerateContentResponse = serde_json::from_str(&body)?;
        if let Some(err) = &response.error {
            return Err(BrainError::Api {
                status: err.code.unwrap_or(status.as_u16()),
                message: err.message.clone(),
            });
        }

        info!(
            model = %model,
            latency_ms = latency_ms,
            candidates = response.candidates.len(),
            "generateContent completed"
        );
        Ok(response)
    }
}

fn map_status(status: StatusCode, message: String) -> BrainError {
    match status.as_u16() {
        400 => BrainError::InvalidRequest(message),
        401 | 403 => BrainError::InvalidCredential(message),
        429 => BrainError::RateLimited(message),
        code => BrainError::Api {
            status: code,
            message,
        },
    }
}

/// Pull `error.message` out of an error body, or fall back to a body preview.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
