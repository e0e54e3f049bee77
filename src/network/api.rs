use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::common::{BatchAnswer, Category, ConsultOutcome, HealthStatus, ModelInfo};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(String),
}

/// Body of `/api/consult`. Success and error share one shape on the wire;
/// only the presence of `error` tells them apart.
#[derive(Debug, Deserialize)]
struct ConsultBody {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    processing_time: Option<f64>,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    questions: &'a [String],
    category: Category,
}

#[derive(Debug, Deserialize)]
struct BatchBody {
    #[serde(default)]
    results: Vec<BatchAnswer>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    processing_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ModelInfoBody {
    #[serde(flatten)]
    info: ModelInfo,
    #[serde(default)]
    error: Option<Value>,
}

impl ModelInfoBody {
    fn into_result(self) -> Result<ModelInfo, String> {
        match self.error {
            Some(error) => Err(error_text(error)),
            None => Ok(self.info),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    model_info: Option<ModelInfoBody>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// HTTP client for the consulting backend.
#[derive(Clone)]
pub struct ConsultApi {
    client: Client,
    base_url: String,
}

impl ConsultApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn consult(&self, question: &str, category: Category) -> ConsultOutcome {
        let url = consult_url(&self.base_url, question, category);
        log::debug!("GET {url}");

        match self.get_body(&url).await {
            Ok(body) => classify_consult_body(&body),
            Err(err) => {
                log::warn!("Consult request failed: {err}");
                ConsultOutcome::TransportError(err.to_string())
            }
        }
    }

    pub async fn batch_consult(
        &self,
        questions: &[String],
        category: Category,
    ) -> Result<Vec<BatchAnswer>, ApiError> {
        let url = format!("{}/api/batch-consult", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&BatchRequest {
                questions,
                category,
            })
            .send()
            .await?;
        let body = response.bytes().await?;

        let batch: BatchBody = serde_json::from_slice(&body)?;
        if let Some(error) = batch.error {
            return Err(ApiError::Backend(error_text(error)));
        }
        if let Some(seconds) = batch.processing_time {
            log::info!(
                "Batch of {} answered in {seconds}s",
                batch.results.len()
            );
        }

        let mut results = batch.results;
        results.sort_by_key(|result| result.index);
        Ok(results)
    }

    pub async fn model_info(&self) -> Result<ModelInfo, ApiError> {
        let url = format!("{}/api/model-info", self.base_url);
        let body = self.get_body(&url).await?;

        let parsed: ModelInfoBody = serde_json::from_slice(&body)?;
        parsed.into_result().map_err(ApiError::Backend)
    }

    /// Never fails: an unreachable backend is reported as unhealthy.
    pub async fn health(&self) -> HealthStatus {
        let url = format!("{}/health", self.base_url);
        let body = match self.get_body(&url).await {
            Ok(body) => body,
            Err(err) => {
                return HealthStatus {
                    healthy: false,
                    detail: err.to_string(),
                    model_info: None,
                };
            }
        };

        match serde_json::from_slice::<HealthBody>(&body) {
            Ok(parsed) => {
                let status = parsed.status.unwrap_or_else(|| "unknown".to_string());
                let detail = match (parsed.error, parsed.timestamp) {
                    (Some(error), _) => format!("{status}: {}", error_text(error)),
                    (None, Some(timestamp)) => format!("{status} at {timestamp}"),
                    (None, None) => status.clone(),
                };
                HealthStatus {
                    healthy: status == "healthy",
                    detail,
                    model_info: parsed.model_info.map(ModelInfoBody::into_result),
                }
            }
            Err(err) => HealthStatus {
                healthy: false,
                detail: ApiError::from(err).to_string(),
                model_info: None,
            },
        }
    }

    async fn get_body(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        log::debug!("{url} -> {status} ({} bytes)", body.len());
        Ok(body.to_vec())
    }
}

/// `{base}/api/consult?question=..&category=..` with both values percent-encoded.
pub fn consult_url(base_url: &str, question: &str, category: Category) -> String {
    format!(
        "{}/api/consult?question={}&category={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(question),
        urlencoding::encode(category.as_str())
    )
}

/// Status codes are ignored on purpose; the body alone decides the branch.
pub fn classify_consult_body(body: &[u8]) -> ConsultOutcome {
    let parsed: ConsultBody = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(err) => return ConsultOutcome::TransportError(ApiError::from(err).to_string()),
    };

    if let Some(error) = parsed.error {
        return ConsultOutcome::ErrorPayload(error_text(error));
    }

    if let Some(seconds) = parsed.processing_time {
        log::info!(
            "Consultation ({}) answered in {seconds}s",
            parsed.category.as_deref().unwrap_or("general")
        );
    }
    ConsultOutcome::Answer(parsed.answer.unwrap_or_default())
}

fn error_text(error: Value) -> String {
    match error {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
