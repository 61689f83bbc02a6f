use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::RequestError,
    protocol::{HealthStatus, PredictionRequest, PredictionResult, ServiceErrorBody},
};
use tracing::{debug, warn};

pub mod config;
pub mod form;
pub mod session;

pub use config::Settings;
pub use form::FormController;
pub use session::{PredictionSession, SessionEvent, SubmissionFailure, SubmissionState, SubmitError};

const PREDICT_PATH: &str = "predict";
const HEALTH_PATH: &str = "health";

#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, RequestError>;
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        RequestError::timeout(format!("request to {endpoint} timed out: {err}"))
    } else {
        RequestError::network(format!("request to {endpoint} failed: {err}"))
    }
}

/// Talks to the remote predictor over HTTP. Every request is bounded by the
/// configured timeout.
pub struct HttpPredictionClient {
    http: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpPredictionClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let base_url = config::normalize_base_url(&settings.base_url)?;
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build HTTP client for prediction service")?;
        Ok(Self {
            http,
            base_url,
            request_timeout: settings.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub async fn health(&self) -> Result<HealthStatus, RequestError> {
        let endpoint = self.endpoint(HEALTH_PATH);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;
        if !status.is_success() {
            return Err(RequestError::ServerError {
                status: status.as_u16(),
                detail: ServiceErrorBody::detail_text(&body),
            });
        }
        serde_json::from_slice(&body)
            .map_err(|e| RequestError::decode(format!("malformed health body: {e}")))
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, RequestError> {
        let endpoint = self.endpoint(PREDICT_PATH);
        debug!(%endpoint, "sending prediction request");

        let response = self
            .http
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;

        if !status.is_success() {
            let detail = ServiceErrorBody::detail_text(&body);
            warn!(
                %endpoint,
                status = status.as_u16(),
                detail = detail.as_deref().unwrap_or_default(),
                "prediction service rejected request"
            );
            return Err(RequestError::ServerError {
                status: status.as_u16(),
                detail,
            });
        }

        PredictionResult::decode(&body).inspect_err(|error| {
            warn!(%endpoint, %error, "prediction response did not match the expected shape");
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
