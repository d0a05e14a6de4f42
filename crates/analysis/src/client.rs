//! Vision analysis service client.

use std::time::Duration;

use async_trait::async_trait;
use reframe_common::config::AnalysisSettings;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{AnalyzeRequest, AnalyzeResponse, HealthResponse};

/// An external service that locates the salient subject in an image.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Analyze one image. The response is returned unvalidated.
    async fn analyze(&self, request: &AnalyzeRequest) -> AnalysisResult<AnalyzeResponse>;

    /// Whether the service is reachable and healthy.
    async fn health_check(&self) -> AnalysisResult<bool>;
}

/// Configuration for [`HttpVisionClient`].
#[derive(Debug, Clone)]
pub struct VisionClientConfig {
    /// Base URL of the vision service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for retryable failures
    pub max_retries: u32,
}

impl Default for VisionClientConfig {
    fn default() -> Self {
        Self::from(&AnalysisSettings::default())
    }
}

impl From<&AnalysisSettings> for VisionClientConfig {
    fn from(settings: &AnalysisSettings) -> Self {
        Self {
            base_url: settings.service_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
        }
    }
}

/// HTTP client for the vision analysis service.
pub struct HttpVisionClient {
    http: Client,
    config: VisionClientConfig,
}

impl HttpVisionClient {
    pub fn new(config: VisionClientConfig) -> AnalysisResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AnalysisError::Network)?;

        Ok(Self { http, config })
    }

    async fn post_analyze(
        &self,
        url: &str,
        request: &AnalyzeRequest,
    ) -> AnalysisResult<AnalyzeResponse> {
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ServiceUnavailable(format!(
                "vision service returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::RequestFailed(format!(
                "vision service returned {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let parsed: AnalyzeResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> AnalysisError {
        if err.is_timeout() {
            AnalysisError::Timeout(self.config.timeout.as_secs())
        } else {
            AnalysisError::Network(err)
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> AnalysisResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AnalysisResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        attempt = attempt + 1,
                        ?delay,
                        error = %e,
                        "Vision request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| AnalysisError::RequestFailed("Unknown error".to_string())))
    }
}

#[async_trait]
impl VisionService for HttpVisionClient {
    async fn analyze(&self, request: &AnalyzeRequest) -> AnalysisResult<AnalyzeResponse> {
        let url = format!("{}/analyze", self.config.base_url);
        debug!(url = %url, image = %request.image_path.display(), "Sending vision request");
        self.with_retry(|| self.post_analyze(&url, request)).await
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Vision service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Vision service health check error: {}", e);
                Ok(false)
            }
        }
    }
}
