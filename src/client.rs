use crate::config::BackendConfig;
use crate::models::{
    ComparisonRequest, ComparisonResponse, EvaluationRecord, TranslationRequest,
    TranslationResponse,
};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

/// HTTP client for the translation backend with rate limiting.
///
/// Methods take `&mut self`, so a single client never has more than one
/// request in flight.
pub struct TranslationClient {
    http: reqwest::Client,
    base_url: String,
    rate_limit_rps: f64,
    /// Start time of the previous request
    last_request: Option<Instant>,
}

impl TranslationClient {
    /// Create a client for the configured backend
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_endpoint.trim_end_matches('/').to_string(),
            rate_limit_rps: config.rate_limit_rps,
            last_request: None,
        })
    }

    /// Enforce rate limiting for backend requests
    async fn enforce_rate_limit(last_request: &mut Option<Instant>, rate_limit_rps: f64) -> Result<()> {
        if rate_limit_rps <= 0.0 {
            return Ok(());
        }

        let min_interval = Duration::try_from_secs_f64(1.0 / rate_limit_rps)
            .with_context(|| format!("Invalid rate limit: {} requests per second", rate_limit_rps))?;

        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < min_interval {
                sleep(min_interval - elapsed).await;
            }
        }

        *last_request = Some(Instant::now());
        Ok(())
    }

    /// Ask every selected model to translate the message and collect the
    /// backend's evaluations of each translation
    pub async fn compare(&mut self, request: &ComparisonRequest) -> Result<Vec<EvaluationRecord>> {
        debug!(
            models = ?request.selected_models,
            "requesting comparison for {:?}",
            request.message
        );

        let response: ComparisonResponse = self
            .post_json("compareTranslate", request)
            .await
            .context("Failed to compare translations")?;

        debug!(records = response.validated_translations.len(), "comparison received");
        Ok(response.validated_translations)
    }

    /// Translate a message with a single model
    pub async fn translate(&mut self, request: &TranslationRequest) -> Result<String> {
        debug!(model = %request.model_choice, "requesting translation");

        let response: TranslationResponse = self
            .post_json("translate", request)
            .await
            .context("Failed to translate message")?;

        Ok(response.translate)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST a JSON body and decode a JSON reply
    async fn post_json<B, R>(&mut self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Self::enforce_rate_limit(&mut self.last_request, self.rate_limit_rps).await?;

        let url = self.endpoint(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Backend returned {} for {}: {}", status, url, text);
        }

        response
            .json::<R>()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))
    }
}
