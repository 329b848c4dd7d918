use std::time::Duration;

use jobwatch_core::{ChartPayload, FilterPayload, JobId};
use jobwatch_logging::watch_debug;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{FailureKind, GatewayError, JobsPage, JobsResponse, StatusCounts};

const CSRF_HEADER: &str = "X-CSRFToken";
const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub jobs_path: String,
    pub chart_path: String,
    pub restart_path: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            jobs_path: "api/filterjobs/".to_string(),
            chart_path: "api/jobschartdata/".to_string(),
            restart_path: "api/resetjobs/".to_string(),
        }
    }
}

/// Backend the dashboard reads jobs from. Implementations own transport
/// timeouts; callers never time a request out themselves.
#[async_trait::async_trait]
pub trait JobsGateway: Send + Sync {
    /// Fetches the jobs matching `payload`. Should stop early and return a
    /// `Cancelled` error once `cancel` fires, where the transport allows it.
    async fn fetch(
        &self,
        payload: &FilterPayload,
        cancel: &CancellationToken,
    ) -> Result<JobsPage, GatewayError>;

    async fn fetch_chart_data(&self, payload: &ChartPayload) -> Result<StatusCounts, GatewayError>;

    async fn restart_jobs(&self, ids: &[JobId]) -> Result<(), GatewayError>;
}

#[derive(Serialize)]
struct RestartBody<'a> {
    job_ids: &'a [JobId],
}

/// [`JobsGateway`] over HTTP, posting JSON with the page's anti-forgery token.
#[derive(Debug, Clone)]
pub struct ReqwestGateway {
    client: reqwest::Client,
    base_url: Url,
    csrf_token: HeaderValue,
    settings: GatewaySettings,
}

impl ReqwestGateway {
    pub fn new(
        base_url: &str,
        csrf_token: impl Into<String>,
        settings: GatewaySettings,
    ) -> Result<Self, GatewayError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| GatewayError::new(FailureKind::InvalidUrl, err.to_string()))?;
        // Endpoint paths are relative; without the slash `join` would drop
        // the last base segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let mut csrf_token = HeaderValue::from_str(&csrf_token.into())
            .map_err(|err| GatewayError::new(FailureKind::InvalidToken, err.to_string()))?;
        csrf_token.set_sensitive(true);
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| GatewayError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            csrf_token,
            settings,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>, GatewayError> {
        let url = self.endpoint(path)?;
        let body = serde_json::to_vec(body)
            .map_err(|err| GatewayError::new(FailureKind::Decode, err.to_string()))?;

        watch_debug!("POST {} ({} bytes)", url, body.len());
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(CSRF_HEADER, self.csrf_token.clone())
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl JobsGateway for ReqwestGateway {
    async fn fetch(
        &self,
        payload: &FilterPayload,
        cancel: &CancellationToken,
    ) -> Result<JobsPage, GatewayError> {
        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::cancelled()),
            result = self.post_json(&self.settings.jobs_path, payload) => result?,
        };
        let response: JobsResponse = decode_json(&bytes)?;
        Ok(response.into())
    }

    async fn fetch_chart_data(&self, payload: &ChartPayload) -> Result<StatusCounts, GatewayError> {
        let bytes = self.post_json(&self.settings.chart_path, payload).await?;
        decode_json(&bytes)
    }

    async fn restart_jobs(&self, ids: &[JobId]) -> Result<(), GatewayError> {
        self.post_json(&self.settings.restart_path, &RestartBody { job_ids: ids })
            .await
            .map(|_| ())
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(bytes)
        .map_err(|err| GatewayError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        return GatewayError::new(FailureKind::Timeout, err.to_string());
    }
    GatewayError::new(FailureKind::Network, err.to_string())
}
