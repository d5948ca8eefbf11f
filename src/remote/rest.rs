//! HTTP implementation of [`ReportBackend`]
//!
//! Speaks the PostgREST dialect for rows (`/rest/v1/<table>`) and the
//! storage API for photos (`/storage/v1/object/<bucket>/<path>`).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

use crate::config::Config;
use crate::remote::{ReportBackend, ReportQuery};
use crate::shared::error::BackendError;
use crate::shared::report::{NewReportRow, ReportRow};

/// Photos are served with a one hour cache lifetime
const PHOTO_CACHE_CONTROL: &str = "3600";

/// HTTP client for the hosted backend
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl RestBackend {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.commit_timeout() + Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: config.backend_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().map(str::to_string),
            access_token: None,
        })
    }

    /// Authenticate requests as a signed-in user
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Public URL for an object in a bucket
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        match self.access_token.as_ref().or(self.api_key.as_ref()) {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

async fn check_status(response: Response, action: &str) -> Result<Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(action, status = status.as_u16(), %body, "backend call rejected");
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ReportBackend for RestBackend {
    async fn select_reports(&self, query: &ReportQuery) -> Result<Vec<ReportRow>, BackendError> {
        let url = format!("{}/rest/v1/{}", self.base_url, query.source);

        let mut params: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &query.equals {
            params.push((column.clone(), format!("eq.{}", value)));
        }
        if let Some(column) = &query.order_desc {
            params.push(("order".to_string(), format!("{}.desc", column)));
        }

        let response = self
            .authorize(self.client.get(&url).query(&params))
            .send()
            .await?;
        let response = check_status(response, "select").await?;

        response
            .json::<Vec<ReportRow>>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }

    async fn insert_report(&self, table: &str, report: &NewReportRow) -> Result<ReportRow, BackendError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);

        let response = self
            .authorize(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(report)
            .send()
            .await?;
        let response = check_status(response, "insert").await?;

        let mut rows = response
            .json::<Vec<ReportRow>>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        if rows.is_empty() {
            return Err(BackendError::Malformed("insert returned no rows".to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", content_type)
            .header("Cache-Control", PHOTO_CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check_status(response, "upload").await?;

        Ok(self.public_url(bucket, path))
    }
}
