//! HTTP client for the scan server endpoints.

use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{HistoryDeleteError, HistoryLoadError, TransportError, UrlError};
use crate::types::HistoryEntry;

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    target: &'a str,
}

#[derive(Clone, Debug)]
pub struct ScanApiClient {
    http: Client,
    config: ClientConfig,
}

impl ScanApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `POST /scan`. On success the returned response body is the event stream.
    pub async fn start_scan(&self, target: &str) -> Result<Response, TransportError> {
        let url = self.config.api_url("/scan");
        debug!(%url, target, "opening scan stream");
        let res = self
            .http
            .post(url)
            .json(&ScanRequest { target })
            .send()
            .await?;

        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(TransportError::UnexpectedStatus { status, body })
        }
    }

    /// `GET /history`.
    pub async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, HistoryLoadError> {
        let res = self.http.get(self.config.api_url("/history")).send().await?;

        let status = res.status();
        if status != reqwest::StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(HistoryLoadError::UnexpectedStatus { status, body });
        }
        let body = res.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| HistoryLoadError::Decode(e.to_string()))
    }

    /// `DELETE /history/{id}`.
    pub async fn delete_history(&self, id: &str) -> Result<(), HistoryDeleteError> {
        let url = self.config.endpoint(&["history", id])?;
        debug!(%url, "deleting history entry");
        let res = self.http.delete(url).send().await?;

        let status = res.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(HistoryDeleteError::UnexpectedStatus { status, body })
        }
    }

    /// Download link for `GET /export/csv/{id}`. Passed through, never fetched here.
    pub fn csv_export_url(&self, id: &str) -> Result<String, UrlError> {
        Ok(self.config.endpoint(&["export", "csv", id])?.into())
    }
}
