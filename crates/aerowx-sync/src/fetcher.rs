//! Upstream METAR/TAF client.

use std::sync::Arc;
use std::time::Duration;

use aerowx_core::{NetworkError, UpstreamConfig};
use aerowx_weather::{RawMetar, RawTaf};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::UpstreamError;
use crate::gate::RateGate;

/// Result of a successful upstream call.
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    Data(T),
    /// Upstream has nothing current for this airport.
    NoData,
}

impl<T> Fetched<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Data(value) => Some(value),
            Self::NoData => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Metar,
    Taf,
}

impl ReportKind {
    pub fn path(self) -> &'static str {
        match self {
            Self::Metar => "metar",
            Self::Taf => "taf",
        }
    }
}

pub struct Fetcher {
    client: reqwest::Client,
    base_url: String,
    gate: Arc<dyn RateGate>,
}

impl Fetcher {
    pub fn new(config: &UpstreamConfig, gate: Arc<dyn RateGate>) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            gate,
        })
    }

    /// Latest observation for one airport.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_metar(&self, icao: &str) -> Result<Fetched<RawMetar>, UpstreamError> {
        self.fetch_first(ReportKind::Metar, icao).await
    }

    /// Current forecast for one airport.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_taf(&self, icao: &str) -> Result<Fetched<RawTaf>, UpstreamError> {
        self.fetch_first(ReportKind::Taf, icao).await
    }

    async fn fetch_first<T: DeserializeOwned>(
        &self,
        kind: ReportKind,
        icao: &str,
    ) -> Result<Fetched<T>, UpstreamError> {
        let url = format!("{}/{}", self.base_url, kind.path());

        self.gate.acquire().await;
        tracing::debug!("Fetching {} for {}", kind.path(), icao);

        let response = self
            .client
            .get(&url)
            .query(&[("ids", icao.to_ascii_uppercase().as_str()), ("format", "json")])
            .send()
            .await?;

        let mut reports: Vec<T> = match self.handle_response(response).await? {
            Some(reports) => reports,
            None => return Ok(Fetched::NoData),
        };

        if reports.is_empty() {
            return Ok(Fetched::NoData);
        }
        Ok(Fetched::Data(reports.swap_remove(0)))
    }

    /// `None` for a 204 or an empty body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<Vec<T>>, UpstreamError> {
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| UpstreamError::Body(e.to_string()))
    }
}
