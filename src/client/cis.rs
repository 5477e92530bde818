use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::channels::Channel;
use crate::BoxFuture;

/// Why a remote lookup found nothing. The resolver treats all three alike.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("no usable record: {0}")]
    Value(String),

    #[error("credential error: {0}")]
    Credential(String),
}

/// Metadata describing one channel, as returned by a metadata service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMetadata {
    pub name: String,
    pub sample_rate: Option<f64>,
    pub unit: Option<String>,
    pub url: Option<String>,
    pub bits: Option<Vec<String>>,
}

impl ChannelMetadata {
    pub fn into_channel(self, name: &str) -> Channel {
        let mut channel = Channel::new(name);
        channel.sample_rate = self.sample_rate;
        channel.unit = self.unit;
        channel.url = self.url;
        channel.bits = self.bits;
        channel
    }
}

/// Remote channel-metadata lookup.
pub trait ChannelQuery: Send + Sync {
    fn query<'a>(
        &'a self,
        name: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<ChannelMetadata, QueryError>>;
}

#[derive(Debug, Deserialize)]
struct CisResponse {
    #[serde(default)]
    results: Vec<CisRecord>,
}

#[derive(Debug, Deserialize)]
struct CisRecord {
    #[serde(default)]
    id: Option<u64>,
    name: String,
    #[serde(default)]
    datarate: Option<f64>,
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    bits: Option<Vec<String>>,
}

/// HTTP client for a CIS-style channel information service.
#[derive(Debug, Clone)]
pub struct CisClient {
    base_url: String,
    client: Client,
}

impl CisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn channel_url(&self, id: u64) -> String {
        format!("{}/channel/{}", self.base_url, id)
    }

    async fn fetch(&self, name: &str, timeout: Duration) -> Result<ChannelMetadata, QueryError> {
        let url = Url::parse_with_params(&format!("{}/api/channel/", self.base_url), &[("q", name)])
            .map_err(|e| QueryError::Value(format!("bad query url: {}", e)))?;

        debug!("Querying channel metadata: {}", url);

        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(QueryError::Credential(format!("server returned {}", resp.status())));
            }
            status if !status.is_success() => {
                return Err(QueryError::Network(format!("server returned {}", status)));
            }
            _ => {}
        }

        let body = resp
            .text()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;
        self.parse_response(name, &body)
    }

    fn parse_response(&self, name: &str, body: &str) -> Result<ChannelMetadata, QueryError> {
        let response: CisResponse = serde_json::from_str(body)
            .map_err(|e| QueryError::Value(format!("bad response: {}", e)))?;

        let record = response
            .results
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| QueryError::Value(format!("no channel named '{}'", name)))?;

        Ok(ChannelMetadata {
            url: record.id.map(|id| self.channel_url(id)),
            name: record.name,
            sample_rate: record.datarate,
            unit: record.units.filter(|u| !u.is_empty()),
            bits: record.bits,
        })
    }
}

impl ChannelQuery for CisClient {
    fn query<'a>(
        &'a self,
        name: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<ChannelMetadata, QueryError>> {
        Box::pin(self.fetch(name, timeout))
    }
}
