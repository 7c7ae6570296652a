//! Cloudflare API Client
//!
//! TLSA record CRUD against the v4 REST API, scoped to one zone and one
//! record name. Non-2xx responses and `success: false` envelopes both fail.

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::fingerprint::Fingerprint;
use crate::provider::TlsaProvider;
use crate::types::{TlsaData, TlsaRecord};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare DNS client for TLSA records
pub struct CloudflareClient {
    client: Client,
    api_base: String,
    api_token: String,
    zone_id: String,
    record_name: String,
}

// ============================================================
// API Response Types
// ============================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    result: Option<T>,
}

/// DNS record as returned by the API
#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    #[serde(default)]
    data: Option<TlsaData>,
    /// Presentation form, e.g. `3 1 1 <hex>`
    #[serde(default)]
    content: String,
}

impl From<DnsRecord> for TlsaRecord {
    fn from(record: DnsRecord) -> Self {
        let certificate = match record.data {
            Some(data) => data.certificate,
            None => record
                .content
                .split_whitespace()
                .last()
                .unwrap_or_default()
                .to_string(),
        };

        TlsaRecord::new(record.id, certificate.to_lowercase())
    }
}

#[derive(Debug, Serialize)]
struct TlsaRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    data: TlsaData,
}

// ============================================================
// Client Implementation
// ============================================================

impl CloudflareClient {
    /// Create a client for the zone and record name in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tlsa-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            zone_id: config.zone_id.clone(),
            record_name: config.record_name(),
        })
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    fn request_body(&self, certificate: &Fingerprint) -> TlsaRecordRequest<'_> {
        TlsaRecordRequest {
            record_type: "TLSA",
            name: &self.record_name,
            data: TlsaData::for_fingerprint(certificate),
        }
    }

    /// Send a request and unwrap the Cloudflare envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let response = request.bearer_auth(&self.api_token).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SyncError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Err(SyncError::Provider {
                    status: status.as_u16(),
                    body: format!("unparseable response ({}): {}", e, body),
                })
            }
        };

        if !envelope.success {
            return Err(SyncError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(envelope.result)
    }

    async fn send_record(&self, request: RequestBuilder) -> Result<TlsaRecord> {
        let record: Option<DnsRecord> = self.send(request).await?;
        record.map(TlsaRecord::from).ok_or_else(|| SyncError::Provider {
            status: 200,
            body: "response contained no record".to_string(),
        })
    }
}

#[async_trait]
impl TlsaProvider for CloudflareClient {
    fn record_name(&self) -> &str {
        &self.record_name
    }

    async fn list(&self) -> Result<Vec<TlsaRecord>> {
        debug!(name = %self.record_name, "Listing TLSA records");

        let request = self
            .client
            .get(self.records_url())
            .query(&[("type", "TLSA"), ("name", self.record_name.as_str())]);

        let records: Option<Vec<DnsRecord>> = self.send(request).await?;
        Ok(records
            .unwrap_or_default()
            .into_iter()
            .map(TlsaRecord::from)
            .collect())
    }

    async fn create(&self, certificate: &Fingerprint) -> Result<TlsaRecord> {
        debug!(name = %self.record_name, certificate = %certificate, "Creating TLSA record");

        let request = self
            .client
            .post(self.records_url())
            .json(&self.request_body(certificate));

        self.send_record(request).await
    }

    async fn update(&self, id: &str, certificate: &Fingerprint) -> Result<TlsaRecord> {
        debug!(id = %id, certificate = %certificate, "Updating TLSA record");

        let request = self
            .client
            .patch(self.record_url(id))
            .json(&self.request_body(certificate));

        self.send_record(request).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        debug!(id = %id, "Deleting TLSA record");

        let request = self.client.delete(self.record_url(id));
        let _: Option<serde_json::Value> = self.send(request).await?;
        Ok(())
    }
}
