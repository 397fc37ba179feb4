//! Client for the Hub, the shared system of record for public political-fund data.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/v1/organizations/{id}` | Public organization record |
//! | PUT    | `/api/v1/organizations/{id}` | Update organization details |
//! | POST/GET | `/api/v1/organization-requests` | Organization registration review |
//! | POST/GET | `/api/v1/election-requests` | Election registration review |
//! | POST   | `/api/v1/sync/ledger` | Upsert a ledger summary |
//! | POST   | `/api/v1/sync/journals` | Upsert anonymized journals |
//! | POST   | `/api/v1/sync/change-log` | Record a sync event |
//! | GET    | `/api/v1/sync/status` | Hub readiness |
//! | POST   | `/api/v1/uploads/image` | Image storage |
//!
//! Every request carries the `X-API-Key` header.

pub mod types;

use actix_web::web::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

pub use types::*;

/// Errors from Hub calls.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Hub answered with a non-2xx status. `message` is the Hub's `error` field.
    #[error("Hub {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
        body: String,
    },
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HubClient {
    pub fn new(base_url: Url, api_key: &str, timeout_secs: u64) -> Result<Self, HubError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "X-API-Key",
            reqwest::header::HeaderValue::from_str(api_key)
                .map_err(|_| HubError::Config("Hub API key is not a valid header".into()))?,
        );
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| HubError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, HubError> {
        let resp = request.send().await.map_err(|e| HubError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "Hub API request failed".to_string());
        Err(HubError::Api {
            endpoint: endpoint.into(),
            status,
            message,
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, resp: reqwest::Response) -> Result<T, HubError> {
        resp.json().await.map_err(|e| HubError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }

    /// Send and unwrap the `{ "data": ... }` envelope.
    async fn data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, HubError> {
        let resp = self.send(endpoint, request).await?;
        let envelope: DataEnvelope<T> = Self::decode(endpoint, resp).await?;
        Ok(envelope.data)
    }

    pub async fn get_organization(&self, id: &str) -> Result<HubOrganization, HubError> {
        let url = self.url(&format!("organizations/{id}"));
        self.data("GET /api/v1/organizations/{id}", self.http.get(url)).await
    }

    /// Forward an organization update; the Hub validates the body.
    pub async fn update_organization(&self, id: &str, body: &Value) -> Result<Value, HubError> {
        let url = self.url(&format!("organizations/{id}"));
        self.data("PUT /api/v1/organizations/{id}", self.http.put(url).json(body))
            .await
    }

    pub async fn create_organization_request(
        &self,
        request: &NewOrganizationRequest,
    ) -> Result<OrganizationRequest, HubError> {
        let url = self.url("organization-requests");
        self.data("POST /api/v1/organization-requests", self.http.post(url).json(request))
            .await
    }

    pub async fn list_organization_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<OrganizationRequest>, HubError> {
        let url = self.url("organization-requests");
        self.data("GET /api/v1/organization-requests", self.http.get(url).query(filter))
            .await
    }

    pub async fn create_election_request(
        &self,
        request: &NewElectionRequest,
    ) -> Result<ElectionRequest, HubError> {
        let url = self.url("election-requests");
        self.data("POST /api/v1/election-requests", self.http.post(url).json(request))
            .await
    }

    pub async fn list_election_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<ElectionRequest>, HubError> {
        let url = self.url("election-requests");
        self.data("GET /api/v1/election-requests", self.http.get(url).query(filter))
            .await
    }

    /// Upsert a ledger summary. The Hub answers `{data, action}` without the
    /// usual envelope.
    pub async fn sync_ledger(&self, ledger: &SyncLedgerInput) -> Result<SyncLedgerResult, HubError> {
        let endpoint = "POST /api/v1/sync/ledger";
        let resp = self
            .send(
                endpoint,
                self.http.post(self.url("sync/ledger")).json(&json!({ "ledger": ledger })),
            )
            .await?;
        Self::decode(endpoint, resp).await
    }

    pub async fn sync_journals(&self, journals: &[SyncJournalInput]) -> Result<SyncResult, HubError> {
        let url = self.url("sync/journals");
        self.data(
            "POST /api/v1/sync/journals",
            self.http.post(url).json(&json!({ "journals": journals })),
        )
        .await
    }

    pub async fn record_change_log(&self, entry: &ChangeLogInput) -> Result<(), HubError> {
        self.send(
            "POST /api/v1/sync/change-log",
            self.http.post(self.url("sync/change-log")).json(entry),
        )
        .await?;
        Ok(())
    }

    pub async fn sync_status(&self) -> Result<SyncStatus, HubError> {
        let endpoint = "GET /api/v1/sync/status";
        let resp = self.send(endpoint, self.http.get(self.url("sync/status"))).await?;
        Self::decode(endpoint, resp).await
    }

    /// Forward a multipart upload verbatim and hand back whatever the Hub
    /// answered, error statuses included.
    pub async fn relay_upload(&self, content_type: &str, body: Bytes) -> Result<UploadRelay, HubError> {
        let endpoint = "POST /api/v1/uploads/image";
        let resp = self
            .http
            .post(self.url("uploads/image"))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| HubError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(|e| HubError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })?;
        Ok(UploadRelay { status, content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_at_api_v1() {
        let client = HubClient::new("http://hub.local:3722/".parse().unwrap(), "k", 5).unwrap();
        assert_eq!(
            client.url("sync/ledger"),
            "http://hub.local:3722/api/v1/sync/ledger"
        );
    }

    #[test]
    fn rejects_unprintable_api_key() {
        let result = HubClient::new("http://hub.local".parse().unwrap(), "bad\nkey", 5);
        assert!(matches!(result, Err(HubError::Config(_))));
    }
}
