//! Client for the hosted identity service.
//!
//! The service speaks the GoTrue REST dialect:
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/auth/v1/user` | Resolve the user behind an access token |
//! | POST   | `/auth/v1/token?grant_type=refresh_token` | Exchange a refresh token |
//! | PUT    | `/auth/v1/user` | Update user metadata |

use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Errors from identity service calls.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("identity service {endpoint} returned {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
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

/// A user record as returned by the identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUserRecord {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUserRecord {
    pub fn registration_status(&self) -> Option<&str> {
        self.user_metadata
            .get("registration_status")
            .and_then(Value::as_str)
    }

    /// `display_name` or `full_name` from metadata, whichever is set first.
    pub fn display_name(&self) -> String {
        ["display_name", "full_name"]
            .iter()
            .filter_map(|key| self.user_metadata.get(*key).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Fresh token pair issued by a refresh exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUserRecord,
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl AuthClient {
    pub fn new(base_url: Url, anon_key: &str, timeout_secs: u64) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    "apikey",
                    reqwest::header::HeaderValue::from_str(anon_key)
                        .map_err(|_| AuthError::Config("anon key is not a valid header".into()))?,
                );
                headers
            })
            .build()
            .map_err(|e| AuthError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Resolve the user owning `access_token`.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUserRecord, AuthError> {
        let endpoint = "GET /auth/v1/user";
        let resp = self
            .http
            .get(self.url("auth/v1/user"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        decode(endpoint, resp).await
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<RefreshedSession, AuthError> {
        let endpoint = "POST /auth/v1/token";
        let resp = self
            .http
            .post(self.url("auth/v1/token"))
            .query(&[("grant_type", "refresh_token")])
            .bearer_auth(&self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        decode(endpoint, resp).await
    }

    /// Merge `data` into the caller's user metadata.
    pub async fn update_user_metadata(
        &self,
        access_token: &str,
        data: Value,
    ) -> Result<AuthUserRecord, AuthError> {
        let endpoint = "PUT /auth/v1/user";
        let resp = self
            .http
            .put(self.url("auth/v1/user"))
            .bearer_auth(access_token)
            .json(&json!({ "data": data }))
            .send()
            .await
            .map_err(|e| AuthError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        decode(endpoint, resp).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, AuthError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }

    resp.json().await.map_err(|e| AuthError::Deserialization {
        endpoint: endpoint.into(),
        source: e,
    })
}
