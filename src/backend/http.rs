// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! REST adapter for the Backend Key Service
//!
//! | Operation      | Request                                         |
//! |----------------|-------------------------------------------------|
//! | fetch_config   | `GET {endpoint}/config` (Bearer registration)   |
//! | authenticate   | `POST {endpoint}/login`                         |
//! | CREATE         | `POST {endpoint}/api/keys`                      |
//! | READ           | `GET {endpoint}/api/keys/{name}/material`       |
//! | UPDATE         | `PUT {endpoint}/api/keys/{name}`                |
//! | DELETE         | `DELETE {endpoint}/api/keys/{name}`             |
//!
//! Key material travels hex-encoded. Key names are percent-encoded path segments.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use zeroize::Zeroizing;

use super::{KeyOpResponse, KeyOpType, KeyService};
use crate::error::BackendError;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct CreateKeyRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_material: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdateKeyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    key_material: Option<&'a str>,
}

#[derive(Deserialize)]
struct KeyMaterialResponse {
    key_material: String,
}

/// Backend Key Service over HTTPS
#[derive(Debug, Clone)]
pub struct HttpKeyService {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpKeyService {
    /// Create a client for `endpoint` (e.g. `https://api.example-crypto.com/v1`)
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| BackendError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(BackendError::InvalidEndpoint(endpoint.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::InvalidEndpoint(format!("HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            other => BackendError::Rejected {
                status: other.as_u16(),
                message,
            },
        })
    }

    fn authorized(&self, method: Method, url: Url, token: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url).bearer_auth(token)
    }
}

#[async_trait]
impl KeyService for HttpKeyService {
    async fn fetch_config(&self, registration_token: &str) -> Result<String, BackendError> {
        let url = self.url(&["config"])?;
        debug!(url = %url, "Fetching service config");

        let response = self
            .send(self.authorized(Method::GET, url, registration_token))
            .await?;

        response
            .text()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn authenticate(&self, identity: &str, secret: &str) -> Result<String, BackendError> {
        let url = self.url(&["login"])?;
        debug!(url = %url, identity, "Authenticating");

        let body = LoginRequest {
            username: identity,
            password: secret,
        };
        let response = self.send(self.client.post(url).json(&body)).await?;

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(login.token)
    }

    async fn key_op(
        &self,
        session_token: &str,
        op: KeyOpType,
        key_name: &str,
        key_material: Option<&[u8]>,
    ) -> Result<KeyOpResponse, BackendError> {
        let material_hex = key_material.map(|bytes| Zeroizing::new(hex::encode(bytes)));
        let material_hex = material_hex.as_ref().map(|hex| hex.as_str());

        match op {
            KeyOpType::Create => {
                let url = self.url(&["api", "keys"])?;
                let body = CreateKeyRequest {
                    name: key_name,
                    key_material: material_hex,
                };
                self.send(self.authorized(Method::POST, url, session_token).json(&body))
                    .await?;
                Ok(KeyOpResponse::Ack)
            }
            KeyOpType::Read => {
                let url = self.url(&["api", "keys", key_name, "material"])?;
                let response = self
                    .send(self.authorized(Method::GET, url, session_token))
                    .await?;
                let body: KeyMaterialResponse = response
                    .json()
                    .await
                    .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
                Ok(KeyOpResponse::Material(body.key_material))
            }
            KeyOpType::Update => {
                let url = self.url(&["api", "keys", key_name])?;
                let body = UpdateKeyRequest {
                    key_material: material_hex,
                };
                self.send(self.authorized(Method::PUT, url, session_token).json(&body))
                    .await?;
                Ok(KeyOpResponse::Ack)
            }
            KeyOpType::Delete => {
                let url = self.url(&["api", "keys", key_name])?;
                self.send(self.authorized(Method::DELETE, url, session_token))
                    .await?;
                Ok(KeyOpResponse::Ack)
            }
        }
    }
}
