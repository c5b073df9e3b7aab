// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Upstream client for the benefits API.
//!
//! Every operation issues exactly one GET against the configured base URL and
//! hands back the raw JSON document. Failures are reported as
//! [`UpstreamError`] and never retried here.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

use crate::config::UpstreamConfig;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request to {url} timed out")]
    Timeout { url: String },

    #[error("failed to reach upstream at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream {url} answered with status {status}")]
    Http {
        url: String,
        status: u16,
        message: Option<String>,
    },

    #[error("failed to decode upstream response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    fn transport(url: &Url, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            UpstreamError::Timeout {
                url: url.to_string(),
            }
        } else {
            UpstreamError::Connection {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Read access to the benefits catalogue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BenefitsSource: Send + Sync {
    /// List benefits; `None` asks for the upstream's default page.
    async fn fetch_list(&self, page: Option<u64>) -> Result<Value, UpstreamError>;

    async fn fetch_by_id(&self, id: &str) -> Result<Value, UpstreamError>;

    async fn fetch_by_commerce(&self, name: &str) -> Result<Value, UpstreamError>;
}

/// HTTP client wrapper for talking to the benefits API.
#[derive(Clone)]
pub struct UpstreamClient {
    base_url: Url,
    client: Client,
}

impl UpstreamClient {
    pub fn try_new(config: UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build upstream client: {}", e))?;

        Ok(Self {
            base_url: config.base_url,
            client,
        })
    }

    fn list_url(&self, page: Option<u64>) -> Url {
        let mut url = self.base_url.clone();
        if let Some(page) = page {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        url
    }

    fn item_url(&self, id: &str) -> Url {
        let mut url = self.base_url.clone();
        // http(s) base URLs always accept path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }

    fn commerce_url(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("archivado", "false")
            .append_pair("comercio", name);
        url
    }

    async fn get_json(&self, url: Url) -> Result<Value, UpstreamError> {
        tracing::debug!(%url, "requesting upstream");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| UpstreamError::transport(&url, e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response.json::<Value>().await.map_err(|source| {
            if source.is_timeout() {
                UpstreamError::Timeout {
                    url: url.to_string(),
                }
            } else {
                UpstreamError::Decode {
                    url: url.to_string(),
                    source,
                }
            }
        })
    }
}

#[async_trait]
impl BenefitsSource for UpstreamClient {
    async fn fetch_list(&self, page: Option<u64>) -> Result<Value, UpstreamError> {
        self.get_json(self.list_url(page)).await
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Value, UpstreamError> {
        self.get_json(self.item_url(id)).await
    }

    async fn fetch_by_commerce(&self, name: &str) -> Result<Value, UpstreamError> {
        self.get_json(self.commerce_url(name)).await
    }
}

/// Pulls a human readable message out of an upstream error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => json
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(trimmed.to_string())),
        Err(_) => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: &str) -> UpstreamClient {
        UpstreamClient::try_new(UpstreamConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn builds_request_urls() {
        let client = client("https://api.example.com/api/beneficios");

        assert_eq!(
            client.list_url(None).as_str(),
            "https://api.example.com/api/beneficios"
        );
        assert_eq!(
            client.list_url(Some(2)).as_str(),
            "https://api.example.com/api/beneficios?page=2"
        );
        assert_eq!(
            client.item_url("42").as_str(),
            "https://api.example.com/api/beneficios/42"
        );
        assert_eq!(
            client.commerce_url("Mc Donald's").as_str(),
            "https://api.example.com/api/beneficios?archivado=false&comercio=Mc+Donald%27s"
        );
    }

    #[test]
    fn item_url_tolerates_trailing_slash() {
        let client = client("https://api.example.com/api/beneficios/");
        assert_eq!(
            client.item_url("7").as_str(),
            "https://api.example.com/api/beneficios/7"
        );
    }

    #[test]
    fn extracts_error_messages() {
        assert_eq!(error_message(""), None);
        assert_eq!(
            error_message(r#"{"message":"token expired"}"#).as_deref(),
            Some("token expired")
        );
        assert_eq!(
            error_message("Bad Gateway").as_deref(),
            Some("Bad Gateway")
        );
    }
}
