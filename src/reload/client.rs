//! HTTP client for the inference backend's reload and status endpoints.

use crate::config::ReloadConfig;
use crate::error::{Result, ShellError};
use crate::reload::{ReloadBackend, ReloadPayload};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    is_reloading: bool,
}

/// [`ReloadBackend`] speaking the backend's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpReloadBackend {
    base_url: String,
    status_path: String,
    reload_path: String,
    client: reqwest::Client,
}

impl HttpReloadBackend {
    pub fn new(base_url: impl Into<String>, config: &ReloadConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            status_path: config.status_path.clone(),
            reload_path: config.reload_path.clone(),
            client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ReloadBackend for HttpReloadBackend {
    async fn request_reload(&self, payload: &ReloadPayload) -> Result<()> {
        let url = self.url(&self.reload_path);
        debug!(%url, model_path = %payload.model_path, "requesting model reload");
        let resp = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(&e, "reload request"))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            Err(ShellError::Network(format!(
                "reload request rejected with HTTP {}: {detail}",
                status.as_u16()
            )))
        }
    }

    async fn is_reloading(&self) -> Result<bool> {
        let url = self.url(&self.status_path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify(&e, "status query"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ShellError::Network(format!(
                "status query returned HTTP {}",
                status.as_u16()
            )));
        }
        let body: StatusResponse = resp
            .json()
            .await
            .map_err(|e| ShellError::Network(format!("malformed status response: {e}")))?;
        Ok(body.is_reloading)
    }
}

fn classify(err: &reqwest::Error, what: &str) -> ShellError {
    if err.is_timeout() {
        ShellError::Network(format!("{what} timed out"))
    } else if err.is_connect() {
        ShellError::Network(format!("{what} failed: backend unreachable"))
    } else {
        ShellError::Network(format!("{what} failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let backend = HttpReloadBackend::new("http://127.0.0.1:5001/", &ReloadConfig::default());
        assert_eq!(backend.base_url(), "http://127.0.0.1:5001");
        assert_eq!(backend.url("/api/status"), "http://127.0.0.1:5001/api/status");
        assert_eq!(backend.url("api/reload"), "http://127.0.0.1:5001/api/reload");
    }

    #[test]
    fn status_response_defaults_to_not_reloading() {
        let parsed: StatusResponse = serde_json::from_str("{}").unwrap_or(StatusResponse {
            is_reloading: true,
        });
        assert!(!parsed.is_reloading);
    }
}
