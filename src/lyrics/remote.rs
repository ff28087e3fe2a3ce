//! Remote lyrics source
//!
//! The default endpoint is a GET-style API taking `name` and `artist` query
//! parameters and answering with raw LRC text (200), a distinguishable
//! not-found (404), or anything else, which is treated as unexpected.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::LyricsError;

/// Where raw LRC text comes from.
///
/// `Ok(Some(body))` is a hit, `Ok(None)` an authoritative "no such track"
/// (cacheable), and `Err` a transient failure that must not be cached.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    async fn fetch(&self, title: &str, artist: &str) -> Result<Option<String>, LyricsError>;
}

/// HTTP client for the lyrics API.
#[derive(Debug, Clone)]
pub struct HttpLyricsSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLyricsSource {
    const USER_AGENT: &'static str = "subtext/0.1.0 (https://github.com/subtext)";

    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(timeout)
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl LyricsSource for HttpLyricsSource {
    async fn fetch(&self, title: &str, artist: &str) -> Result<Option<String>, LyricsError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", title), ("artist", artist)])
            .send()
            .await
            .map_err(|e| LyricsError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LyricsError::Parse(e.to_string()))?;
            Ok(Some(body))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(LyricsError::Transport(format!(
                "unexpected status code: {status}"
            )))
        }
    }
}
