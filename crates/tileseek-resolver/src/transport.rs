//! HTTP transport seam.
//!
//! A [`Transport`] produces sessions; a session is a [`Fetcher`] that owns one
//! HTTP client and its connection pool. The engine opens one session for the
//! index query, one for the catalog crawl, and one per descriptor batch, and
//! drops each as soon as its stage completes.

use crate::config::ResolverConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

/// Retrieves remote documents as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the decoded body of a 2xx response.
    async fn get_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// Source of HTTP sessions.
pub trait Transport: Send + Sync {
    /// The session type.
    type Session: Fetcher;

    /// Open a new session with its own connection pool.
    fn open_session(&self) -> Result<Self::Session, FetchError>;
}

/// Fetch `url`, failing with [`FetchError::Timeout`] if it takes longer than `timeout`.
pub async fn fetch_with_timeout<F: Fetcher + ?Sized>(
    fetcher: &F,
    url: &Url,
    timeout: Duration,
) -> Result<String, FetchError> {
    match tokio::time::timeout(timeout, fetcher.get_text(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            after: timeout,
        }),
    }
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
    user_agent: String,
}

impl ReqwestTransport {
    /// Create a transport with a per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
        }
    }

    /// Create a transport from the resolver configuration.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.fetch_timeout(), config.user_agent.clone())
    }
}

impl Transport for ReqwestTransport {
    type Session = ReqwestSession;

    fn open_session(&self) -> Result<ReqwestSession, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Session(e.to_string()))?;
        Ok(ReqwestSession {
            client,
            timeout: self.timeout,
        })
    }
}

/// One `reqwest` client and its connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestSession {
    fn classify(&self, url: &Url, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Fetcher for ReqwestSession {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| self.classify(url, e))
    }
}
