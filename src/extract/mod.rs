//! Webpage text extraction.
//!
//! [`ArticleExtractor`] turns a URL into readable text plus a title.
//! [`ExtractorApiClient`] talks to the hosted extractor API
//! (`GET /api/v1/extractor/?apikey=…&url=…`), which answers with
//! `{"title": …, "text": …}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ExtractorConfig;

// ---------------------------------------------------------------------------
// ExtractError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExtractError {
    /// No API key configured for the hosted extractor.
    #[error("extractor API key is not set (config `extractor.api_key` or EXTRACTOR_API_KEY)")]
    MissingApiKey,

    #[error("extractor request failed: {0}")]
    Request(String),

    #[error("extractor returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse extractor response: {0}")]
    Parse(String),

    /// The page yielded no readable text.
    #[error("no text could be extracted from {0}")]
    EmptyText(String),
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        ExtractError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// Readable content of a webpage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl Article {
    /// The first `max_chars` characters of the text, for log previews.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }
}

// ---------------------------------------------------------------------------
// ArticleExtractor trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Article, ExtractError>;
}

// ---------------------------------------------------------------------------
// ExtractorApiClient
// ---------------------------------------------------------------------------

/// Client for the hosted extractor API.
pub struct ExtractorApiClient {
    client: reqwest::Client,
    config: ExtractorConfig,
}

impl ExtractorApiClient {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/v1/extractor/",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ArticleExtractor for ExtractorApiClient {
    async fn extract(&self, url: &str) -> Result<Article, ExtractError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ExtractError::MissingApiKey)?;

        log::info!("extract: requesting contents of {url}");
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("apikey", key), ("url", url)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let article = parse_article(&body)?;
        if article.text.trim().is_empty() {
            return Err(ExtractError::EmptyText(url.to_string()));
        }

        log::debug!("extract: '{}' preview: {}", article.title, article.preview(100));
        Ok(article)
    }
}

fn parse_article(body: &str) -> Result<Article, ExtractError> {
    serde_json::from_str(body).map_err(|e| ExtractError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
