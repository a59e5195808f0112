// src/sources/serpapi.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{NewsItem, NewsSearch};
use crate::config::NewsConfig;
use crate::error::{is_transient_status, SourceError};

/// Google News results through SerpAPI (`engine=google`, `tbm=nws`).
pub struct SerpApiNewsSearch {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    news_results: Vec<SerpNewsResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpNewsResult {
    #[serde(default)]
    title: Option<String>,
}

impl SerpApiNewsSearch {
    pub fn from_config(cfg: &NewsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building serpapi http client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.serpapi_key.clone(),
        })
    }

    /// Parse a SerpAPI body. Missing `news_results` means no hits, an `error` field means failure.
    fn parse_body(body: &str) -> Result<Vec<NewsItem>, SourceError> {
        let parsed: SerpResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::Permanent(format!("parsing serpapi json: {e}")))?;
        if let Some(err) = parsed.error {
            // SerpAPI reports "no results" through the error field as well.
            if err.to_ascii_lowercase().contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(SourceError::Permanent(err));
        }
        Ok(parsed
            .news_results
            .into_iter()
            .filter_map(|r| r.title)
            .map(|title| NewsItem { title })
            .collect())
    }
}

#[async_trait]
impl NewsSearch for SerpApiNewsSearch {
    async fn search(&self, query: &str) -> Result<Vec<NewsItem>, SourceError> {
        if self.api_key.trim().is_empty() {
            return Err(SourceError::Permanent("SERPAPI_API_KEY is not set".to_string()));
        }
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("engine", "google"),
                ("tbm", "nws"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let msg = format!("serpapi HTTP {status}");
            return Err(if is_transient_status(status) {
                SourceError::Transient(msg)
            } else {
                SourceError::Permanent(msg)
            });
        }
        let body = resp.text().await?;
        Self::parse_body(&body)
    }
}
