// src/sources/reddit.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{DiscussionPost, DiscussionSearch};
use crate::config::DiscussionConfig;
use crate::error::{is_transient_status, SourceError};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const SEARCH_URL: &str = "https://oauth.reddit.com/r/all/search";

/// Reddit `r/all` search using the application-only OAuth flow.
pub struct RedditSearch {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Submission,
}

#[derive(Debug, Deserialize)]
struct Submission {
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    created_utc: f64,
    #[serde(default)]
    url: String,
}

impl RedditSearch {
    pub fn from_config(cfg: &DiscussionConfig) -> Result<Self> {
        let agent = if cfg.user_agent.trim().is_empty() {
            "topic-newscast/0.1".to_string()
        } else {
            cfg.user_agent.clone()
        };
        let http = reqwest::Client::builder()
            .user_agent(agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            http,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(SourceError::Permanent(
                "REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET are not set".to_string(),
            ));
        }

        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref() {
            if tok.expires_at > Instant::now() {
                return Ok(tok.value.clone());
            }
        }

        let resp = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let msg = format!("reddit token HTTP {status}");
            return Err(if is_transient_status(status) {
                SourceError::Transient(msg)
            } else {
                SourceError::Permanent(msg)
            });
        }
        let tok: TokenResp = resp.json().await?;
        // Refresh a minute early.
        let ttl = Duration::from_secs(tok.expires_in.saturating_sub(60).max(1));
        *guard = Some(CachedToken {
            value: tok.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(tok.access_token)
    }

    fn parse_listing(body: &str) -> Result<Vec<DiscussionPost>, SourceError> {
        let listing: Listing = serde_json::from_str(body)
            .map_err(|e| SourceError::Permanent(format!("parsing reddit listing: {e}")))?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|c| {
                let s = c.data;
                DiscussionPost {
                    title: s.title,
                    body: s.selftext,
                    score: s.score,
                    created_at: unix_to_utc(s.created_utc),
                    url: s.url,
                }
            })
            .collect())
    }
}

fn unix_to_utc(ts: f64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts.max(0.0) as i64, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[async_trait]
impl DiscussionSearch for RedditSearch {
    async fn search(
        &self,
        query: &str,
        sort: &str,
        time_window: &str,
        limit: usize,
    ) -> Result<Vec<DiscussionPost>, SourceError> {
        let token = self.access_token().await?;
        let limit = limit.to_string();
        let resp = self
            .http
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("sort", sort),
                ("t", time_window),
                ("limit", limit.as_str()),
                ("raw_json", "1"),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                // Token revoked early; drop it so the next attempt re-authenticates.
                *self.token.lock().await = None;
                return Err(SourceError::Transient("reddit token rejected".to_string()));
            }
            let msg = format!("reddit search HTTP {status}");
            return Err(if is_transient_status(status) {
                SourceError::Transient(msg)
            } else {
                SourceError::Permanent(msg)
            });
        }
        let body = resp.text().await?;
        Self::parse_listing(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_maps_fields() {
        let body = r#"{"data":{"children":[
            {"data":{"title":"T1","selftext":"body","score":42,"created_utc":1700000000.0,"url":"https://r/1"}},
            {"data":{"title":"T2","created_utc":1700000100.5}}
        ]}}"#;
        let posts = RedditSearch::parse_listing(body).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].score, 42);
        assert_eq!(posts[0].created_at.timestamp(), 1_700_000_000);
        assert_eq!(posts[1].body, "");
    }

    #[tokio::test]
    async fn missing_credentials_are_permanent() {
        let mut cfg = DiscussionConfig::default();
        cfg.client_id.clear();
        cfg.client_secret.clear();
        let search = RedditSearch::from_config(&cfg).unwrap();
        let err = search.search("x", "top", "month", 5).await.unwrap_err();
        assert!(matches!(err, SourceError::Permanent(_)));
    }
}
