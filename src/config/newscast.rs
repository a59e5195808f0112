// src/config/newscast.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "NEWSCAST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/newscast.toml";

/// Marker meaning "read this secret from its environment variable".
const FROM_ENV: &str = "ENV";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewscastConfig {
    pub limits: LimitsConfig,
    pub retry: RetryConfig,
    pub news: NewsConfig,
    pub discussion: DiscussionConfig,
    pub llm: LlmConfig,
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Token-bucket refill per second for the news source.
    pub news_per_second: u32,
    pub discussion_per_second: u32,
    /// Upper bound on concurrently running fetch units per request.
    pub max_concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            news_per_second: 5,
            discussion_per_second: 5,
            max_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub multiplier_ms: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier_ms: 1_000,
            min_delay_ms: 2_000,
            max_delay_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub max_headlines: usize,
    /// "ENV" means: read from SERPAPI_API_KEY
    pub serpapi_key: String,
    pub endpoint: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            max_headlines: 5,
            serpapi_key: FROM_ENV.to_string(),
            endpoint: "https://serpapi.com/search".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionConfig {
    pub max_threads: usize,
    pub recency_days: i64,
    pub body_chars: usize,
    /// Passed to the search as its own (looser) time window.
    pub time_window_hint: String,
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            max_threads: 5,
            recency_days: 14,
            body_chars: 500,
            time_window_hint: "month".to_string(),
            client_id: FROM_ENV.to_string(),
            client_secret: FROM_ENV.to_string(),
            user_agent: FROM_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "anthropic" | "openai" | "gemini" | "ollama" (case-insensitive)
    pub primary: String,
    /// Same names as `primary`; empty string disables the fallback.
    pub fallback: String,
    pub anthropic_key: String,
    pub anthropic_model: String,
    pub openai_key: String,
    pub openai_model: String,
    pub gemini_key: String,
    pub gemini_model: String,
    pub ollama_host: String,
    pub ollama_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: "anthropic".to_string(),
            fallback: "ollama".to_string(),
            anthropic_key: FROM_ENV.to_string(),
            anthropic_model: "claude-3-5-sonnet-20240620".to_string(),
            openai_key: FROM_ENV.to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            gemini_key: FROM_ENV.to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            ollama_model: "llama3".to_string(),
            temperature: 0.4,
            max_tokens: 1_000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    pub endpoint: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key: FROM_ENV.to_string(),
            voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "mp3_44100_128".to_string(),
            endpoint: "https://api.elevenlabs.io/v1/text-to-speech".to_string(),
        }
    }
}

impl NewscastConfig {
    /// Load from an explicit TOML file, then resolve secrets and sanitize.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading newscast config from {}", path.display()))?;
        let cfg: NewscastConfig = toml::from_str(&data)
            .with_context(|| format!("parsing newscast config {}", path.display()))?;
        Ok(cfg.finalize())
    }

    /// Load using env var + fallbacks:
    /// 1) $NEWSCAST_CONFIG_PATH
    /// 2) config/newscast.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(&default_path);
        }
        Ok(Self::default().finalize())
    }

    fn finalize(mut self) -> Self {
        self.resolve_secrets();
        self.sanitize();
        self
    }

    fn resolve_secrets(&mut self) {
        resolve(&mut self.news.serpapi_key, "SERPAPI_API_KEY");
        resolve(&mut self.discussion.client_id, "REDDIT_CLIENT_ID");
        resolve(&mut self.discussion.client_secret, "REDDIT_CLIENT_SECRET");
        resolve(&mut self.discussion.user_agent, "REDDIT_USER_AGENT");
        resolve(&mut self.llm.anthropic_key, "ANTHROPIC_API_KEY");
        resolve(&mut self.llm.openai_key, "OPENAI_API_KEY");
        resolve(&mut self.llm.gemini_key, "GEMINI_API_KEY");
        resolve(&mut self.voice.api_key, "ELEVEN_API_KEY");
        if let Ok(host) = env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                self.llm.ollama_host = host;
            }
        }
    }

    fn sanitize(&mut self) {
        self.limits.news_per_second = self.limits.news_per_second.max(1);
        self.limits.discussion_per_second = self.limits.discussion_per_second.max(1);
        self.limits.max_concurrency = self.limits.max_concurrency.max(1);
        self.retry.max_attempts = self.retry.max_attempts.max(1);
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            // swap to keep a valid interval
            std::mem::swap(&mut self.retry.min_delay_ms, &mut self.retry.max_delay_ms);
        }
        self.news.max_headlines = self.news.max_headlines.max(1);
        self.discussion.max_threads = self.discussion.max_threads.max(1);
        self.discussion.recency_days = self.discussion.recency_days.max(1);
        self.llm.primary = self.llm.primary.trim().to_lowercase();
        self.llm.fallback = self.llm.fallback.trim().to_lowercase();
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            self.llm.temperature = LlmConfig::default().temperature;
        }
    }

    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.discussion.recency_days)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.max(1))
    }
}

/// Missing env vars leave an empty key; the collaborator then fails at call time.
fn resolve(slot: &mut String, var: &str) {
    if slot.trim().eq_ignore_ascii_case(FROM_ENV) {
        *slot = env::var(var).unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let cfg = NewscastConfig::default();
        assert_eq!(cfg.limits.news_per_second, 5);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.news.max_headlines, 5);
        assert_eq!(cfg.discussion.max_threads, 5);
        assert_eq!(cfg.discussion.recency_days, 14);
        assert_eq!(cfg.discussion.body_chars, 500);
        assert_eq!(cfg.voice.output_format, "mp3_44100_128");
    }

    #[test]
    fn partial_toml_keeps_defaults_and_sanitizes() {
        let raw = r#"
            [limits]
            news_per_second = 0
            max_concurrency = 0

            [retry]
            min_delay_ms = 500
            max_delay_ms = 100

            [llm]
            primary = " OpenAI "
        "#;
        let cfg: NewscastConfig = toml::from_str(raw).unwrap();
        let cfg = cfg.finalize();
        assert_eq!(cfg.limits.news_per_second, 1);
        assert_eq!(cfg.limits.discussion_per_second, 5);
        assert_eq!(cfg.limits.max_concurrency, 1);
        assert_eq!((cfg.retry.min_delay_ms, cfg.retry.max_delay_ms), (100, 500));
        assert_eq!(cfg.llm.primary, "openai");
        assert_eq!(cfg.llm.fallback, "ollama");
    }
}
