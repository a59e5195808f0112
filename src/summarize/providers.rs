// src/summarize/providers.rs
//! Remote completion backends. Each one is a thin `reqwest` wrapper with its own
//! request/response shapes; status codes are classified into transient vs permanent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{CompletionClient, DynSummarizer, LlmSummarizer};
use crate::config::LlmConfig;
use crate::error::{is_transient_status, ProviderError};

const USER_AGENT: &str = "topic-newscast/0.1";

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()
        .context("building LLM http client")
}

/// Send, classify the status, decode JSON.
async fn send_json<T: for<'de> Deserialize<'de>>(
    provider: &'static str,
    req: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let resp = req
        .send()
        .await
        .map_err(|e| ProviderError::from_http(provider, e))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = format!("HTTP {status}: {}", truncate(&body, 200));
        return Err(if is_transient_status(status) {
            ProviderError::Transient { provider, message }
        } else {
            ProviderError::Permanent { provider, message }
        });
    }
    resp.json::<T>().await.map_err(|e| ProviderError::Permanent {
        provider,
        message: format!("decoding response: {e}"),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn require_key(provider: &'static str, key: &str) -> Result<(), ProviderError> {
    if key.trim().is_empty() {
        return Err(ProviderError::NotConfigured {
            provider,
            reason: "missing API key".to_string(),
        });
    }
    Ok(())
}

// ------------------------------------------------------------
// Anthropic (Messages API)
// ------------------------------------------------------------

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(cfg: &LlmConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: cfg.anthropic_key.clone(),
            model: cfg.anthropic_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        require_key(self.name(), &self.api_key)?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            system: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            model: &self.model,
            system,
            messages: vec![Msg {
                role: "user",
                content: user,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let body: Resp = send_json(
            self.name(),
            self.http
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&req),
        )
        .await?;
        Ok(body
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

// ------------------------------------------------------------
// OpenAI (Chat Completions)
// ------------------------------------------------------------

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(cfg: &LlmConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: cfg.openai_key.clone(),
            model: cfg.openai_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        require_key(self.name(), &self.api_key)?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let body: Resp = send_json(
            self.name(),
            self.http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req),
        )
        .await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Google Gemini (generateContent)
// ------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GeminiClient {
    pub fn new(cfg: &LlmConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: cfg.gemini_key.clone(),
            model: cfg.gemini_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        require_key(self.name(), &self.api_key)?;

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenCfg {
            temperature: f32,
            max_output_tokens: u32,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            system_instruction: Content<'a>,
            contents: Vec<Content<'a>>,
            generation_config: GenCfg,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            system_instruction: Content {
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                parts: vec![Part { text: user }],
            }],
            generation_config: GenCfg {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body: Resp = send_json(
            self.name(),
            self.http
                .post(url)
                .query(&[("key", self.api_key.as_str())])
                .json(&req),
        )
        .await?;
        Ok(body
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Ollama (local /api/generate)
// ------------------------------------------------------------

pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaClient {
    pub fn new(cfg: &LlmConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            host: cfg.ollama_host.trim_end_matches('/').to_string(),
            model: cfg.ollama_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        #[derive(Serialize)]
        struct Opts {
            temperature: f32,
            num_predict: u32,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            system: &'a str,
            prompt: &'a str,
            stream: bool,
            options: Opts,
        }
        #[derive(Deserialize)]
        struct Resp {
            response: String,
        }

        let req = Req {
            model: &self.model,
            system,
            prompt: user,
            stream: false,
            options: Opts {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };
        let body: Resp = send_json(
            self.name(),
            self.http
                .post(format!("{}/api/generate", self.host))
                .json(&req),
        )
        .await?;
        Ok(body.response)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

/// Factory: build a summarizer for a backend name from config.
pub fn build_summarizer(name: &str, cfg: &LlmConfig, timeout: Duration) -> Result<DynSummarizer> {
    let s: DynSummarizer = match name {
        "anthropic" | "claude" => Arc::new(LlmSummarizer::new(AnthropicClient::new(cfg, timeout)?)),
        "openai" => Arc::new(LlmSummarizer::new(OpenAiClient::new(cfg, timeout)?)),
        "gemini" => Arc::new(LlmSummarizer::new(GeminiClient::new(cfg, timeout)?)),
        "ollama" => Arc::new(LlmSummarizer::new(OllamaClient::new(cfg, timeout)?)),
        other => bail!("Unsupported LLM provider in config: {other}"),
    };
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let cfg = LlmConfig::default();
        assert!(build_summarizer("bard", &cfg, Duration::from_secs(1)).is_err());
        assert!(build_summarizer("ollama", &cfg, Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn missing_key_is_permanent_not_configured() {
        let mut cfg = LlmConfig::default();
        cfg.openai_key.clear();
        let client = OpenAiClient::new(&cfg, Duration::from_secs(1)).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }
}
