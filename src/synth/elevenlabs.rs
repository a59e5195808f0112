// src/synth/elevenlabs.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{Synthesizer, VoiceParams};
use crate::config::VoiceConfig;
use crate::error::SynthesisError;

/// ElevenLabs text-to-speech, buffered into memory.
pub struct ElevenLabsSynthesizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ElevenLabsSynthesizer {
    pub fn from_config(cfg: &VoiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(120))
            .build()
            .context("building elevenlabs http client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
        if self.api_key.trim().is_empty() {
            return Err(SynthesisError::NotConfigured(
                "ELEVEN_API_KEY is not set".to_string(),
            ));
        }

        #[derive(Serialize)]
        struct Req<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("{}/{}", self.endpoint, voice.voice_id);
        let resp = self
            .http
            .post(url)
            .query(&[("output_format", voice.output_format.as_str())])
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&Req {
                text,
                model_id: &voice.model_id,
            })
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(SynthesisError::Request(format!("HTTP {status}: {snippet}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SynthesisError::Request(format!("reading audio stream: {e}")))?;
        if bytes.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let mut cfg = VoiceConfig::default();
        cfg.api_key.clear();
        let synth = ElevenLabsSynthesizer::from_config(&cfg).unwrap();
        let err = synth
            .synthesize("hello", &VoiceParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::NotConfigured(_)));
    }
}
