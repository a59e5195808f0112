// src/synth/mod.rs
//! Audio synthesis boundary. The pipeline treats a synthesizer as atomic:
//! it either returns every byte of the artifact or an error.

pub mod elevenlabs;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::config::VoiceConfig;
use crate::error::SynthesisError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::from_config(&VoiceConfig::default())
    }
}

impl VoiceParams {
    pub fn from_config(cfg: &VoiceConfig) -> Self {
        Self {
            voice_id: cfg.voice_id.clone(),
            model_id: cfg.model_id.clone(),
            output_format: cfg.output_format.clone(),
        }
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError>;
    fn name(&self) -> &'static str;
}

static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("static regex"));
static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:#{1,6}[ \t]+|[-*+][ \t]+|>[ \t]*)").expect("static regex")
});
static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__|~~([^~\n]+)~~|\*([^*\n]+)\*|`([^`\n]*)`")
        .expect("static regex")
});
// Single underscores only count as emphasis outside a word.
static RE_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|[^\w])_([^_\n]+)_([^\w]|$)").expect("static regex"));
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("static regex"));
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Strip markup a TTS engine would read literally, then collapse whitespace.
/// Link text and emphasised words are kept; only the delimiters go.
pub fn speech_text(script: &str) -> String {
    let out = RE_LINK.replace_all(script, "${1}");
    let out = RE_BLOCK.replace_all(&out, "");
    let out = RE_EMPHASIS.replace_all(&out, |c: &Captures| {
        c.iter().skip(1).flatten().map(|m| m.as_str()).collect::<String>()
    });
    let out = RE_UNDERSCORE.replace_all(&out, "${1}${2}${3}");
    let out = RE_SPACES.replace_all(&out, " ");
    let out = RE_BLANK_LINES.replace_all(&out, "\n\n");
    out.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Deterministic stand-in: a fake MP3 frame header followed by the text bytes.
#[derive(Debug, Clone, Default)]
pub struct MockSynthesizer;

pub const MOCK_AUDIO_HEADER: &[u8] = b"ID3\x04\x00\x00";

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
        let mut out = MOCK_AUDIO_HEADER.to_vec();
        out.extend_from_slice(text.as_bytes());
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
