// src/error.rs
//! Error taxonomy. Only `PipelineError` ever reaches the caller; everything a
//! single fetch unit can hit is folded into `FetchOutcome::Failure` via `FetchError`.

use serde::Serialize;
use thiserror::Error;

/// Lets the retry policy decide whether another attempt makes sense.
pub trait Transience {
    fn is_transient(&self) -> bool;
}

/// Caller-visible error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    CompositionFailure,
    SynthesisFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("broadcast composition failed: {0}")]
    CompositionFailure(String),

    #[error("audio synthesis failed: {0}")]
    SynthesisFailure(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidInput(_) => ErrorKind::InvalidInput,
            PipelineError::CompositionFailure(_) => ErrorKind::CompositionFailure,
            PipelineError::SynthesisFailure(_) => ErrorKind::SynthesisFailure,
        }
    }

    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// Everything that can go wrong inside one (topic, source) unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{origin} source unavailable after {attempts} attempt(s): {message}")]
    SourceTransient {
        origin: &'static str,
        attempts: u32,
        message: String,
    },

    #[error("{origin} source rejected the request: {message}")]
    SourcePermanent {
        origin: &'static str,
        message: String,
    },

    #[error("summarization failed (primary: {primary}; fallback: {fallback})")]
    Summarization { primary: String, fallback: String },
}

/// Failure reported by a search collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("transient: {0}")]
    Transient(String),

    #[error("{0}")]
    Permanent(String),
}

impl Transience for SourceError {
    fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if is_transient_http(&e) {
            SourceError::Transient(e.to_string())
        } else {
            SourceError::Permanent(e.to_string())
        }
    }
}

/// Failure reported by an LLM text-completion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured: {reason}")]
    NotConfigured {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} transient error: {message}")]
    Transient {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} error: {message}")]
    Permanent {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn from_http(provider: &'static str, e: reqwest::Error) -> Self {
        if is_transient_http(&e) {
            ProviderError::Transient {
                provider,
                message: e.to_string(),
            }
        } else {
            ProviderError::Permanent {
                provider,
                message: e.to_string(),
            }
        }
    }
}

impl Transience for ProviderError {
    fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }
}

/// Failure reported by the audio collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("synthesizer is not configured: {0}")]
    NotConfigured(String),

    #[error("synthesizer request failed: {0}")]
    Request(String),

    #[error("synthesizer returned an empty artifact")]
    EmptyAudio,
}

/// Timeouts, connection problems, 429 and 5xx are worth another attempt.
pub(crate) fn is_transient_http(e: &reqwest::Error) -> bool {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        return true;
    }
    match e.status() {
        Some(status) => status.as_u16() == 429 || status.is_server_error(),
        None => false,
    }
}

/// Same classification for a status we read before turning it into an error.
pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_one_to_one() {
        assert_eq!(
            PipelineError::InvalidInput("x".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            PipelineError::SynthesisFailure("x".into()).kind(),
            ErrorKind::SynthesisFailure
        );
    }

    #[test]
    fn transient_status_classification() {
        assert!(is_transient_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(reqwest::StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn fetch_error_reason_mentions_attempts() {
        let e = FetchError::SourceTransient {
            origin: "news",
            attempts: 3,
            message: "timeout".into(),
        };
        assert_eq!(
            e.to_string(),
            "news source unavailable after 3 attempt(s): timeout"
        );
    }
}
