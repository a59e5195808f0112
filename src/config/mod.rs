// src/config/mod.rs
pub mod newscast;

pub use newscast::{
    DiscussionConfig, LimitsConfig, LlmConfig, NewsConfig, NewscastConfig, RetryConfig,
    VoiceConfig,
};
