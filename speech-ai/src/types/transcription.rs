//! Types for transcription operations.

use serde::{Deserialize, Serialize};

/// Processing status of a speech-to-text transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    Processing,
    Completed,
    #[serde(alias = "error")]
    Failed,
}

/// Individual word with timing and speaker attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub confidence: f64,
    pub speaker: Option<String>,
}

impl Word {
    /// Convenience constructor for a word without confidence or end time.
    pub fn new(text: impl Into<String>, start_ms: i64, speaker: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms: start_ms,
            confidence: 1.0,
            speaker: Some(speaker.into()),
        }
    }
}

/// A transcription job as reported by the provider.
///
/// `words` is empty until the job completed; `error_message` is set when it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub id: String,
    pub status: Status,
    pub text: Option<String>,
    pub words: Vec<Word>,
    pub duration_seconds: Option<i64>,
    pub language_code: Option<String>,
    pub error_message: Option<String>,
}

impl Transcription {
    /// A freshly accepted job with no results yet.
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Status::Queued,
            text: None,
            words: Vec::new(),
            duration_seconds: None,
            language_code: None,
            error_message: None,
        }
    }
}

/// Configuration for creating a transcription job.
///
/// `webhook_auth_header` is a `(name, value)` pair the provider echoes back on
/// every webhook call.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub media_url: String,
    pub webhook_url: Option<String>,
    pub webhook_auth_header: Option<(String, String)>,
    pub enable_speaker_labels: bool,
    pub language_code: Option<String>,
}

impl Config {
    pub fn new(media_url: impl Into<String>) -> Self {
        Self {
            media_url: media_url.into(),
            webhook_url: None,
            webhook_auth_header: None,
            enable_speaker_labels: true,
            language_code: None,
        }
    }
}
