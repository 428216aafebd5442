//! AssemblyAI API client for transcription services.
//!
//! Submits audio URLs for speaker labelled transcription and fetches the
//! finished transcripts once AssemblyAI called the webhook back.

use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use async_trait::async_trait;
use log::*;
use serde::{Deserialize, Serialize};
use speech_ai::traits::transcription::Provider;
use speech_ai::types::transcription::Config;
use speech_ai::{Error as SpeechAiError, Status, Transcription};

/// Request to create a new transcription
#[derive(Debug, Serialize)]
pub struct CreateTranscriptRequest {
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_auth_header_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_auth_header_value: Option<String>,
    pub speaker_labels: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl From<Config> for CreateTranscriptRequest {
    fn from(config: Config) -> Self {
        let (header_name, header_value) = config.webhook_auth_header.unzip();
        CreateTranscriptRequest {
            audio_url: config.media_url,
            webhook_url: config.webhook_url,
            webhook_auth_header_name: header_name,
            webhook_auth_header_value: header_value,
            speaker_labels: config.enable_speaker_labels,
            language_code: config.language_code,
        }
    }
}

/// Transcript as returned by both the create and the get endpoint.
///
/// `id` is missing when AssemblyAI refused the request, `error` then says why.
#[derive(Debug, Deserialize)]
pub struct TranscriptResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<TranscriptStatus>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub words: Option<Vec<Word>>,
    #[serde(default)]
    pub audio_duration: Option<f64>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Transcript processing status
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl From<TranscriptStatus> for Status {
    fn from(status: TranscriptStatus) -> Self {
        match status {
            TranscriptStatus::Queued => Status::Queued,
            TranscriptStatus::Processing => Status::Processing,
            TranscriptStatus::Completed => Status::Completed,
            TranscriptStatus::Error => Status::Failed,
        }
    }
}

/// Word with timing information
#[derive(Debug, Deserialize, Clone)]
pub struct Word {
    pub text: String,
    pub start: i64,
    pub end: i64,
    pub confidence: f64,
    #[serde(default)]
    pub speaker: Option<String>,
}

impl From<Word> for speech_ai::Word {
    fn from(word: Word) -> Self {
        speech_ai::Word {
            text: word.text,
            start_ms: word.start,
            end_ms: word.end,
            confidence: word.confidence,
            speaker: word.speaker,
        }
    }
}

impl TranscriptResponse {
    fn into_transcription(self) -> Result<Transcription, SpeechAiError> {
        let Some(id) = self.id else {
            let reason = self
                .error
                .unwrap_or_else(|| "AssemblyAI returned no transcript id".to_string());
            return Err(SpeechAiError::Provider(reason));
        };

        Ok(Transcription {
            id,
            status: self.status.map(Status::from).unwrap_or(Status::Queued),
            text: self.text,
            words: self
                .words
                .unwrap_or_default()
                .into_iter()
                .map(speech_ai::Word::from)
                .collect(),
            duration_seconds: self.audio_duration.map(|seconds| seconds.round() as i64),
            language_code: self.language_code,
            error_message: self.error,
        })
    }
}

/// AssemblyAI API client
pub struct AssemblyAiClient {
    client: reqwest::Client,
    base_url: String,
}

impl AssemblyAiClient {
    /// Create a new AssemblyAI client with the given API key and base URL
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, Error> {
        let mut headers = reqwest::header::HeaderMap::new();

        let mut header_value = reqwest::header::HeaderValue::from_str(api_key).map_err(|e| {
            warn!("Failed to create auth header: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Invalid API key format".to_string(),
                )),
            }
        })?;
        header_value.set_sensitive(true);
        headers.insert("authorization", header_value);

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new transcription request
    pub async fn create_transcript(
        &self,
        request: CreateTranscriptRequest,
    ) -> Result<TranscriptResponse, SpeechAiError> {
        let url = format!("{}/transcript", self.base_url);

        debug!(
            "Creating AssemblyAI transcript for audio: {}",
            request.audio_url
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to create AssemblyAI transcript: {:?}", e);
                SpeechAiError::Network(e.to_string())
            })?;

        Self::read_transcript(response).await
    }

    /// Get the status of a transcript
    pub async fn get_transcript(
        &self,
        transcript_id: &str,
    ) -> Result<TranscriptResponse, SpeechAiError> {
        let url = format!("{}/transcript/{}", self.base_url, transcript_id);

        debug!("Fetching AssemblyAI transcript {transcript_id}");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Failed to get AssemblyAI transcript: {:?}", e);
            SpeechAiError::Network(e.to_string())
        })?;

        Self::read_transcript(response).await
    }

    async fn read_transcript(
        response: reqwest::Response,
    ) -> Result<TranscriptResponse, SpeechAiError> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| {
                warn!("Failed to parse AssemblyAI response: {:?}", e);
                SpeechAiError::Deserialization(e.to_string())
            })
        } else {
            let error_text = response.text().await.unwrap_or_default();
            error!("AssemblyAI API: {}", error_text);
            Err(match status {
                reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                    SpeechAiError::Authentication(error_text)
                }
                reqwest::StatusCode::NOT_FOUND => SpeechAiError::NotFound(error_text),
                _ => SpeechAiError::Provider(error_text),
            })
        }
    }
}

#[async_trait]
impl Provider for AssemblyAiClient {
    async fn create_transcription(&self, config: Config) -> Result<Transcription, SpeechAiError> {
        let transcription = self
            .create_transcript(config.into())
            .await?
            .into_transcription()?;
        info!(
            "Created AssemblyAI transcript with ID: {}",
            transcription.id
        );
        Ok(transcription)
    }

    async fn get_transcription(
        &self,
        transcription_id: &str,
    ) -> Result<Transcription, SpeechAiError> {
        self.get_transcript(transcription_id)
            .await?
            .into_transcription()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    async fn setup_test_server() -> ServerGuard {
        Server::new_async().await
    }

    fn client(server: &ServerGuard) -> AssemblyAiClient {
        AssemblyAiClient::new("test_api_key_123", &server.url()).unwrap()
    }

    #[tokio::test]
    async fn create_transcription_posts_audio_and_webhook() {
        let mut server = setup_test_server().await;
        let mock = server
            .mock("POST", "/transcript")
            .match_header("authorization", "test_api_key_123")
            .match_body(Matcher::Json(serde_json::json!({
                "audio_url": "https://audio.example.com/a.m4a",
                "webhook_url": "https://cms.example.com/receive_transcription/aaaaaaaaaaa/1",
                "webhook_auth_header_name": "x-webhook-secret",
                "webhook_auth_header_value": "s3cret",
                "speaker_labels": true
            })))
            .with_status(200)
            .with_body(r#"{"id": "job-1", "status": "queued"}"#)
            .create_async()
            .await;

        let mut config = Config::new("https://audio.example.com/a.m4a");
        config.webhook_url =
            Some("https://cms.example.com/receive_transcription/aaaaaaaaaaa/1".to_string());
        config.webhook_auth_header = Some(("x-webhook-secret".to_string(), "s3cret".to_string()));

        let transcription = client(&server).create_transcription(config).await.unwrap();

        mock.assert_async().await;
        assert_eq!(transcription.id, "job-1");
        assert_eq!(transcription.status, Status::Queued);
    }

    #[tokio::test]
    async fn create_transcription_without_id_is_a_provider_error() {
        let mut server = setup_test_server().await;
        server
            .mock("POST", "/transcript")
            .with_status(200)
            .with_body(r#"{"error": "Invalid audio_url"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .create_transcription(Config::new("not a url"))
            .await
            .unwrap_err();

        match err {
            SpeechAiError::Provider(reason) => assert_eq!(reason, "Invalid audio_url"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_api_keys_are_authentication_errors() {
        let mut server = setup_test_server().await;
        server
            .mock("POST", "/transcript")
            .with_status(401)
            .with_body(r#"{"error": "Authentication error"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .create_transcription(Config::new("https://audio.example.com/a.m4a"))
            .await
            .unwrap_err();

        assert!(matches!(err, SpeechAiError::Authentication(_)));
    }

    #[tokio::test]
    async fn get_transcription_maps_words_and_status() {
        let mut server = setup_test_server().await;
        server
            .mock("GET", "/transcript/job-1")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "id": "job-1",
                    "status": "completed",
                    "text": "hi there bye",
                    "audio_duration": 2.4,
                    "language_code": "en_us",
                    "words": [
                        {"text": "hi", "start": 0, "end": 400, "confidence": 0.99, "speaker": "A"},
                        {"text": "there", "start": 500, "end": 900, "confidence": 0.98, "speaker": "A"},
                        {"text": "bye", "start": 1000, "end": 1300, "confidence": 0.97, "speaker": "B"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transcription = client(&server).get_transcription("job-1").await.unwrap();

        assert_eq!(transcription.status, Status::Completed);
        assert_eq!(transcription.words.len(), 3);
        assert_eq!(transcription.words[2].speaker.as_deref(), Some("B"));
        assert_eq!(transcription.words[1].start_ms, 500);
        assert_eq!(transcription.duration_seconds, Some(2));
    }

    #[tokio::test]
    async fn failed_jobs_carry_the_error_message() {
        let mut server = setup_test_server().await;
        server
            .mock("GET", "/transcript/job-2")
            .with_status(200)
            .with_body(
                r#"{"id": "job-2", "status": "error", "error": "Audio duration is too short"}"#,
            )
            .create_async()
            .await;

        let transcription = client(&server).get_transcription("job-2").await.unwrap();

        assert_eq!(transcription.status, Status::Failed);
        assert_eq!(
            transcription.error_message.as_deref(),
            Some("Audio duration is too short")
        );
        assert!(transcription.words.is_empty());
    }

    #[tokio::test]
    async fn unknown_transcripts_are_not_found() {
        let mut server = setup_test_server().await;
        server
            .mock("GET", "/transcript/missing")
            .with_status(404)
            .with_body(r#"{"error": "Transcript not found"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .get_transcription("missing")
            .await
            .unwrap_err();

        assert!(matches!(err, SpeechAiError::NotFound(_)));
    }
}
