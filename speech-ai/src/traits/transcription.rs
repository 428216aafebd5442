//! Transcription provider trait.

use crate::types::transcription::{Config, Transcription};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for webhook based speech-to-text services.
///
/// Implementations accept a publicly reachable audio URL, start an asynchronous
/// job with speaker diarization and report completion by calling the webhook URL
/// given in [`Config`].
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Start an async transcription job for the audio at `config.media_url`.
    ///
    /// Returns as soon as the provider accepted the job. A response without a job
    /// id is reported as [`Error::Provider`] carrying the provider's error text.
    async fn create_transcription(
        &self,
        config: Config,
    ) -> std::result::Result<Transcription, Error>;

    /// Retrieve transcription status and results by ID.
    ///
    /// Words populate only when status is Completed.
    async fn get_transcription(
        &self,
        transcription_id: &str,
    ) -> std::result::Result<Transcription, Error>;
}
