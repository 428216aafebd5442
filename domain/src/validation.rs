//! First step of the workflow: decide whether a video may be transcribed.

use crate::error::{Error, ExistingTranscription, TranscriptionErrorKind};
use crate::reference::FieldKind;
use crate::users;
use crate::video_id::VideoId;
use crate::workflow::TranscriptWorkflow;
use log::*;
use speech_ai::{AudioLookup, Unavailability, VideoDetails, VideoLookup};

/// Form data of a validation request.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub video_id: String,
    /// `namespace:type:id` of the record the transcript is for
    pub parent_instance_str: String,
    /// Field of that record linking to the transcript
    pub transcription_field: String,
    /// Field of that record holding the video id
    pub field_name: String,
}

/// A video that passed validation, with the token proving it.
#[derive(Debug, Clone)]
pub struct ValidatedVideo {
    pub details: VideoDetails,
    pub audio_url: String,
    pub token: String,
}

pub const GENERAL_ERROR_MESSAGE: &str =
    "Something went wrong. Please try again or upload transcription manually";
pub const INVALID_VIDEO_ID_MESSAGE: &str = "Invalid youtube video id. Make sure it have exactly 11 characters, contains only numbers, letters or dashes";

/// Text shown to the editor for a failed validation.
pub fn user_message(kind: &TranscriptionErrorKind, video_id: &str) -> String {
    match kind {
        TranscriptionErrorKind::InvalidFormat => INVALID_VIDEO_ID_MESSAGE.to_string(),
        TranscriptionErrorKind::DuplicateCompleted(_) => format!(
            r#"Transcription for video with id : "{video_id}" already exists. <span class="continue_btn">Add Existing Transcription</span>"#
        ),
        TranscriptionErrorKind::InProgress => format!(
            r#"Transcription process for video with id : "{video_id}" is currently running"#
        ),
        TranscriptionErrorKind::RemoteUnavailable(Unavailability::NotFound) => {
            format!("YouTube video with id : {video_id} does not exist")
        }
        TranscriptionErrorKind::RemoteUnavailable(reason) => {
            format!("Unable to transcribe video with id : {video_id}, {reason}")
        }
        TranscriptionErrorKind::NoAudioStream => {
            format!(
                "Unable to find audio for video with id : {video_id}. Make sure that video is public"
            )
        }
        _ => GENERAL_ERROR_MESSAGE.to_string(),
    }
}

impl TranscriptWorkflow {
    /// Runs the validation checks, cheapest first, and issues a capability token
    /// for `user` and the video when all pass.
    pub async fn validate(
        &self,
        user: &users::Model,
        request: &ValidationRequest,
    ) -> Result<ValidatedVideo, Error> {
        let record = self.records.resolve(&request.parent_instance_str).await?;
        record.require_field(&request.transcription_field, FieldKind::TranscriptionLink)?;
        record.require_field(&request.field_name, FieldKind::VideoId)?;

        let video_id = VideoId::parse(&request.video_id)?;

        if let Some(existing) = self.store.find_by_video_id(video_id.as_str(), true).await? {
            debug!("Video {video_id} already has transcription {}", existing.id);
            return Err(Error::transcription(
                TranscriptionErrorKind::DuplicateCompleted(ExistingTranscription {
                    edit_url: self.transcription_edit_url(existing.id),
                    id: existing.id,
                    title: existing.title,
                }),
            ));
        }

        if self
            .store
            .find_by_video_id(video_id.as_str(), false)
            .await?
            .is_some()
        {
            debug!("Transcription of video {video_id} is still running");
            return Err(Error::transcription(TranscriptionErrorKind::InProgress));
        }

        let details = match self.video_host.lookup_video(video_id.as_str()).await? {
            VideoLookup::Available(details) => details,
            VideoLookup::Unavailable(reason) => {
                info!("Video {video_id} cannot be transcribed: {reason}");
                return Err(Error::transcription(
                    TranscriptionErrorKind::RemoteUnavailable(reason),
                ));
            }
        };

        let audio_url = match self.video_host.audio_stream(video_id.as_str()).await? {
            AudioLookup::Stream(url) => url,
            AudioLookup::Restricted(reason) => {
                info!("Audio of video {video_id} is restricted: {reason}");
                return Err(Error::transcription(
                    TranscriptionErrorKind::RemoteUnavailable(reason),
                ));
            }
            AudioLookup::NoStream => {
                info!("Video {video_id} has no audio stream");
                return Err(Error::transcription(TranscriptionErrorKind::NoAudioStream));
            }
        };

        Ok(ValidatedVideo {
            token: self.tokens.issue(user, video_id.as_str()),
            details,
            audio_url,
        })
    }
}
