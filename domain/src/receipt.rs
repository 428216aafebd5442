//! Last step of the workflow: the speech service calling back.

use crate::document::{document_name, StoredDocument};
use crate::error::{DomainErrorKind, Error, TranscriptionErrorKind};
use crate::notification::{notify, Message, Outcome};
use crate::phrase::segment;
use crate::reference::FieldValue;
use crate::transcriptions;
use crate::video_id::watch_url;
use crate::workflow::TranscriptWorkflow;
use crate::Id;
use log::*;
use serde::Deserialize;
use speech_ai::Status;

/// Body the speech service posts to the webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackBody {
    pub status: Option<String>,
    pub transcript_id: Option<String>,
}

impl CallbackBody {
    /// Parses a callback body. A body that is not the expected JSON yields
    /// neither status nor job id, which the workflow treats as a failure.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|err| {
            warn!("Malformed transcription callback body: {err}");
            CallbackBody::default()
        })
    }

    /// Why a callback that does not report a finished job failed.
    fn failure_kind(&self) -> TranscriptionErrorKind {
        match self.status {
            None => TranscriptionErrorKind::CallbackMalformed,
            Some(_) => TranscriptionErrorKind::CallbackProcessingFailed,
        }
    }

    fn completed_job(&self) -> Option<&str> {
        match (self.status.as_deref(), self.transcript_id.as_deref()) {
            (Some("completed"), Some(id)) if !id.is_empty() => Some(id),
            _ => None,
        }
    }
}

/// How a callback ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptOutcome {
    /// The transcript record was finalized with its document
    Completed(transcriptions::Model),
    /// The pending transcript record was removed
    Failed,
    /// No pending transcript record exists for the video
    Ignored,
}

impl ReceiptOutcome {
    /// The `type` acknowledged to the speech service.
    pub fn response_type(&self) -> &'static str {
        match self {
            ReceiptOutcome::Completed(_) => "success",
            ReceiptOutcome::Failed | ReceiptOutcome::Ignored => "error",
        }
    }
}

/// Why finalizing a completed job did not produce a transcript.
enum FinalizeError {
    /// A concurrent callback already completed the record
    AlreadyCompleted,
    /// The error and the provider's error text, if any
    Failed(Error, Option<String>),
}

impl FinalizeError {
    fn processing(err: Error) -> Self {
        FinalizeError::Failed(processing_failed(err), None)
    }
}

impl TranscriptWorkflow {
    /// Finishes or aborts the pending transcript of `video_id`.
    ///
    /// Never fails: problems while fetching or finalizing abort the record and
    /// are reported to `user_id` through a notification. A record another
    /// callback completed in the meantime is left alone.
    pub async fn receive(&self, video_id: &str, user_id: Option<Id>, body: &[u8]) -> ReceiptOutcome {
        let callback = CallbackBody::parse(body);
        debug!(
            "Transcription callback for video {video_id}: status {:?}, job {:?}",
            callback.status, callback.transcript_id
        );

        let pending = match self.store.find_by_video_id(video_id, false).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                info!("No pending transcription for video {video_id}, ignoring callback");
                return ReceiptOutcome::Ignored;
            }
            Err(err) => {
                error!("Could not look up pending transcription of video {video_id}: {err:?}");
                return ReceiptOutcome::Ignored;
            }
        };

        let (err, failure_text) = match callback.completed_job() {
            Some(job_id) => match self.finalize(video_id, job_id, &pending).await {
                Ok((transcription, document_url, edit_url)) => {
                    info!(
                        "Transcription {} of video {video_id} completed",
                        transcription.id
                    );
                    self.notify_user(
                        user_id,
                        Message {
                            outcome: Outcome::Completed {
                                document_url: &document_url,
                            },
                            edit_url: &edit_url,
                            extra_text: None,
                        },
                    )
                    .await;
                    return ReceiptOutcome::Completed(transcription);
                }
                Err(FinalizeError::AlreadyCompleted) => {
                    info!("Transcription of video {video_id} was completed by another callback");
                    return ReceiptOutcome::Ignored;
                }
                Err(FinalizeError::Failed(err, text)) => (err, text),
            },
            None => {
                let text = match callback.transcript_id.as_deref() {
                    Some(job_id) => self.fetch_error_text(job_id).await,
                    None => None,
                };
                (Error::transcription(callback.failure_kind()), text)
            }
        };

        error!("Transcription of video {video_id} failed: {err:?}");
        self.abort(video_id, user_id, &pending, failure_text.as_deref())
            .await;
        ReceiptOutcome::Failed
    }

    /// Fetches the finished job, stores its document and completes the record.
    ///
    /// Returns the record, the document URL and the edit URL for the
    /// notification.
    async fn finalize(
        &self,
        video_id: &str,
        job_id: &str,
        pending: &transcriptions::Model,
    ) -> Result<(transcriptions::Model, String, String), FinalizeError> {
        let job = self
            .provider
            .get_transcription(job_id)
            .await
            .map_err(|err| FinalizeError::processing(err.into()))?;
        if job.status != Status::Completed {
            return Err(FinalizeError::Failed(
                Error::transcription(TranscriptionErrorKind::CallbackProcessingFailed),
                job.error_message,
            ));
        }

        let phrases: Vec<_> = segment(&job.words).collect();
        debug!("Video {video_id}: {} phrase(s) from job {job_id}", phrases.len());
        let bytes = self
            .document_builder
            .build(&phrases)
            .map_err(FinalizeError::processing)?;
        let stored = self
            .documents
            .save(&document_name(video_id), bytes)
            .await
            .map_err(FinalizeError::processing)?;
        let transcription = match self
            .store
            .mark_completed(video_id, stored.reference.clone())
            .await
        {
            Ok(transcription) => transcription,
            Err(err) => return Err(self.completion_failed(video_id, &stored, err).await),
        };

        let edit_url = self
            .link_target(pending, transcription.id)
            .await
            .unwrap_or_else(|| self.transcription_edit_url(transcription.id));

        Ok((transcription, stored.url, edit_url))
    }

    /// Sorts out a record that could not be completed. When a concurrent
    /// callback completed it in the meantime, the stored document is that
    /// callback's as well and stays. Otherwise the document is removed.
    async fn completion_failed(
        &self,
        video_id: &str,
        stored: &StoredDocument,
        err: Error,
    ) -> FinalizeError {
        if let Ok(Some(completed)) = self.store.find_by_video_id(video_id, true).await {
            debug!("Transcription {} of video {video_id} is already completed", completed.id);
            return FinalizeError::AlreadyCompleted;
        }

        if let Err(remove_err) = self.documents.remove(&stored.reference).await {
            error!("Could not remove orphaned document {}: {remove_err:?}", stored.reference);
        }
        FinalizeError::processing(err)
    }

    /// Points the target record at the finished transcript. Returns the edit
    /// URL of the target record, or `None` when it could not be updated.
    async fn link_target(&self, pending: &transcriptions::Model, transcription_id: Id) -> Option<String> {
        let (reference, field) = match (&pending.target_reference, &pending.target_field) {
            (Some(reference), Some(field)) => (reference, field),
            _ => {
                warn!("Transcription {} has no target record", pending.id);
                return None;
            }
        };

        let record = match self.records.resolve(reference).await {
            Ok(record) => record,
            Err(err) => {
                warn!("Target record {reference} of transcription {transcription_id} is gone: {err:?}");
                return None;
            }
        };
        if let Err(err) = record
            .write(field, FieldValue::TranscriptionLink(Some(transcription_id)))
            .await
        {
            warn!("Could not link {reference} {field} to transcription {transcription_id}: {err:?}");
        }
        Some(record.edit_url())
    }

    async fn fetch_error_text(&self, job_id: &str) -> Option<String> {
        match self.provider.get_transcription(job_id).await {
            Ok(job) => job.error_message,
            Err(err) => {
                warn!("Could not fetch failed job {job_id}: {err:?}");
                None
            }
        }
    }

    /// Removes the pending record and tells the user.
    async fn abort(
        &self,
        video_id: &str,
        user_id: Option<Id>,
        pending: &transcriptions::Model,
        failure_text: Option<&str>,
    ) {
        match self.store.delete_pending(video_id).await {
            Ok(removed) => info!("Removed {removed} pending transcription(s) of video {video_id}"),
            Err(err) => error!("Could not remove pending transcription of video {video_id}: {err:?}"),
        }

        let edit_url = match &pending.target_reference {
            Some(reference) => match self.records.resolve(reference).await {
                Ok(record) => record.edit_url(),
                Err(_) => String::new(),
            },
            None => String::new(),
        };
        let video_url = watch_url(video_id);
        self.notify_user(
            user_id,
            Message {
                outcome: Outcome::Failed {
                    video_url: &video_url,
                },
                edit_url: &edit_url,
                extra_text: failure_text,
            },
        )
        .await;
    }

    async fn notify_user(&self, user_id: Option<Id>, message: Message<'_>) {
        match user_id {
            Some(user_id) => notify(self.notifications.as_ref(), user_id, message).await,
            None => warn!(
                "Callback names no valid user, dropping \"{}\" notification",
                message.verb()
            ),
        }
    }
}

fn processing_failed(err: Error) -> Error {
    Error {
        source: Some(Box::new(err)),
        error_kind: DomainErrorKind::Transcription(TranscriptionErrorKind::CallbackProcessingFailed),
    }
}
