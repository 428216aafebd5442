//! Second step of the workflow: create the pending record and submit the speech job.

use crate::error::{Error, ExistingTranscription, TranscriptionErrorKind};
use crate::reference::{FieldKind, FieldValue, ResolvedRecord};
use crate::transcription::{is_conflict, title_for, PendingTranscription};
use crate::users;
use crate::video_id::VideoId;
use crate::workflow::TranscriptWorkflow;
use crate::{transcriptions, Id};
use log::*;
use speech_ai::types::transcription::Config as TranscriptionConfig;

/// Form data of a transcription request.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub video_id: String,
    pub audio_url: String,
    pub parent_instance_str: String,
    pub transcription_field: String,
    pub field_name: String,
}

pub const SUBMISSION_FAILED_MESSAGE: &str = "Ops... Something went wrong. Try again later.";
pub const NOT_VALIDATED_MESSAGE: &str = "Video data has not been validated";

/// Text shown to the editor for a failed request. Upstream errors are never shown.
pub fn user_message(kind: &TranscriptionErrorKind, video_id: &str) -> String {
    match kind {
        TranscriptionErrorKind::CapabilityRejected => NOT_VALIDATED_MESSAGE.to_string(),
        TranscriptionErrorKind::InvalidFormat
        | TranscriptionErrorKind::InProgress
        | TranscriptionErrorKind::DuplicateCompleted(_) => {
            crate::validation::user_message(kind, video_id)
        }
        _ => SUBMISSION_FAILED_MESSAGE.to_string(),
    }
}

/// Field values of the target record before the request touched them.
struct Snapshot {
    video_id: FieldValue,
    transcription: FieldValue,
}

impl TranscriptWorkflow {
    /// Creates the pending transcript record, links the target record to it and
    /// submits the speech job. When any step fails, everything done so far is
    /// undone and [`TranscriptionErrorKind::SubmissionFailed`] is returned.
    pub async fn request(
        &self,
        user: &users::Model,
        token: &str,
        request: &TranscriptionRequest,
    ) -> Result<transcriptions::Model, Error> {
        if !self.tokens.verify(user, &request.video_id, token) {
            warn!(
                "Rejected transcription request of user {} for video {:?}: capability token does not verify",
                user.id, request.video_id
            );
            return Err(Error::transcription(
                TranscriptionErrorKind::CapabilityRejected,
            ));
        }
        let video_id = VideoId::parse(&request.video_id)?;

        let record = self
            .records
            .resolve(&request.parent_instance_str)
            .await
            .map_err(|err| submission_failed("resolving the target record", err))?;
        record
            .require_field(&request.transcription_field, FieldKind::TranscriptionLink)
            .and_then(|_| record.require_field(&request.field_name, FieldKind::VideoId))
            .map_err(|err| submission_failed("checking the target fields", err))?;

        let snapshot = Snapshot {
            video_id: record
                .read(&request.field_name)
                .await
                .map_err(|err| submission_failed("reading the target record", err))?,
            transcription: record
                .read(&request.transcription_field)
                .await
                .map_err(|err| submission_failed("reading the target record", err))?,
        };

        let transcription = match self
            .store
            .create_pending(PendingTranscription {
                title: title_for(video_id.as_str()),
                video_id: video_id.to_string(),
                target_reference: Some(record.reference().to_string()),
                target_field: Some(request.transcription_field.clone()),
                requested_by: Some(user.id),
            })
            .await
        {
            Ok(transcription) => transcription,
            Err(err) if is_conflict(&err) => {
                info!("Another request for video {video_id} got there first");
                return Err(self.conflicting_request(&video_id).await);
            }
            Err(err) => return Err(submission_failed("creating the pending record", err)),
        };

        if let Err(err) = self
            .link_and_submit(&record, &video_id, user.id, transcription.id, request)
            .await
        {
            self.compensate(&record, &video_id, snapshot, request).await;
            return Err(submission_failed("submitting the transcription job", err));
        }

        info!(
            "Transcription {} for video {video_id} requested by user {}",
            transcription.id, user.id
        );
        Ok(transcription)
    }

    /// Reports why a record for `video_id` already exists: its transcript is
    /// either finished or still being produced.
    async fn conflicting_request(&self, video_id: &VideoId) -> Error {
        match self.store.find_any_by_video_id(video_id.as_str()).await {
            Ok(Some(existing)) if existing.completed => {
                Error::transcription(TranscriptionErrorKind::DuplicateCompleted(
                    ExistingTranscription {
                        edit_url: self.transcription_edit_url(existing.id),
                        id: existing.id,
                        title: existing.title,
                    },
                ))
            }
            Ok(_) => Error::transcription(TranscriptionErrorKind::InProgress),
            Err(err) => submission_failed("reading the conflicting record", err),
        }
    }

    async fn link_and_submit(
        &self,
        record: &ResolvedRecord,
        video_id: &VideoId,
        user_id: Id,
        transcription_id: Id,
        request: &TranscriptionRequest,
    ) -> Result<(), Error> {
        record
            .write(
                &request.field_name,
                FieldValue::VideoId(Some(video_id.to_string())),
            )
            .await?;
        record
            .write(
                &request.transcription_field,
                FieldValue::TranscriptionLink(Some(transcription_id)),
            )
            .await?;

        let mut config = TranscriptionConfig::new(request.audio_url.clone());
        config.webhook_url = Some(self.webhook_url(video_id.as_str(), user_id));
        config.webhook_auth_header = self.webhook.as_ref().map(|w| w.auth_header());

        let job = self.provider.create_transcription(config).await?;
        debug!("Speech job {} accepted for video {video_id}", job.id);
        Ok(())
    }

    /// Restores the target record and removes the pending record.
    async fn compensate(
        &self,
        record: &ResolvedRecord,
        video_id: &VideoId,
        snapshot: Snapshot,
        request: &TranscriptionRequest,
    ) {
        if let Err(err) = record
            .write(&request.transcription_field, snapshot.transcription)
            .await
        {
            error!("Could not restore {} of {}: {err:?}", request.transcription_field, record.reference());
        }
        if let Err(err) = record.write(&request.field_name, snapshot.video_id).await {
            error!("Could not restore {} of {}: {err:?}", request.field_name, record.reference());
        }
        match self.store.delete_pending(video_id.as_str()).await {
            Ok(removed) => debug!("Removed {removed} pending record(s) of video {video_id}"),
            Err(err) => error!("Could not remove pending record of video {video_id}: {err:?}"),
        }
    }
}

fn submission_failed(step: &str, err: Error) -> Error {
    error!("Transcription request failed while {step}: {err:?}");
    Error {
        source: Some(Box::new(err)),
        error_kind: crate::error::DomainErrorKind::Transcription(
            TranscriptionErrorKind::SubmissionFailed,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use crate::test_support::{editor, Fixture};
    use speech_ai::traits::transcription::MockProvider;
    use std::sync::Arc;

    fn form(video_id: &str) -> TranscriptionRequest {
        TranscriptionRequest {
            video_id: video_id.to_string(),
            audio_url: format!("https://audio.example.com/{video_id}.m4a"),
            parent_instance_str: "cms:page:1".to_string(),
            transcription_field: "transcription".to_string(),
            field_name: "video_id".to_string(),
        }
    }

    fn kind(err: Error) -> DomainErrorKind {
        err.error_kind
    }

    #[tokio::test]
    async fn request_creates_a_pending_record_and_links_the_target() {
        let fixture = Fixture::new();
        fixture.pages.insert("1");
        let workflow = fixture.workflow();
        let user = editor();
        let token = workflow.tokens.issue(&user, "aaaaaaaaaaa");

        let transcription = workflow
            .request(&user, &token, &form("aaaaaaaaaaa"))
            .await
            .unwrap();

        assert!(!transcription.completed);
        assert_eq!(transcription.title, "auto_transcription-aaaaaaaaaaa");
        assert_eq!(transcription.target_reference.as_deref(), Some("cms:page:1"));
        assert_eq!(fixture.pages.transcription_of("1"), Some(transcription.id));
        assert_eq!(
            fixture.pages.video_id_of("1").as_deref(),
            Some("aaaaaaaaaaa")
        );

        let submissions = fixture.provider.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(
            submissions[0].media_url,
            "https://audio.example.com/aaaaaaaaaaa.m4a"
        );
        assert_eq!(
            submissions[0].webhook_url.as_deref(),
            Some(
                format!(
                    "https://cms.example.com/receive_transcription/aaaaaaaaaaa/{}",
                    user.id
                )
                .as_str()
            )
        );
        assert!(submissions[0].enable_speaker_labels);
        assert_eq!(submissions[0].webhook_auth_header, None);
    }

    #[tokio::test]
    async fn webhook_secret_is_registered_with_the_job() {
        let fixture = Fixture::new().with_webhook_secret("s3cret");
        fixture.pages.insert("1");
        let workflow = fixture.workflow();
        let user = editor();
        let token = workflow.tokens.issue(&user, "aaaaaaaaaaa");

        workflow
            .request(&user, &token, &form("aaaaaaaaaaa"))
            .await
            .unwrap();

        assert_eq!(
            fixture.provider.submissions()[0].webhook_auth_header,
            Some(("x-webhook-secret".to_string(), "s3cret".to_string()))
        );
    }

    #[tokio::test]
    async fn tokens_of_other_users_or_videos_are_rejected() {
        let fixture = Fixture::new();
        fixture.pages.insert("1");
        let workflow = fixture.workflow();
        let user = editor();
        let other = editor();
        let token = workflow.tokens.issue(&user, "aaaaaaaaaaa");

        let err = workflow
            .request(&other, &token, &form("aaaaaaaaaaa"))
            .await
            .unwrap_err();
        assert_eq!(
            kind(err),
            DomainErrorKind::Transcription(TranscriptionErrorKind::CapabilityRejected)
        );

        let err = workflow
            .request(&user, &token, &form("bbbbbbbbbbb"))
            .await
            .unwrap_err();
        assert_eq!(
            kind(err),
            DomainErrorKind::Transcription(TranscriptionErrorKind::CapabilityRejected)
        );
        assert!(fixture.store.all().is_empty());
        assert!(fixture.provider.submissions().is_empty());
    }

    #[tokio::test]
    async fn failed_submissions_leave_no_trace() {
        let mut provider = MockProvider::new();
        provider.expect_create_transcription().times(1).returning(|_| {
            Err(speech_ai::Error::Provider(
                "Invalid endpoint schema".to_string(),
            ))
        });
        let fixture = Fixture::new().with_provider(Arc::new(provider));
        fixture.pages.insert("1");
        let previous = crate::Id::new_v4();
        fixture.pages.set("1", Some("zzzzzzzzzzz"), Some(previous));
        let workflow = fixture.workflow();
        let user = editor();
        let token = workflow.tokens.issue(&user, "aaaaaaaaaaa");

        let err = workflow
            .request(&user, &token, &form("aaaaaaaaaaa"))
            .await
            .unwrap_err();

        assert_eq!(
            kind(err),
            DomainErrorKind::Transcription(TranscriptionErrorKind::SubmissionFailed)
        );
        assert!(fixture.store.all().is_empty());
        assert_eq!(fixture.pages.transcription_of("1"), Some(previous));
        assert_eq!(
            fixture.pages.video_id_of("1").as_deref(),
            Some("zzzzzzzzzzz")
        );
        assert_eq!(
            user_message(&TranscriptionErrorKind::SubmissionFailed, "aaaaaaaaaaa"),
            "Ops... Something went wrong. Try again later."
        );
    }

    #[tokio::test]
    async fn a_second_request_for_a_running_video_is_in_progress() {
        let fixture = Fixture::new();
        fixture.pages.insert("1");
        fixture.store.insert_pending("aaaaaaaaaaa");
        let workflow = fixture.workflow();
        let user = editor();
        let token = workflow.tokens.issue(&user, "aaaaaaaaaaa");

        let err = workflow
            .request(&user, &token, &form("aaaaaaaaaaa"))
            .await
            .unwrap_err();

        assert_eq!(
            kind(err),
            DomainErrorKind::Transcription(TranscriptionErrorKind::InProgress)
        );
        assert_eq!(fixture.store.all().len(), 1);
        assert!(fixture.provider.submissions().is_empty());
        assert_eq!(
            user_message(&TranscriptionErrorKind::InProgress, "aaaaaaaaaaa"),
            r#"Transcription process for video with id : "aaaaaaaaaaa" is currently running"#
        );
    }

    #[tokio::test]
    async fn a_request_for_a_finished_video_reports_the_existing_transcript() {
        let fixture = Fixture::new();
        fixture.pages.insert("1");
        let existing = fixture
            .store
            .insert_completed("aaaaaaaaaaa", "documents/auto_transcription-aaaaaaaaaaa.docx");
        let workflow = fixture.workflow();
        let user = editor();
        let token = workflow.tokens.issue(&user, "aaaaaaaaaaa");

        let err = workflow
            .request(&user, &token, &form("aaaaaaaaaaa"))
            .await
            .unwrap_err();

        assert_eq!(
            kind(err),
            DomainErrorKind::Transcription(TranscriptionErrorKind::DuplicateCompleted(
                ExistingTranscription {
                    id: existing.id,
                    title: "auto_transcription-aaaaaaaaaaa".to_string(),
                    edit_url: format!("/admin/transcriptions/{}/edit", existing.id),
                }
            ))
        );
        assert_eq!(fixture.store.all().len(), 1);
        assert!(fixture.provider.submissions().is_empty());
        assert_eq!(fixture.pages.transcription_of("1"), None);
    }

    #[tokio::test]
    async fn missing_target_records_fail_the_submission() {
        let fixture = Fixture::new();
        let workflow = fixture.workflow();
        let user = editor();
        let token = workflow.tokens.issue(&user, "aaaaaaaaaaa");

        let err = workflow
            .request(&user, &token, &form("aaaaaaaaaaa"))
            .await
            .unwrap_err();

        assert_eq!(
            kind(err),
            DomainErrorKind::Transcription(TranscriptionErrorKind::SubmissionFailed)
        );
        assert!(fixture.store.all().is_empty());
    }
}
