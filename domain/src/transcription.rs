//! Storage of transcript records.

use crate::document::validate_document_name;
use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::video_id::VideoId;
use crate::transcriptions;
use async_trait::async_trait;
use entity_api::transcription;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub use entity_api::transcription::PendingTranscription;

/// Persistence of transcript records as the workflow needs it.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Inserts a record with `completed = false`. A second record for the same
    /// video fails with a conflict.
    async fn create_pending(
        &self,
        pending: PendingTranscription,
    ) -> Result<transcriptions::Model, Error>;

    async fn find_by_video_id(
        &self,
        video_id: &str,
        completed: bool,
    ) -> Result<Option<transcriptions::Model>, Error>;

    /// The record of `video_id` whether it is still pending or completed.
    async fn find_any_by_video_id(
        &self,
        video_id: &str,
    ) -> Result<Option<transcriptions::Model>, Error>;

    /// Attaches the document reference to the pending record of `video_id` and completes it.
    async fn mark_completed(
        &self,
        video_id: &str,
        file: String,
    ) -> Result<transcriptions::Model, Error>;

    /// Removes the pending record of `video_id`, returning how many were removed.
    /// Completed records are never touched.
    async fn delete_pending(&self, video_id: &str) -> Result<u64, Error>;

    /// Video ids of all records still waiting for their transcript.
    async fn in_flight_video_ids(&self) -> Result<Vec<String>, Error>;
}

pub struct DatabaseTranscriptStore {
    db: Arc<DatabaseConnection>,
}

impl DatabaseTranscriptStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TranscriptStore for DatabaseTranscriptStore {
    async fn create_pending(
        &self,
        pending: PendingTranscription,
    ) -> Result<transcriptions::Model, Error> {
        VideoId::parse(&pending.video_id)?;
        Ok(transcription::create_pending(self.db.as_ref(), pending).await?)
    }

    async fn find_by_video_id(
        &self,
        video_id: &str,
        completed: bool,
    ) -> Result<Option<transcriptions::Model>, Error> {
        Ok(
            transcription::find_by_video_id_and_completed(self.db.as_ref(), video_id, completed)
                .await?,
        )
    }

    async fn find_any_by_video_id(
        &self,
        video_id: &str,
    ) -> Result<Option<transcriptions::Model>, Error> {
        Ok(transcription::find_by_video_id(self.db.as_ref(), video_id).await?)
    }

    async fn mark_completed(
        &self,
        video_id: &str,
        file: String,
    ) -> Result<transcriptions::Model, Error> {
        let file_name = file.rsplit('/').next().unwrap_or_default();
        validate_document_name(file_name)?;
        Ok(transcription::mark_completed(self.db.as_ref(), video_id, file).await?)
    }

    async fn delete_pending(&self, video_id: &str) -> Result<u64, Error> {
        Ok(transcription::delete_pending_by_video_id(self.db.as_ref(), video_id).await?)
    }

    async fn in_flight_video_ids(&self) -> Result<Vec<String>, Error> {
        Ok(transcription::find_processing_video_ids(self.db.as_ref()).await?)
    }
}

/// Whether `err` is the storage rejecting a second record for the same video.
pub(crate) fn is_conflict(err: &Error) -> bool {
    matches!(
        err.error_kind,
        DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Conflict))
    )
}

pub(crate) fn title_for(video_id: &str) -> String {
    format!("auto_transcription-{video_id}")
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::error::TranscriptionErrorKind;
    use crate::Id;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn store(db: MockDatabase) -> DatabaseTranscriptStore {
        DatabaseTranscriptStore::new(Arc::new(db.into_connection()))
    }

    #[tokio::test]
    async fn create_pending_rejects_malformed_video_ids_before_writing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = DatabaseTranscriptStore::new(Arc::new(db));

        let err = store
            .create_pending(PendingTranscription {
                title: "x".to_owned(),
                video_id: "bad".to_owned(),
                target_reference: None,
                target_field: None,
                requested_by: None,
            })
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Transcription(TranscriptionErrorKind::InvalidFormat)
        );
    }

    #[tokio::test]
    async fn mark_completed_rejects_non_docx_files() {
        let store = store(MockDatabase::new(DatabaseBackend::Postgres));

        assert!(store
            .mark_completed("aaaaaaaaaaa", "documents/notes.pdf".to_owned())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn find_any_by_video_id_maps_missing_rows_to_none() -> Result<(), Error> {
        let store = store(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(vec![Vec::<transcriptions::Model>::new()]),
        );

        assert!(store.find_any_by_video_id("aaaaaaaaaaa").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn find_any_by_video_id_returns_pending_rows() -> Result<(), Error> {
        let now = Utc::now();
        let store = store(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results(vec![vec![
                transcriptions::Model {
                    id: Id::new_v4(),
                    title: title_for("aaaaaaaaaaa"),
                    video_id: Some("aaaaaaaaaaa".to_owned()),
                    file: None,
                    verified: false,
                    completed: false,
                    target_reference: None,
                    target_field: None,
                    requested_by: None,
                    created_at: now.into(),
                    updated_at: now.into(),
                },
            ]]),
        );

        let found = store.find_any_by_video_id("aaaaaaaaaaa").await?.unwrap();
        assert_eq!(found.title, "auto_transcription-aaaaaaaaaaa");
        assert!(!found.completed);
        Ok(())
    }
}
