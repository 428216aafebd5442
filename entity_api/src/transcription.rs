//! CRUD operations for the transcriptions table.

use super::error::Error;
use entity::transcriptions::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    ConnectionTrait, QueryOrder, QuerySelect,
};

/// Attributes of a transcription that has been requested but not yet received.
#[derive(Debug, Clone)]
pub struct PendingTranscription {
    pub title: String,
    pub video_id: String,
    pub target_reference: Option<String>,
    pub target_field: Option<String>,
    pub requested_by: Option<Id>,
}

/// Creates a transcription record with `completed = false`.
pub async fn create_pending(
    db: &impl ConnectionTrait,
    pending: PendingTranscription,
) -> Result<Model, Error> {
    debug!(
        "Creating pending transcription for video: {}",
        pending.video_id
    );

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        title: Set(pending.title),
        video_id: Set(Some(pending.video_id)),
        file: Set(None),
        verified: Set(false),
        completed: Set(false),
        target_reference: Set(pending.target_reference),
        target_field: Set(pending.target_field),
        requested_by: Set(pending.requested_by),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?)
}

/// Finds the transcription for a video regardless of its state.
pub async fn find_by_video_id(
    db: &impl ConnectionTrait,
    video_id: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::VideoId.eq(video_id))
        .one(db)
        .await?)
}

/// Finds the transcription for a video in the requested state.
pub async fn find_by_video_id_and_completed(
    db: &impl ConnectionTrait,
    video_id: &str,
    completed: bool,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::VideoId.eq(video_id))
        .filter(Column::Completed.eq(completed))
        .one(db)
        .await?)
}

/// Returns the video ids of every transcription that is still in flight.
pub async fn find_processing_video_ids(db: &impl ConnectionTrait) -> Result<Vec<String>, Error> {
    let video_ids: Vec<Option<String>> = Entity::find()
        .select_only()
        .column(Column::VideoId)
        .filter(Column::Completed.eq(false))
        .filter(Column::VideoId.is_not_null())
        .order_by_asc(Column::CreatedAt)
        .into_tuple()
        .all(db)
        .await?;

    Ok(video_ids.into_iter().flatten().collect())
}

/// Attaches a document to the pending transcription of `video_id` and marks it completed.
pub async fn mark_completed(
    db: &impl ConnectionTrait,
    video_id: &str,
    file: String,
) -> Result<Model, Error> {
    let existing = find_by_video_id_and_completed(db, video_id, false)
        .await?
        .ok_or_else(|| {
            debug!("No pending transcription found for video {video_id}");
            Error::not_found()
        })?;

    debug!("Completing transcription {} with file {file}", existing.id);

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        title: Unchanged(existing.title),
        video_id: Unchanged(existing.video_id),
        file: Set(Some(file)),
        verified: Unchanged(existing.verified),
        completed: Set(true),
        target_reference: Unchanged(existing.target_reference),
        target_field: Unchanged(existing.target_field),
        requested_by: Unchanged(existing.requested_by),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.update(db).await?)
}

/// Deletes the pending transcription of `video_id`. Returns how many rows were removed;
/// zero is not an error.
pub async fn delete_pending_by_video_id(
    db: &impl ConnectionTrait,
    video_id: &str,
) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::VideoId.eq(video_id))
        .filter(Column::Completed.eq(false))
        .exec(db)
        .await?;

    debug!(
        "Deleted {} pending transcription(s) for video {video_id}",
        result.rows_affected
    );
    Ok(result.rows_affected)
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::error::EntityApiErrorKind;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn pending_model(video_id: &str) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            title: format!("auto_transcription-{video_id}"),
            video_id: Some(video_id.to_string()),
            file: None,
            verified: false,
            completed: false,
            target_reference: Some("cms:page:1".to_string()),
            target_field: Some("transcription".to_string()),
            requested_by: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn create_pending_returns_an_uncompleted_model() -> Result<(), Error> {
        let model = pending_model("aaaaaaaaaaa");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let created = create_pending(
            &db,
            PendingTranscription {
                title: model.title.clone(),
                video_id: "aaaaaaaaaaa".to_string(),
                target_reference: model.target_reference.clone(),
                target_field: model.target_field.clone(),
                requested_by: None,
            },
        )
        .await?;

        assert!(!created.completed);
        assert_eq!(created.video_id.as_deref(), Some("aaaaaaaaaaa"));
        Ok(())
    }

    #[tokio::test]
    async fn find_by_video_id_returns_pending_records() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![pending_model("aaaaaaaaaaa")]])
            .into_connection();

        let found = find_by_video_id(&db, "aaaaaaaaaaa").await?;

        assert!(found.is_some_and(|model| !model.completed));
        Ok(())
    }

    #[tokio::test]
    async fn mark_completed_returns_not_found_without_pending_record() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<Model, Vec<Model>, _>(vec![vec![]])
            .into_connection();

        let result = mark_completed(&db, "aaaaaaaaaaa", "documents/x.docx".to_string()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound
        );
    }

    #[tokio::test]
    async fn mark_completed_sets_file_and_completed() -> Result<(), Error> {
        let pending = pending_model("aaaaaaaaaaa");
        let mut completed = pending.clone();
        completed.completed = true;
        completed.file = Some("documents/auto_transcription-aaaaaaaaaaa.docx".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![pending]])
            .append_query_results(vec![vec![completed.clone()]])
            .into_connection();

        let updated = mark_completed(
            &db,
            "aaaaaaaaaaa",
            "documents/auto_transcription-aaaaaaaaaaa.docx".to_string(),
        )
        .await?;

        assert!(updated.completed);
        assert_eq!(updated.file, completed.file);
        Ok(())
    }

    #[tokio::test]
    async fn delete_pending_by_video_id_tolerates_missing_rows() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        assert_eq!(delete_pending_by_video_id(&db, "aaaaaaaaaaa").await?, 0);
        Ok(())
    }
}
