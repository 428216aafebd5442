use super::error::Error;
use entity::notifications::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait, QueryOrder};

pub async fn create(
    db: &impl ConnectionTrait,
    actor_id: Id,
    recipient_id: Id,
    verb: &str,
    description: String,
) -> Result<Model, Error> {
    debug!("Creating notification \"{verb}\" for user {recipient_id}");

    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        recipient_id: Set(recipient_id),
        actor_id: Set(actor_id),
        verb: Set(verb.to_owned()),
        description: Set(description),
        unread: Set(true),
        created_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.insert(db).await?)
}

/// Deletes a notification addressed to `recipient_id`. Returns `false` when no
/// such notification exists for that recipient.
pub async fn delete_for_recipient(
    db: &impl ConnectionTrait,
    id: Id,
    recipient_id: Id,
) -> Result<bool, Error> {
    let result = Entity::delete_many()
        .filter(Column::Id.eq(id))
        .filter(Column::RecipientId.eq(recipient_id))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

pub async fn find_unread_by_recipient(
    db: &impl ConnectionTrait,
    recipient_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::RecipientId.eq(recipient_id))
        .filter(Column::Unread.eq(true))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn delete_for_recipient_reports_missing_notification() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        assert!(!delete_for_recipient(&db, Id::new_v4(), Id::new_v4()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn delete_for_recipient_reports_deleted_notification() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        assert!(delete_for_recipient(&db, Id::new_v4(), Id::new_v4()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn create_marks_notification_unread() -> Result<(), Error> {
        let user_id = Id::new_v4();
        let model = Model {
            id: Id::new_v4(),
            recipient_id: user_id,
            actor_id: user_id,
            verb: "Message".to_owned(),
            description: "<h3>New Transcription</h3>".to_owned(),
            unread: true,
            created_at: chrono::Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let created = create(&db, user_id, user_id, "Message", model.description.clone()).await?;
        assert!(created.unread);
        assert_eq!(created.recipient_id, user_id);
        Ok(())
    }
}
