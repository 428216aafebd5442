//! The `cms:page` record type, backed by the pages table.

use crate::error::{Error, TranscriptionErrorKind};
use crate::reference::{FieldKind, FieldValue, RecordType};
use crate::pages;
use async_trait::async_trait;
use entity_api::error::EntityApiErrorKind;
use entity_api::page;
use log::*;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub const NAMESPACE: &str = "cms";
pub const TYPE_NAME: &str = "page";
pub const VIDEO_ID_FIELD: &str = "video_id";
pub const TRANSCRIPTION_FIELD: &str = "transcription";

pub struct PageRecordType {
    db: Arc<DatabaseConnection>,
    /// Edit link template, `{id}` is replaced by the page id
    edit_url_path: String,
}

impl PageRecordType {
    pub fn new(db: Arc<DatabaseConnection>, edit_url_path: &str) -> Self {
        Self {
            db,
            edit_url_path: edit_url_path.to_owned(),
        }
    }

    async fn find(&self, id: &str) -> Result<Option<pages::Model>, Error> {
        match page::find_by_id_str(self.db.as_ref(), id).await {
            Ok(found) => Ok(found),
            // Not a uuid, so no such page
            Err(err) if err.error_kind == EntityApiErrorKind::InvalidQueryTerm => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &str) -> Result<pages::Model, Error> {
        self.find(id).await?.ok_or_else(|| {
            debug!("Page {id} disappeared");
            Error::transcription(TranscriptionErrorKind::ReferenceNotFound)
        })
    }
}

fn field_missing(field: &str) -> Error {
    Error::transcription(TranscriptionErrorKind::FieldMissing(field.to_owned()))
}

#[async_trait]
impl RecordType for PageRecordType {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn field_kind(&self, field: &str) -> Option<FieldKind> {
        match field {
            VIDEO_ID_FIELD => Some(FieldKind::VideoId),
            TRANSCRIPTION_FIELD => Some(FieldKind::TranscriptionLink),
            _ => None,
        }
    }

    async fn exists(&self, id: &str) -> Result<bool, Error> {
        Ok(self.find(id).await?.is_some())
    }

    async fn read_field(&self, id: &str, field: &str) -> Result<FieldValue, Error> {
        let page = self.get(id).await?;
        match field {
            VIDEO_ID_FIELD => Ok(FieldValue::VideoId(page.video_id)),
            TRANSCRIPTION_FIELD => Ok(FieldValue::TranscriptionLink(page.transcription_id)),
            _ => Err(field_missing(field)),
        }
    }

    async fn write_field(&self, id: &str, field: &str, value: FieldValue) -> Result<(), Error> {
        let page = self.get(id).await?;
        match (field, value) {
            (VIDEO_ID_FIELD, FieldValue::VideoId(video_id)) => {
                page::update_video_id(self.db.as_ref(), page, video_id).await?;
            }
            (TRANSCRIPTION_FIELD, FieldValue::TranscriptionLink(transcription_id)) => {
                page::update_transcription(self.db.as_ref(), page, transcription_id).await?;
            }
            _ => return Err(field_missing(field)),
        }
        Ok(())
    }

    fn edit_url(&self, id: &str) -> String {
        self.edit_url_path.replace("{id}", id)
    }
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::Id;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn page_model(id: Id) -> pages::Model {
        let now = Utc::now();
        pages::Model {
            id,
            title: "Keynote".to_owned(),
            video_id: Some("aaaaaaaaaaa".to_owned()),
            transcription_id: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn non_uuid_ids_do_not_exist() -> Result<(), Error> {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let pages = PageRecordType::new(db, "/admin/pages/{id}/edit");

        assert!(!pages.exists("42").await?);
        Ok(())
    }

    #[tokio::test]
    async fn read_field_returns_stored_video_id() -> Result<(), Error> {
        let id = Id::new_v4();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(vec![vec![page_model(id)]])
                .into_connection(),
        );
        let pages = PageRecordType::new(db, "/admin/pages/{id}/edit");

        let value = pages.read_field(&id.to_string(), VIDEO_ID_FIELD).await?;

        assert_eq!(value, FieldValue::VideoId(Some("aaaaaaaaaaa".to_owned())));
        Ok(())
    }

    #[tokio::test]
    async fn edit_url_fills_in_the_id() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let pages = PageRecordType::new(db, "/admin/pages/{id}/edit");

        assert_eq!(pages.edit_url("abc"), "/admin/pages/abc/edit");
        assert_eq!(pages.field_kind("body"), None);
    }
}
