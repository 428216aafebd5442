//! Queries and updates for the pages table.

use super::error::Error;
use super::uuid_parse_str;
use entity::pages::{ActiveModel, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait, IntoActiveModel};

pub async fn create(db: &impl ConnectionTrait, title: &str) -> Result<Model, Error> {
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        title: Set(title.to_owned()),
        video_id: Set(None),
        transcription_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Same as [`find_by_id`] but takes the id in its textual form, as it appears
/// inside a record reference.
pub async fn find_by_id_str(db: &impl ConnectionTrait, id: &str) -> Result<Option<Model>, Error> {
    find_by_id(db, uuid_parse_str(id)?).await
}

pub async fn update_video_id(
    db: &impl ConnectionTrait,
    page: Model,
    video_id: Option<String>,
) -> Result<Model, Error> {
    debug!("Setting video id of page {} to {video_id:?}", page.id);

    let mut active_model = page.into_active_model();
    active_model.video_id = Set(video_id);
    active_model.updated_at = Set(chrono::Utc::now().into());

    Ok(active_model.update(db).await?)
}

pub async fn update_transcription(
    db: &impl ConnectionTrait,
    page: Model,
    transcription_id: Option<Id>,
) -> Result<Model, Error> {
    debug!(
        "Linking page {} to transcription {transcription_id:?}",
        page.id
    );

    let mut active_model = page.into_active_model();
    active_model.transcription_id = Set(transcription_id);
    active_model.updated_at = Set(chrono::Utc::now().into());

    Ok(active_model.update(db).await?)
}
