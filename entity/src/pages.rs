//! SeaORM Entity for the pages table, the content type editors attach
//! transcripts to. Registered for reference resolution as `cms:page`.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::pages::Model)]
#[sea_orm(schema_name = "transcript_attach", table_name = "pages")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub title: String,

    pub video_id: Option<String>,

    #[schema(value_type = Option<Uuid>)]
    pub transcription_id: Option<Id>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transcriptions::Entity",
        from = "Column::TranscriptionId",
        to = "super::transcriptions::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Transcriptions,
}

impl Related<super::transcriptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transcriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
