//! SeaORM Entity for the transcriptions table.
//!
//! A row is created with `completed = false` when a transcription job is
//! submitted and becomes immutable for the workflow once `completed = true`.
//! `target_reference` and `target_field` remember which record field should
//! receive the finished transcript.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::transcriptions::Model)]
#[sea_orm(schema_name = "transcript_attach", table_name = "transcriptions")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub title: String,

    /// External video token the transcript was produced from
    #[sea_orm(unique)]
    pub video_id: Option<String>,

    /// Path of the generated document, relative to the media root
    pub file: Option<String>,

    /// Set by editors once the generated text has been reviewed
    pub verified: bool,

    /// Set by the workflow once the document has been attached
    pub completed: bool,

    /// `namespace:type:id` of the record waiting for this transcript
    pub target_reference: Option<String>,

    /// Field of the target record that links to this transcript
    pub target_field: Option<String>,

    #[schema(value_type = Option<Uuid>)]
    pub requested_by: Option<Id>,

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
        belongs_to = "super::users::Entity",
        from = "Column::RequestedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Users,

    #[sea_orm(has_many = "super::pages::Entity")]
    Pages,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::pages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
