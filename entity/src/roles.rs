use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Editorial role of a user. Everything above `User` may request transcriptions.
#[derive(
    Debug,
    Clone,
    Eq,
    PartialEq,
    EnumIter,
    Deserialize,
    Default,
    Serialize,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "role")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    #[default]
    User,
    #[sea_orm(string_value = "editor")]
    Editor,
    #[sea_orm(string_value = "moderator")]
    Moderator,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Whether the role belongs to the editorial staff allowed to attach transcripts.
    pub fn is_editorial(&self) -> bool {
        matches!(self, Role::Editor | Role::Moderator | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(fmt, "user"),
            Role::Editor => write!(fmt, "editor"),
            Role::Moderator => write!(fmt, "moderator"),
            Role::Admin => write!(fmt, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_staff_roles_are_editorial() {
        assert!(!Role::User.is_editorial());
        assert!(Role::Editor.is_editorial());
        assert!(Role::Moderator.is_editorial());
        assert!(Role::Admin.is_editorial());
    }
}
