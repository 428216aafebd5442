use chrono::Utc;
use log::*;
use password_auth::generate_hash;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub use entity::{notifications, pages, roles, transcriptions, users, Id};

pub mod error;
pub mod notification;
pub mod page;
pub mod transcription;
pub mod user;

pub(crate) fn uuid_parse_str(uuid_str: &str) -> Result<Id, error::Error> {
    Id::parse_str(uuid_str).map_err(|_| error::Error {
        source: None,
        error_kind: error::EntityApiErrorKind::InvalidQueryTerm,
    })
}

/// Inserts an editor account, a plain user account and a couple of pages that
/// transcripts can be attached to.
pub async fn seed_database(db: &DatabaseConnection) -> Result<(), error::Error> {
    let now = Utc::now();

    let editor = users::ActiveModel {
        id: Set(Id::new_v4()),
        email: Set("editor@transcript-attach.local".to_owned()),
        display_name: Set(Some("Editor".to_owned())),
        password: Set(generate_hash("password")),
        role: Set(roles::Role::Editor),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    info!("Seeded editor user {}", editor.email);

    let reader = users::ActiveModel {
        id: Set(Id::new_v4()),
        email: Set("reader@transcript-attach.local".to_owned()),
        display_name: Set(Some("Reader".to_owned())),
        password: Set(generate_hash("password")),
        role: Set(roles::Role::User),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    info!("Seeded reader user {}", reader.email);

    for title in ["Welcome", "Conference keynote"] {
        let page = pages::ActiveModel {
            id: Set(Id::new_v4()),
            title: Set(title.to_owned()),
            video_id: Set(None),
            transcription_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        info!("Seeded page \"{}\" (cms:page:{})", page.title, page.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_parse_str_parses_valid_uuid() {
        let uuid_str = "a98c3295-0933-44cb-89db-7db0f7250fb1";
        let uuid = uuid_parse_str(uuid_str).unwrap();
        assert_eq!(uuid.to_string(), uuid_str);
    }

    #[test]
    fn uuid_parse_str_returns_invalid_query_term_for_garbage() {
        let result = uuid_parse_str("42");
        assert_eq!(
            result.unwrap_err().error_kind,
            error::EntityApiErrorKind::InvalidQueryTerm
        );
    }
}
