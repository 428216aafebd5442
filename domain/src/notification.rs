//! Notifications telling editors how their transcription request ended.

use crate::document::escape_xml as escape_html;
use crate::error::Error;
use crate::{notifications, Id};
use async_trait::async_trait;
use entity_api::{notification, user};
use log::*;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub const SUCCESS_VERB: &str = "New Transcription";
pub const ERROR_VERB: &str = "Error During Transcription Process";

/// Delivery of messages to users.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        actor_id: Id,
        recipient_id: Id,
        verb: &str,
        description: String,
    ) -> Result<(), Error>;

    /// Deletes a notification of `recipient_id`, returning `false` when it does not exist.
    async fn delete(&self, id: Id, recipient_id: Id) -> Result<bool, Error>;

    async fn unread(&self, recipient_id: Id) -> Result<Vec<notifications::Model>, Error>;
}

pub struct DatabaseNotificationSink {
    db: Arc<DatabaseConnection>,
}

impl DatabaseNotificationSink {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationSink for DatabaseNotificationSink {
    async fn send(
        &self,
        actor_id: Id,
        recipient_id: Id,
        verb: &str,
        description: String,
    ) -> Result<(), Error> {
        // Fails with NotFound for unknown users
        user::find_by_id(self.db.as_ref(), recipient_id).await?;
        notification::create(self.db.as_ref(), actor_id, recipient_id, verb, description).await?;
        Ok(())
    }

    async fn delete(&self, id: Id, recipient_id: Id) -> Result<bool, Error> {
        Ok(notification::delete_for_recipient(self.db.as_ref(), id, recipient_id).await?)
    }

    async fn unread(&self, recipient_id: Id) -> Result<Vec<notifications::Model>, Error> {
        Ok(notification::find_unread_by_recipient(self.db.as_ref(), recipient_id).await?)
    }
}

/// Final link of a notification: the document on success, the source video otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<'a> {
    Completed { document_url: &'a str },
    Failed { video_url: &'a str },
}

#[derive(Debug, Clone)]
pub struct Message<'a> {
    pub outcome: Outcome<'a>,
    pub edit_url: &'a str,
    pub extra_text: Option<&'a str>,
}

impl Message<'_> {
    pub fn verb(&self) -> &'static str {
        match self.outcome {
            Outcome::Completed { .. } => SUCCESS_VERB,
            Outcome::Failed { .. } => ERROR_VERB,
        }
    }

    /// Renders the HTML fragment shown in the notification popup.
    pub fn render(&self) -> String {
        let (class, link, label) = match self.outcome {
            Outcome::Completed { document_url } => (
                "",
                document_url,
                r#"Download Transcription File <i class="bi bi-download"></i>"#,
            ),
            Outcome::Failed { video_url } => (" error", video_url, "Check video"),
        };

        format!(
            r#"<div class="notification-header{class}"><p class="notification-header-text"><i class="bi bi-square-fill"></i><b style="margin: auto 0;">{verb}</b></p><p class="notification-close" data-action_url="/delete_notification"><i class="bi bi-x"></i></p></div><div class="notification-message{class}"><p>{extra}</p><a target="_blank" href="{edit_url}">Check Page</a> <a target="_blank" href="{link}">{label}</a></div>"#,
            verb = self.verb(),
            extra = escape_html(self.extra_text.unwrap_or_default()),
            edit_url = escape_html(self.edit_url),
            link = escape_html(link),
        )
    }
}

/// Sends `message` from the user to themselves. Delivery problems are logged, not returned.
pub(crate) async fn notify(sink: &dyn NotificationSink, user_id: Id, message: Message<'_>) {
    let verb = message.verb();
    if let Err(err) = sink.send(user_id, user_id, verb, message.render()).await {
        warn!("Could not deliver \"{verb}\" notification to user {user_id}: {err:?}");
    }
}
