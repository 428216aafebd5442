//! The transcript attachment workflow and the collaborators it runs against.
//!
//! A transcript is attached in three steps, each handled by its own module:
//! [`validate`](crate::validation) checks a video and hands out a capability
//! token, [`request`](crate::request) creates the pending record and submits
//! the speech job, and [`receive`](crate::receipt) finishes or aborts the record
//! when the speech service calls back.

use crate::capability_token::CapabilityTokenIssuer;
use crate::document::{DocumentBuilder, DocumentStore, DocxBuilder, FileSystemDocumentStore};
use crate::error::Error;
use crate::gateway::assembly_ai::AssemblyAiClient;
use crate::gateway::youtube::YouTubeDataApiClient;
use crate::gateway::yt_dlp::YtDlpExtractor;
use crate::gateway::YouTubeVideoHost;
use crate::notification::{DatabaseNotificationSink, NotificationSink};
use crate::page::PageRecordType;
use crate::reference::RecordRegistry;
use crate::transcription::{DatabaseTranscriptStore, TranscriptStore};
use crate::webhook::SharedSecretValidator;
use crate::{notifications, Id};
use log::*;
use sea_orm::DatabaseConnection;
use service::config::Config;
use speech_ai::traits::transcription::Provider;
use speech_ai::traits::video::VideoHost;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Everything the workflow reads from or writes to.
pub struct Collaborators {
    pub store: Arc<dyn TranscriptStore>,
    pub records: RecordRegistry,
    pub notifications: Arc<dyn NotificationSink>,
    pub documents: Arc<dyn DocumentStore>,
    pub document_builder: Arc<dyn DocumentBuilder>,
    pub provider: Arc<dyn Provider>,
    pub video_host: Arc<dyn VideoHost>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Externally reachable base URL the speech service calls back on
    pub base_url: String,
    pub secret_key: String,
    pub capability_token_ttl: Duration,
    pub webhook_secret: Option<String>,
    /// Edit link template of transcript records, `{id}` is replaced by the record id
    pub transcription_edit_url_path: String,
}

pub struct TranscriptWorkflow {
    pub(crate) store: Arc<dyn TranscriptStore>,
    pub(crate) records: RecordRegistry,
    pub(crate) notifications: Arc<dyn NotificationSink>,
    pub(crate) documents: Arc<dyn DocumentStore>,
    pub(crate) document_builder: Arc<dyn DocumentBuilder>,
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) video_host: Arc<dyn VideoHost>,
    pub(crate) tokens: CapabilityTokenIssuer,
    pub(crate) webhook: Option<SharedSecretValidator>,
    pub(crate) base_url: String,
    pub(crate) transcription_edit_url_path: String,
}

/// What `/transcription_data` reports about a transcript record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionData {
    pub id: Id,
    pub title: String,
    pub edit_url: String,
}

impl TranscriptWorkflow {
    pub fn new(collaborators: Collaborators, settings: Settings) -> Self {
        Self {
            store: collaborators.store,
            records: collaborators.records,
            notifications: collaborators.notifications,
            documents: collaborators.documents,
            document_builder: collaborators.document_builder,
            provider: collaborators.provider,
            video_host: collaborators.video_host,
            tokens: CapabilityTokenIssuer::new(
                &settings.secret_key,
                settings.capability_token_ttl,
            ),
            webhook: settings
                .webhook_secret
                .filter(|secret| !secret.is_empty())
                .map(SharedSecretValidator::new),
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            transcription_edit_url_path: settings.transcription_edit_url_path,
        }
    }

    /// Wires the workflow to PostgreSQL, the local media directory, AssemblyAI and YouTube.
    pub fn from_config(config: &Config, db: Arc<DatabaseConnection>) -> Result<Self, Error> {
        let api_key = config.assembly_ai_api_key().unwrap_or_else(|| {
            warn!("ASSEMBLY_AI_API_KEY is not set, transcription requests will be rejected");
            String::new()
        });
        let provider = AssemblyAiClient::new(&api_key, config.assembly_ai_base_url())?;

        let youtube_api_key = config.youtube_data_api_key().unwrap_or_else(|| {
            warn!("YOUTUBE_DATA_API_KEY is not set, video validation will fail");
            String::new()
        });
        let region_code = config.youtube_region_code();
        let video_host = YouTubeVideoHost::new(
            YouTubeDataApiClient::new(
                &youtube_api_key,
                config.youtube_data_api_base_url(),
                region_code.as_deref(),
            )?,
            YtDlpExtractor::new(config.yt_dlp_path()),
        );

        let records = RecordRegistry::new().register(Arc::new(PageRecordType::new(
            Arc::clone(&db),
            config.page_edit_url_path(),
        )));

        let collaborators = Collaborators {
            store: Arc::new(DatabaseTranscriptStore::new(Arc::clone(&db))),
            records,
            notifications: Arc::new(DatabaseNotificationSink::new(Arc::clone(&db))),
            documents: Arc::new(FileSystemDocumentStore::new(
                config.media_root(),
                config.media_url(),
            )),
            document_builder: Arc::new(DocxBuilder),
            provider: Arc::new(provider),
            video_host: Arc::new(video_host),
        };

        let settings = Settings {
            base_url: config.base_url().to_owned(),
            secret_key: config.secret_key().to_owned(),
            capability_token_ttl: Duration::from_secs(config.capability_token_ttl_secs),
            webhook_secret: config.webhook_secret().map(str::to_owned),
            transcription_edit_url_path: config.transcription_edit_url_path().to_owned(),
        };

        Ok(Self::new(collaborators, settings))
    }

    /// Checks the shared secret of a callback. Always passes when no secret is configured.
    pub fn authorize_callback(&self, presented: Option<&str>) -> bool {
        match &self.webhook {
            Some(validator) => validator.validate(presented),
            None => true,
        }
    }

    /// Video ids of all transcriptions still being produced, each mapped to `true`.
    pub async fn processing_transcriptions(&self) -> Result<BTreeMap<String, bool>, Error> {
        Ok(self
            .store
            .in_flight_video_ids()
            .await?
            .into_iter()
            .map(|video_id| (video_id, true))
            .collect())
    }

    /// Looks up the transcript record of a video, pending or finished.
    ///
    /// Returns `Ok(None)` for malformed video ids and a not found error for
    /// well formed ids without any record.
    pub async fn transcription_data(
        &self,
        video_id: &str,
    ) -> Result<Option<TranscriptionData>, Error> {
        if !crate::video_id::is_valid(video_id) {
            return Ok(None);
        }

        let transcription = self
            .store
            .find_any_by_video_id(video_id)
            .await?
            .ok_or_else(Error::not_found)?;

        Ok(Some(TranscriptionData {
            edit_url: self.transcription_edit_url(transcription.id),
            id: transcription.id,
            title: transcription.title,
        }))
    }

    pub async fn delete_notification(
        &self,
        notification_id: Id,
        recipient_id: Id,
    ) -> Result<bool, Error> {
        self.notifications.delete(notification_id, recipient_id).await
    }

    pub async fn unread_notifications(
        &self,
        recipient_id: Id,
    ) -> Result<Vec<notifications::Model>, Error> {
        self.notifications.unread(recipient_id).await
    }

    pub(crate) fn transcription_edit_url(&self, id: Id) -> String {
        self.transcription_edit_url_path
            .replace("{id}", &id.to_string())
    }

    pub(crate) fn webhook_url(&self, video_id: &str, user_id: Id) -> String {
        format!(
            "{}/receive_transcription/{video_id}/{user_id}",
            self.base_url
        )
    }
}
