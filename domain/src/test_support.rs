//! In-memory collaborators for exercising the workflow without PostgreSQL,
//! the speech service or YouTube.

use crate::document::{DocumentStore, DocxBuilder, StoredDocument};
use crate::error::Error;
use crate::notification::NotificationSink;
use crate::reference::{FieldKind, FieldValue, RecordRegistry, RecordType};
use crate::transcription::{PendingTranscription, TranscriptStore};
use crate::workflow::{Collaborators, Settings, TranscriptWorkflow};
use crate::{notifications, transcriptions, users, Id};
use async_trait::async_trait;
use chrono::Utc;
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use entity_api::user::Role;
use speech_ai::traits::transcription::Provider;
use speech_ai::traits::video::VideoHost;
use speech_ai::types::transcription::Config as TranscriptionConfig;
use speech_ai::{
    AudioLookup, Error as SpeechAiError, Status, Transcription, VideoDetails, VideoLookup, Word,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A user allowed to request transcriptions.
pub fn editor() -> users::Model {
    let id = Id::new_v4();
    let now = Utc::now();
    users::Model {
        id,
        email: format!("editor-{id}@example.com"),
        display_name: Some("Editor".to_owned()),
        password: String::new(),
        role: Role::Editor,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// How [`InMemoryTranscriptStore`] answers `mark_completed`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    #[default]
    Succeed,
    /// The database rejects the update
    Fail,
    /// Another callback completes the record first
    LoseRace,
}

#[derive(Default)]
pub struct InMemoryTranscriptStore {
    records: Mutex<Vec<transcriptions::Model>>,
    completion: Mutex<Completion>,
}

impl InMemoryTranscriptStore {
    pub fn set_completion(&self, completion: Completion) {
        *lock(&self.completion) = completion;
    }

    pub fn insert_pending(&self, video_id: &str) -> transcriptions::Model {
        self.insert(video_id, None)
    }

    pub fn insert_completed(&self, video_id: &str, file: &str) -> transcriptions::Model {
        self.insert(video_id, Some(file.to_owned()))
    }

    pub fn all(&self) -> Vec<transcriptions::Model> {
        lock(&self.records).clone()
    }

    fn insert(&self, video_id: &str, file: Option<String>) -> transcriptions::Model {
        let now = Utc::now();
        let record = transcriptions::Model {
            id: Id::new_v4(),
            title: crate::transcription::title_for(video_id),
            video_id: Some(video_id.to_owned()),
            completed: file.is_some(),
            file,
            verified: false,
            target_reference: None,
            target_field: None,
            requested_by: None,
            created_at: now.into(),
            updated_at: now.into(),
        };
        lock(&self.records).push(record.clone());
        record
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn create_pending(
        &self,
        pending: PendingTranscription,
    ) -> Result<transcriptions::Model, Error> {
        let mut records = lock(&self.records);
        if records
            .iter()
            .any(|r| r.video_id.as_deref() == Some(pending.video_id.as_str()))
        {
            return Err(EntityApiError {
                source: None,
                error_kind: EntityApiErrorKind::UniqueViolation,
            }
            .into());
        }

        let now = Utc::now();
        let record = transcriptions::Model {
            id: Id::new_v4(),
            title: pending.title,
            video_id: Some(pending.video_id),
            file: None,
            verified: false,
            completed: false,
            target_reference: pending.target_reference,
            target_field: pending.target_field,
            requested_by: pending.requested_by,
            created_at: now.into(),
            updated_at: now.into(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_video_id(
        &self,
        video_id: &str,
        completed: bool,
    ) -> Result<Option<transcriptions::Model>, Error> {
        Ok(lock(&self.records)
            .iter()
            .find(|r| r.video_id.as_deref() == Some(video_id) && r.completed == completed)
            .cloned())
    }

    async fn find_any_by_video_id(
        &self,
        video_id: &str,
    ) -> Result<Option<transcriptions::Model>, Error> {
        Ok(lock(&self.records)
            .iter()
            .find(|r| r.video_id.as_deref() == Some(video_id))
            .cloned())
    }

    async fn mark_completed(
        &self,
        video_id: &str,
        file: String,
    ) -> Result<transcriptions::Model, Error> {
        let completion = *lock(&self.completion);
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.video_id.as_deref() == Some(video_id) && !r.completed)
            .ok_or_else(Error::not_found)?;
        match completion {
            Completion::Succeed => {}
            Completion::Fail => {
                return Err(EntityApiError {
                    source: None,
                    error_kind: EntityApiErrorKind::SystemError,
                }
                .into())
            }
            Completion::LoseRace => {
                record.completed = true;
                record.file = Some(file);
                return Err(Error::not_found());
            }
        }
        record.completed = true;
        record.file = Some(file);
        record.updated_at = Utc::now().into();
        Ok(record.clone())
    }

    async fn delete_pending(&self, video_id: &str) -> Result<u64, Error> {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|r| r.completed || r.video_id.as_deref() != Some(video_id));
        Ok((before - records.len()) as u64)
    }

    async fn in_flight_video_ids(&self) -> Result<Vec<String>, Error> {
        Ok(lock(&self.records)
            .iter()
            .filter(|r| !r.completed)
            .filter_map(|r| r.video_id.clone())
            .collect())
    }
}

/// Pages as `cms:page` records, with a `video_id` and a `transcription` field.
pub struct InMemoryRecordType {
    records: Mutex<HashMap<String, (Option<String>, Option<Id>)>>,
}

impl InMemoryRecordType {
    pub fn pages() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, id: &str) {
        lock(&self.records).insert(id.to_owned(), (None, None));
    }

    pub fn set(&self, id: &str, video_id: Option<&str>, transcription: Option<Id>) {
        lock(&self.records).insert(id.to_owned(), (video_id.map(str::to_owned), transcription));
    }

    pub fn video_id_of(&self, id: &str) -> Option<String> {
        lock(&self.records).get(id).and_then(|(video_id, _)| video_id.clone())
    }

    pub fn transcription_of(&self, id: &str) -> Option<Id> {
        lock(&self.records).get(id).and_then(|(_, transcription)| *transcription)
    }
}

#[async_trait]
impl RecordType for InMemoryRecordType {
    fn namespace(&self) -> &str {
        "cms"
    }

    fn type_name(&self) -> &str {
        "page"
    }

    fn field_kind(&self, field: &str) -> Option<FieldKind> {
        match field {
            "video_id" => Some(FieldKind::VideoId),
            "transcription" => Some(FieldKind::TranscriptionLink),
            _ => None,
        }
    }

    async fn exists(&self, id: &str) -> Result<bool, Error> {
        Ok(lock(&self.records).contains_key(id))
    }

    async fn read_field(&self, id: &str, field: &str) -> Result<FieldValue, Error> {
        let records = lock(&self.records);
        let (video_id, transcription) = records.get(id).ok_or_else(Error::not_found)?;
        match self.field_kind(field) {
            Some(FieldKind::VideoId) => Ok(FieldValue::VideoId(video_id.clone())),
            Some(FieldKind::TranscriptionLink) => Ok(FieldValue::TranscriptionLink(*transcription)),
            None => Err(Error::other(format!("page has no field {field}"))),
        }
    }

    async fn write_field(&self, id: &str, _field: &str, value: FieldValue) -> Result<(), Error> {
        let mut records = lock(&self.records);
        let (video_id, transcription) = records.get_mut(id).ok_or_else(Error::not_found)?;
        match value {
            FieldValue::VideoId(value) => *video_id = value,
            FieldValue::TranscriptionLink(value) => *transcription = value,
        }
        Ok(())
    }

    fn edit_url(&self, id: &str) -> String {
        format!("/admin/pages/{id}/edit")
    }
}

/// Keeps every notification in memory.
#[derive(Default)]
pub struct RecordingNotificationSink {
    notifications: Mutex<Vec<notifications::Model>>,
}

impl RecordingNotificationSink {
    /// Stores an unread notification for `recipient_id` and returns its id.
    pub fn insert(&self, recipient_id: Id) -> Id {
        let notification = notification(recipient_id, recipient_id, "New Transcription", String::new());
        let id = notification.id;
        lock(&self.notifications).push(notification);
        id
    }

    pub fn sent(&self) -> Vec<notifications::Model> {
        lock(&self.notifications).clone()
    }
}

fn notification(actor_id: Id, recipient_id: Id, verb: &str, description: String) -> notifications::Model {
    notifications::Model {
        id: Id::new_v4(),
        recipient_id,
        actor_id,
        verb: verb.to_owned(),
        description,
        unread: true,
        created_at: Utc::now().into(),
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn send(
        &self,
        actor_id: Id,
        recipient_id: Id,
        verb: &str,
        description: String,
    ) -> Result<(), Error> {
        lock(&self.notifications).push(notification(actor_id, recipient_id, verb, description));
        Ok(())
    }

    async fn delete(&self, id: Id, recipient_id: Id) -> Result<bool, Error> {
        let mut notifications = lock(&self.notifications);
        let before = notifications.len();
        notifications.retain(|n| !(n.id == id && n.recipient_id == recipient_id));
        Ok(notifications.len() < before)
    }

    async fn unread(&self, recipient_id: Id) -> Result<Vec<notifications::Model>, Error> {
        Ok(lock(&self.notifications)
            .iter()
            .filter(|n| n.recipient_id == recipient_id && n.unread)
            .cloned()
            .collect())
    }
}

/// Keeps documents in memory and serves them under `/media/documents`.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryDocumentStore {
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.documents).clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn save(&self, name: &str, bytes: Vec<u8>) -> Result<StoredDocument, Error> {
        crate::document::validate_document_name(name)?;
        lock(&self.documents).push((name.to_owned(), bytes));
        let reference = format!("documents/{name}");
        Ok(StoredDocument {
            url: self.url(&reference),
            reference,
        })
    }

    async fn remove(&self, reference: &str) -> Result<(), Error> {
        let name = crate::document::document_name_of(reference)?;
        lock(&self.documents).retain(|(saved, _)| saved != name);
        Ok(())
    }

    fn url(&self, reference: &str) -> String {
        format!("/media/{reference}")
    }
}

/// Accepts every job and answers fetches from prepared results.
#[derive(Default)]
pub struct FakeProvider {
    jobs: Mutex<HashMap<String, Transcription>>,
    submissions: Mutex<Vec<TranscriptionConfig>>,
}

impl FakeProvider {
    /// Makes job `id` a finished transcription of `words`.
    pub fn complete(&self, id: &str, words: Vec<Word>) {
        let mut job = Transcription::queued(id);
        job.status = Status::Completed;
        job.text = Some(
            words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        job.words = words;
        lock(&self.jobs).insert(id.to_owned(), job);
    }

    /// Makes job `id` a failed transcription.
    pub fn fail(&self, id: &str, message: &str) {
        let mut job = Transcription::queued(id);
        job.status = Status::Failed;
        job.error_message = Some(message.to_owned());
        lock(&self.jobs).insert(id.to_owned(), job);
    }

    pub fn submissions(&self) -> Vec<TranscriptionConfig> {
        lock(&self.submissions).clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn create_transcription(
        &self,
        config: TranscriptionConfig,
    ) -> Result<Transcription, SpeechAiError> {
        let mut submissions = lock(&self.submissions);
        submissions.push(config);
        Ok(Transcription::queued(format!("job-{}", submissions.len())))
    }

    async fn get_transcription(&self, transcription_id: &str) -> Result<Transcription, SpeechAiError> {
        lock(&self.jobs)
            .get(transcription_id)
            .cloned()
            .ok_or_else(|| SpeechAiError::NotFound(format!("No job {transcription_id}")))
    }
}

/// Reports every video as public with an audio stream unless told otherwise.
#[derive(Default)]
pub struct FakeVideoHost {
    lookups: Mutex<HashMap<String, VideoLookup>>,
    audio: Mutex<HashMap<String, AudioLookup>>,
}

impl FakeVideoHost {
    pub fn set_lookup(&self, video_id: &str, lookup: VideoLookup) {
        lock(&self.lookups).insert(video_id.to_owned(), lookup);
    }

    pub fn set_audio(&self, video_id: &str, audio: AudioLookup) {
        lock(&self.audio).insert(video_id.to_owned(), audio);
    }
}

#[async_trait]
impl VideoHost for FakeVideoHost {
    async fn lookup_video(&self, video_id: &str) -> Result<VideoLookup, SpeechAiError> {
        Ok(lock(&self.lookups)
            .get(video_id)
            .cloned()
            .unwrap_or_else(|| {
                VideoLookup::Available(VideoDetails {
                    id: video_id.to_owned(),
                    title: format!("Video {video_id}"),
                    channel_name: "Channel".to_owned(),
                    thumbnail_url: Some(format!("https://i.ytimg.com/vi/{video_id}/mqdefault.jpg")),
                    duration_seconds: 90,
                })
            }))
    }

    async fn audio_stream(&self, video_id: &str) -> Result<AudioLookup, SpeechAiError> {
        Ok(lock(&self.audio)
            .get(video_id)
            .cloned()
            .unwrap_or_else(|| {
                AudioLookup::Stream(format!("https://audio.example.com/{video_id}.m4a"))
            }))
    }
}

/// The in-memory collaborators of one test, shared by every workflow it builds.
pub struct Fixture {
    pub pages: Arc<InMemoryRecordType>,
    pub store: Arc<InMemoryTranscriptStore>,
    pub notifications: Arc<RecordingNotificationSink>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub provider: Arc<FakeProvider>,
    pub video_host: Arc<FakeVideoHost>,
    provider_override: Option<Arc<dyn Provider>>,
    video_host_override: Option<Arc<dyn VideoHost>>,
    webhook_secret: Option<String>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(InMemoryRecordType::pages()),
            store: Arc::default(),
            notifications: Arc::default(),
            documents: Arc::default(),
            provider: Arc::default(),
            video_host: Arc::default(),
            provider_override: None,
            video_host_override: None,
            webhook_secret: None,
        }
    }

    /// Uses `provider` instead of the [`FakeProvider`].
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    /// Uses `video_host` instead of the [`FakeVideoHost`].
    pub fn with_video_host(mut self, video_host: Arc<dyn VideoHost>) -> Self {
        self.video_host_override = Some(video_host);
        self
    }

    pub fn with_webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(secret.to_owned());
        self
    }

    pub fn settings(&self) -> Settings {
        Settings {
            base_url: "https://cms.example.com".to_owned(),
            secret_key: "test-secret".to_owned(),
            capability_token_ttl: Duration::from_secs(3600),
            webhook_secret: self.webhook_secret.clone(),
            transcription_edit_url_path: "/admin/transcriptions/{id}/edit".to_owned(),
        }
    }

    pub fn workflow(&self) -> TranscriptWorkflow {
        let provider: Arc<dyn Provider> = match &self.provider_override {
            Some(provider) => Arc::clone(provider),
            None => self.provider.clone(),
        };
        let video_host: Arc<dyn VideoHost> = match &self.video_host_override {
            Some(video_host) => Arc::clone(video_host),
            None => self.video_host.clone(),
        };

        TranscriptWorkflow::new(
            Collaborators {
                store: self.store.clone(),
                records: RecordRegistry::new().register(self.pages.clone()),
                notifications: self.notifications.clone(),
                documents: self.documents.clone(),
                document_builder: Arc::new(DocxBuilder),
                provider,
                video_host,
            },
            self.settings(),
        )
    }
}
