//! Resolution of `namespace:type:id` references to the records transcripts get attached to.
//!
//! Every record type that can receive a transcript registers a [`RecordType`]
//! under its `(namespace, type)` pair. A [`RecordRegistry`] parses reference
//! strings, finds the registered type and confirms the record exists. Field
//! checks are answered from the type's declared schema.

use crate::error::{Error, TranscriptionErrorKind};
use crate::Id;
use async_trait::async_trait;
use log::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a record field holds, as far as transcripts are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stores the video token the transcript is made from
    VideoId,
    /// Links to a transcript record
    TranscriptionLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    VideoId(Option<String>),
    TranscriptionLink(Option<Id>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::VideoId(_) => FieldKind::VideoId,
            FieldValue::TranscriptionLink(_) => FieldKind::TranscriptionLink,
        }
    }
}

/// A parsed `namespace:type:id` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReference {
    pub namespace: String,
    pub type_name: String,
    pub id: String,
}

impl RecordReference {
    pub fn parse(value: &str) -> Result<Self, Error> {
        let mut parts = value.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(type_name), Some(id), None)
                if !namespace.is_empty() && !type_name.is_empty() && !id.is_empty() =>
            {
                Ok(RecordReference {
                    namespace: namespace.to_owned(),
                    type_name: type_name.to_owned(),
                    id: id.to_owned(),
                })
            }
            _ => {
                debug!("Malformed record reference: {value:?}");
                Err(Error::transcription(TranscriptionErrorKind::ReferenceNotFound))
            }
        }
    }
}

impl fmt::Display for RecordReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.type_name, self.id)
    }
}

/// A kind of record transcripts can be attached to.
#[async_trait]
pub trait RecordType: Send + Sync {
    fn namespace(&self) -> &str;

    fn type_name(&self) -> &str;

    /// Declared schema: the kind of `field`, or `None` when the type has no such field.
    fn field_kind(&self, field: &str) -> Option<FieldKind>;

    async fn exists(&self, id: &str) -> Result<bool, Error>;

    async fn read_field(&self, id: &str, field: &str) -> Result<FieldValue, Error>;

    async fn write_field(&self, id: &str, field: &str, value: FieldValue) -> Result<(), Error>;

    /// Link to the editing view of the record.
    fn edit_url(&self, id: &str) -> String;
}

#[derive(Default, Clone)]
pub struct RecordRegistry {
    types: HashMap<(String, String), Arc<dyn RecordType>>,
}

impl RecordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, record_type: Arc<dyn RecordType>) -> Self {
        let key = (
            record_type.namespace().to_owned(),
            record_type.type_name().to_owned(),
        );
        self.types.insert(key, record_type);
        self
    }

    /// Resolves a reference string to an existing record.
    pub async fn resolve(&self, reference: &str) -> Result<ResolvedRecord, Error> {
        let reference = RecordReference::parse(reference)?;
        let record_type = self
            .types
            .get(&(reference.namespace.clone(), reference.type_name.clone()))
            .cloned()
            .ok_or_else(|| {
                debug!("No record type registered for {reference}");
                Error::transcription(TranscriptionErrorKind::ReferenceNotFound)
            })?;

        if !record_type.exists(&reference.id).await? {
            debug!("Record {reference} does not exist");
            return Err(Error::transcription(
                TranscriptionErrorKind::ReferenceNotFound,
            ));
        }

        Ok(ResolvedRecord {
            reference,
            record_type,
        })
    }
}

impl fmt::Debug for RecordRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Handle on a record that was found through the registry.
#[derive(Clone)]
pub struct ResolvedRecord {
    reference: RecordReference,
    record_type: Arc<dyn RecordType>,
}

impl ResolvedRecord {
    pub fn reference(&self) -> &RecordReference {
        &self.reference
    }

    /// Confirms the record exposes `field` with the expected kind.
    pub fn require_field(&self, field: &str, kind: FieldKind) -> Result<(), Error> {
        match self.record_type.field_kind(field) {
            Some(found) if found == kind => Ok(()),
            _ => {
                debug!("{} has no {kind:?} field named {field:?}", self.reference);
                Err(Error::transcription(TranscriptionErrorKind::FieldMissing(
                    field.to_owned(),
                )))
            }
        }
    }

    pub async fn read(&self, field: &str) -> Result<FieldValue, Error> {
        self.record_type
            .read_field(&self.reference.id, field)
            .await
    }

    pub async fn write(&self, field: &str, value: FieldValue) -> Result<(), Error> {
        self.require_field(field, value.kind())?;
        self.record_type
            .write_field(&self.reference.id, field, value)
            .await
    }

    pub fn edit_url(&self) -> String {
        self.record_type.edit_url(&self.reference.id)
    }
}
