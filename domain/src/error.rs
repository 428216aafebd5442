//! Error types for the `domain` layer.
use entity::Id;
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use serde::Serialize;
use speech_ai::{Error as SpeechAiError, Unavailability};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `entity_api`, and `web` is dependent on `domain`.
/// but `web` should not be dependent, directly, on `entity_api`. Each layer is free to define its own
/// error kinds to whatever richeness needed at that layer. Ultimately the various `error_kind`s are used
/// by `web` to return appropriate HTTP status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    Transcription(TranscriptionErrorKind),
}
/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Enum representing the various kinds of entity errors that can bubble up from the "Entity" layer (`entity_api` and `entity`).
/// These errors are translated from the `entity_api` layer to the `domain` layer and reduced to a subset of error kinds
/// that are relevant to the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    Unauthenticated,
    Conflict,
    DbTransaction,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain`` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

/// Failures of the transcript attachment workflow itself.
#[derive(Debug, PartialEq)]
pub enum TranscriptionErrorKind {
    /// Malformed `namespace:type:id`, unknown record type or missing record
    ReferenceNotFound,
    /// The target record exists but has no such field
    FieldMissing(String),
    /// Not an 11 character video token
    InvalidFormat,
    /// A finished transcript already exists for the video
    DuplicateCompleted(ExistingTranscription),
    /// A transcript for the video is still being produced
    InProgress,
    /// The video host reports the video as unusable
    RemoteUnavailable(Unavailability),
    NoAudioStream,
    /// The capability token does not match the user and video, or expired
    CapabilityRejected,
    /// The speech service did not accept the job
    SubmissionFailed,
    CallbackMalformed,
    CallbackProcessingFailed,
}

/// Enough of a finished transcript for the editor to link it instead of requesting a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingTranscription {
    pub id: Id,
    pub title: String,
    pub edit_url: String,
}

impl Error {
    pub fn transcription(kind: TranscriptionErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Transcription(kind),
        }
    }

    pub(crate) fn other(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(message.into())),
        }
    }

    pub(crate) fn not_found() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::NotFound,
            )),
        }
    }

    /// Whether this error reports that some record could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
                | DomainErrorKind::Transcription(TranscriptionErrorKind::ReferenceNotFound)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api`` layer to the `domain`` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::InvalidQueryTerm => EntityErrorKind::Invalid,
            EntityApiErrorKind::RecordUnauthenticated => EntityErrorKind::Unauthenticated,
            EntityApiErrorKind::UniqueViolation => EntityErrorKind::Conflict,
            EntityApiErrorKind::SystemError => EntityErrorKind::DbTransaction,
            _ => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        EntityApiError::from(err).into()
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<SpeechAiError> for Error {
    fn from(err: SpeechAiError) -> Self {
        let error_kind = match &err {
            SpeechAiError::Network(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            SpeechAiError::Configuration(_) => DomainErrorKind::Internal(InternalErrorKind::Config),
            SpeechAiError::Authentication(msg)
            | SpeechAiError::Provider(msg)
            | SpeechAiError::NotFound(msg)
            | SpeechAiError::Deserialization(msg) => {
                DomainErrorKind::External(ExternalErrorKind::Other(msg.clone()))
            }
            SpeechAiError::Other(other) => {
                DomainErrorKind::External(ExternalErrorKind::Other(other.to_string()))
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "File system error".to_string(),
            )),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to write document archive".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_become_conflicts() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::UniqueViolation,
        }
        .into();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Conflict))
        );
    }

    #[test]
    fn speech_network_errors_stay_network_errors() {
        let err: Error = SpeechAiError::Network("connection reset".to_string()).into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Network)
        );
    }

    #[test]
    fn not_found_covers_entities_and_references() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
        .into();
        assert!(err.is_not_found());
        assert!(Error::transcription(TranscriptionErrorKind::ReferenceNotFound).is_not_found());
        assert!(!Error::transcription(TranscriptionErrorKind::InProgress).is_not_found());
    }
}
