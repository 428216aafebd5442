use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    TranscriptionErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    fn status(&self) -> StatusCode {
        match &self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => StatusCode::NOT_FOUND,
                    EntityErrorKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
                    EntityErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                    EntityErrorKind::Conflict => StatusCode::CONFLICT,
                    EntityErrorKind::DbTransaction | EntityErrorKind::Other(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                },
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network => StatusCode::BAD_GATEWAY,
                ExternalErrorKind::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            DomainErrorKind::Transcription(transcription_error_kind) => {
                match transcription_error_kind {
                    TranscriptionErrorKind::ReferenceNotFound => StatusCode::NOT_FOUND,
                    TranscriptionErrorKind::FieldMissing(_)
                    | TranscriptionErrorKind::InvalidFormat
                    | TranscriptionErrorKind::RemoteUnavailable(_)
                    | TranscriptionErrorKind::NoAudioStream => StatusCode::UNPROCESSABLE_ENTITY,
                    TranscriptionErrorKind::DuplicateCompleted(_)
                    | TranscriptionErrorKind::InProgress => StatusCode::CONFLICT,
                    TranscriptionErrorKind::CapabilityRejected => StatusCode::FORBIDDEN,
                    TranscriptionErrorKind::SubmissionFailed => StatusCode::BAD_GATEWAY,
                    TranscriptionErrorKind::CallbackMalformed
                    | TranscriptionErrorKind::CallbackProcessingFailed => StatusCode::BAD_REQUEST,
                }
            }
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {status}: {:?}", self.0);
        } else {
            debug!("Request rejected with {status}: {:?}", self.0.error_kind);
        }
        let reason = status.canonical_reason().unwrap_or_default().to_uppercase();
        (status, reason).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::error::ExistingTranscription;

    fn status_of(error_kind: DomainErrorKind) -> StatusCode {
        Error(DomainError {
            source: None,
            error_kind,
        })
        .into_response()
        .status()
    }

    #[test]
    fn entity_kinds_map_to_client_and_server_errors() {
        assert_eq!(
            status_of(DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::NotFound
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::Unauthenticated
            ))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(DomainErrorKind::Internal(InternalErrorKind::Other(
                "boom".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(DomainErrorKind::External(ExternalErrorKind::Network)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn transcription_kinds_map_to_statuses() {
        assert_eq!(
            status_of(DomainErrorKind::Transcription(
                TranscriptionErrorKind::CapabilityRejected
            )),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DomainErrorKind::Transcription(
                TranscriptionErrorKind::DuplicateCompleted(ExistingTranscription {
                    id: domain::Id::new_v4(),
                    title: String::new(),
                    edit_url: String::new(),
                })
            )),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainErrorKind::Transcription(
                TranscriptionErrorKind::SubmissionFailed
            )),
            StatusCode::BAD_GATEWAY
        );
    }
}
