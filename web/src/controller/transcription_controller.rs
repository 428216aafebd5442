//! Controller for the transcription widget of the editing UI.
//!
//! Validation and request failures the editor can act on are answered with an
//! inline `{class, type, message}` body and HTTP 200, never with an error status.

use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::transcription::{RequestParams, TranscriptionDataParams, ValidateParams};
use crate::response::transcription::{TranscriptionDataResponse, WidgetResponse};
use crate::{AppState, Error};

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Form, Json};

use domain::error::{DomainErrorKind, Error as DomainError, TranscriptionErrorKind};
use domain::{request, validation};
use log::*;

/// POST /validate_transcription_data
///
/// Checks the target record and the video, and hands out a capability token
/// when the video can be transcribed.
#[utoipa::path(
    post,
    path = "/validate_transcription_data",
    request_body(content = ValidateParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Validation result, `type` is `success` or `error`", body = WidgetResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn validate(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Form(params): Form<ValidateParams>,
) -> Json<WidgetResponse> {
    debug!("Validating video {:?} for {}", params.video_id, params.parent_instance_str);

    let video_id = params.video_id.clone();
    match app_state.workflow.validate(&user, &params.into()).await {
        Ok(video) => Json(WidgetResponse::validated(video)),
        Err(err) => Json(validation_failure(err, &video_id)),
    }
}

fn validation_failure(err: DomainError, video_id: &str) -> WidgetResponse {
    match err.error_kind {
        DomainErrorKind::Transcription(kind) => {
            let mut body = WidgetResponse::error(validation::user_message(&kind, video_id));
            if let TranscriptionErrorKind::DuplicateCompleted(existing) = kind {
                body.existing_transcription = Some(existing);
            }
            body
        }
        other => {
            error!("Validation of video {video_id:?} failed: {other:?}");
            WidgetResponse::error(validation::GENERAL_ERROR_MESSAGE)
        }
    }
}

/// POST /request_transcription/{token}
///
/// Creates the pending transcript record and submits the speech job.
#[utoipa::path(
    post,
    path = "/request_transcription/{token}",
    params(
        ("token" = String, Path, description = "Capability token returned by validation"),
    ),
    request_body(content = RequestParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Request result, `type` is `success` or `error`", body = WidgetResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn request(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(token): Path<String>,
    Form(params): Form<RequestParams>,
) -> Json<WidgetResponse> {
    let video_id = params.video_id.clone();
    match app_state.workflow.request(&user, &token, &params.into()).await {
        Ok(transcription) => {
            debug!("Pending transcription {} created", transcription.id);
            Json(WidgetResponse::success(None))
        }
        Err(err) => Json(request_failure(err, &video_id)),
    }
}

fn request_failure(err: DomainError, video_id: &str) -> WidgetResponse {
    match err.error_kind {
        DomainErrorKind::Transcription(kind) => {
            let mut body = WidgetResponse::error(request::user_message(&kind, video_id));
            if let TranscriptionErrorKind::DuplicateCompleted(existing) = kind {
                body.existing_transcription = Some(existing);
            }
            body
        }
        other => {
            error!("Transcription request for {video_id:?} failed: {other:?}");
            WidgetResponse::error(request::SUBMISSION_FAILED_MESSAGE)
        }
    }
}

/// GET /processing_transcriptions
///
/// Video ids of all transcriptions still being produced.
#[utoipa::path(
    get,
    path = "/processing_transcriptions",
    responses(
        (status = 200, description = "Object mapping each in-flight video id to `true`", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn processing(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let processing = app_state.workflow.processing_transcriptions().await?;
    Ok(Json(processing))
}

/// GET /transcription_data
///
/// The transcript record of a video, pending or finished, for linking it instead of requesting a new one.
#[utoipa::path(
    get,
    path = "/transcription_data",
    params(TranscriptionDataParams),
    responses(
        (status = 200, description = "Transcript data, all null for malformed video ids", body = TranscriptionDataResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No transcript record for the video"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn transcription_data(
    State(app_state): State<AppState>,
    Query(params): Query<TranscriptionDataParams>,
) -> Result<impl IntoResponse, Error> {
    let data = app_state
        .workflow
        .transcription_data(&params.video_id)
        .await?;
    Ok(Json(TranscriptionDataResponse::from(data)))
}
