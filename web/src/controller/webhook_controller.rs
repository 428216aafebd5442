//! Controller for the speech service calling back when a transcription job ends.

use crate::response::transcription::CallbackResponse;
use crate::AppState;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use domain::webhook::WEBHOOK_SECRET_HEADER;
use domain::Id;
use log::*;

/// POST /receive_transcription/{video_id}/{user_id}
///
/// Finishes or aborts the pending transcript of the video. Needs no session;
/// when a webhook secret is configured it must be presented in `x-webhook-secret`.
/// Every processed callback is acknowledged with 200, the outcome is reported to
/// the requesting user as a notification.
#[utoipa::path(
    post,
    path = "/receive_transcription/{video_id}/{user_id}",
    params(
        ("video_id" = String, Path, description = "Video the transcript was requested for"),
        ("user_id" = String, Path, description = "User who requested the transcript"),
    ),
    request_body(content = String, description = "JSON body `{status, transcript_id}`", content_type = "application/json"),
    responses(
        (status = 200, description = "Callback processed, `type` is `success` or `error`", body = CallbackResponse),
        (status = 401, description = "Missing or wrong webhook secret"),
    )
)]
pub async fn receive_transcription(
    State(app_state): State<AppState>,
    Path((video_id, user_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if !app_state.workflow.authorize_callback(presented) {
        warn!("Rejected transcription callback for video {video_id}: invalid webhook secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(CallbackResponse {
                kind: "error".to_string(),
            }),
        );
    }

    let user_id = Id::parse_str(&user_id)
        .map_err(|_| warn!("Transcription callback names malformed user id {user_id:?}"))
        .ok();

    let outcome = app_state
        .workflow
        .receive(&video_id, user_id, &body)
        .await;

    (
        StatusCode::OK,
        Json(CallbackResponse {
            kind: outcome.response_type().to_string(),
        }),
    )
}
