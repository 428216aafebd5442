use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::notification::DeleteParams;
use crate::{AppState, Error};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Form, Json};
use log::*;
use serde_json::json;

/// POST /delete_notification
///
/// Deletes one of the current user's notifications. Unknown ids, and ids of
/// other users' notifications, are reported as not existing.
#[utoipa::path(
    post,
    path = "/delete_notification",
    request_body(content = DeleteParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Deletion result message"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn delete(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Form(params): Form<DeleteParams>,
) -> Result<impl IntoResponse, Error> {
    let deleted = app_state
        .workflow
        .delete_notification(params.notification_id, user.id)
        .await?;

    let message = if deleted {
        debug!("Deleted notification {}", params.notification_id);
        "Successfully deleted notification"
    } else {
        "Notification does not exist"
    };
    Ok(Json(json!({ "message": message })))
}

/// GET /notifications
///
/// Unread notifications of the current user, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Unread notifications", body = [domain::notifications::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn index(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let notifications = app_state.workflow.unread_notifications(user.id).await?;
    Ok(Json(notifications))
}
