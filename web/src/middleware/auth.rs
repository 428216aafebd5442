use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_login::AuthSession;
use log::*;

/// Lets any logged in user through.
pub async fn require_auth(
    auth_session: AuthSession<domain::user::Backend>,
    request: Request,
    next: Next,
) -> Response {
    match auth_session.user {
        Some(_user) => next.run(request).await,
        // Not logged in or session expired
        None => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}

/// Lets only editorial staff (editors, moderators and admins) through.
///
/// Unauthenticated requests get 401 instead of a redirect to a login page,
/// authenticated users without an editorial role get 403.
pub async fn require_editor(
    auth_session: AuthSession<domain::user::Backend>,
    request: Request,
    next: Next,
) -> Response {
    match auth_session.user {
        Some(user) if user.role.is_editorial() => next.run(request).await,
        Some(user) => {
            warn!(
                "User {} with role {} tried to access {}",
                user.id,
                user.role,
                request.uri().path()
            );
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
        None => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}
