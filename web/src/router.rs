use crate::{
    middleware::auth::{require_auth, require_editor},
    params, response, AppState,
};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::controller::{
    health_check_controller, notification_controller, transcription_controller,
    user_session_controller, webhook_controller,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Transcript Attach API"
        ),
        paths(
            health_check_controller::health_check,
            user_session_controller::login,
            user_session_controller::delete,
            transcription_controller::validate,
            transcription_controller::request,
            transcription_controller::processing,
            transcription_controller::transcription_data,
            notification_controller::delete,
            notification_controller::index,
            webhook_controller::receive_transcription,
        ),
        components(
            schemas(
                domain::notifications::Model,
                domain::transcriptions::Model,
                domain::users::Model,
                domain::user::Credentials,
                params::transcription::ValidateParams,
                params::transcription::RequestParams,
                params::notification::DeleteParams,
                response::transcription::WidgetResponse,
                response::transcription::VideoSummary,
                response::transcription::TranscriptionDataResponse,
                response::transcription::CallbackResponse,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "transcript_attach", description = "Video transcript attachment API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our cookie session based authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value returned from successful login via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let media_root = app_state.config.media_root().to_owned();

    Router::new()
        .merge(health_routes())
        .merge(user_session_routes())
        .merge(user_session_protected_routes(app_state.clone()))
        .merge(transcription_routes(app_state.clone()))
        .merge(notification_routes(app_state.clone()))
        .merge(webhook_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
        .merge(media_routes(&media_root))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

pub fn user_session_routes() -> Router {
    Router::new().route("/login", post(user_session_controller::login))
}

pub fn user_session_protected_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/logout", get(user_session_controller::delete))
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

fn transcription_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/validate_transcription_data",
            post(transcription_controller::validate),
        )
        .route(
            "/request_transcription/{token}",
            post(transcription_controller::request),
        )
        .route(
            "/processing_transcriptions",
            get(transcription_controller::processing),
        )
        .route(
            "/transcription_data",
            get(transcription_controller::transcription_data),
        )
        .route_layer(from_fn(require_editor))
        .with_state(app_state)
}

fn notification_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/delete_notification", post(notification_controller::delete))
        .route("/notifications", get(notification_controller::index))
        .route_layer(from_fn(require_editor))
        .with_state(app_state)
}

// The speech service authenticates with the shared webhook secret, not a session
fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/receive_transcription/{video_id}/{user_id}",
            post(webhook_controller::receive_transcription),
        )
        .with_state(app_state)
}

// Generated transcript documents
fn media_routes(media_root: &str) -> Router {
    Router::new().nest_service("/media", ServeDir::new(media_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum_login::{
        tower_sessions::{MemoryStore, SessionManagerLayer},
        AuthManagerLayerBuilder,
    };
    use clap::Parser;
    use domain::test_support::Fixture;
    use domain::user::Backend;
    use domain::Id;
    use sea_orm::DatabaseConnection;
    use service::config::Config;
    use speech_ai::Word;
    use std::sync::Arc;
    use tower::ServiceExt;

    const VIDEO: &str = "aaaaaaaaaaa";

    fn words() -> Vec<Word> {
        vec![Word::new("hello", 0, "A"), Word::new("world", 400, "A")]
    }

    fn app(fixture: &Fixture) -> Router {
        let database_connection = Arc::new(DatabaseConnection::Disconnected);
        let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
        let auth_layer =
            AuthManagerLayerBuilder::new(Backend::new(&database_connection), session_layer).build();

        let app_state = AppState {
            database_connection,
            config: Config::parse_from(["transcript_attach_rs"]),
            workflow: Arc::new(fixture.workflow()),
        };
        define_routes(app_state).layer(auth_layer)
    }

    fn callback(video_id: &str, body: &'static str, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/receive_transcription/{video_id}/{}", Id::new_v4()))
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header("x-webhook-secret", secret);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_session() {
        let response = app(&Fixture::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn widget_endpoints_require_a_session() {
        for (method, uri) in [
            ("GET", "/processing_transcriptions"),
            ("GET", "/transcription_data?video_id=aaaaaaaaaaa"),
            ("POST", "/validate_transcription_data"),
            ("POST", "/request_transcription/token"),
            ("POST", "/delete_notification"),
            ("GET", "/notifications"),
            ("GET", "/logout"),
        ] {
            let response = app(&Fixture::new())
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn completed_callbacks_need_no_session() {
        let fixture = Fixture::new();
        fixture.store.insert_pending(VIDEO);
        fixture.provider.complete("job-1", words());

        let response = app(&fixture)
            .oneshot(callback(
                VIDEO,
                r#"{"status":"completed","transcript_id":"job-1"}"#,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["type"], "success");
        assert_eq!(fixture.documents.saved().len(), 1);
    }

    #[tokio::test]
    async fn callbacks_for_unknown_videos_answer_error() {
        let fixture = Fixture::new();

        let response = app(&fixture)
            .oneshot(callback(VIDEO, r#"{"status":"error"}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["type"], "error");
    }

    #[tokio::test]
    async fn callbacks_with_a_wrong_secret_are_rejected_untouched() {
        let fixture = Fixture::new().with_webhook_secret("s3cret");
        fixture.store.insert_pending(VIDEO);

        let response = app(&fixture)
            .oneshot(callback(VIDEO, r#"{"status":"error"}"#, Some("guess")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["type"], "error");
        assert_eq!(fixture.store.all().len(), 1);
        assert!(fixture.notifications.sent().is_empty());
    }

    #[tokio::test]
    async fn callbacks_with_the_right_secret_are_processed() {
        let fixture = Fixture::new().with_webhook_secret("s3cret");
        fixture.store.insert_pending(VIDEO);

        let response = app(&fixture)
            .oneshot(callback(VIDEO, r#"{"status":"error"}"#, Some("s3cret")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["type"], "error");
        assert!(fixture.store.all().is_empty());
    }
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod session_tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum_login::{
        tower_sessions::{MemoryStore, SessionManagerLayer},
        AuthManagerLayerBuilder,
    };
    use clap::Parser;
    use domain::test_support::{editor, Fixture};
    use domain::user::Backend;
    use domain::users;
    use password_auth::generate_hash;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::{json, Value};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    const WIDGET_FORM: &str = "video_id=aaaaaaaaaaa&parent_instance_str=cms%3Apage%3A1&transcription_field=transcription&field_name=video_id";

    fn login_user() -> users::Model {
        users::Model {
            email: "test@domain.com".to_string(),
            password: generate_hash("password2"),
            ..editor()
        }
    }

    /// Logs `user` in and returns the app with the session cookie. The database
    /// answers the login and `requests` further authenticated requests.
    async fn logged_in(fixture: &Fixture, user: &users::Model, requests: usize) -> (Router, String) {
        let mut db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]]); // find_by_email during authentication
        for _ in 0..requests {
            db = db.append_query_results([[user.clone()]]); // get_user for each request
        }
        let database_connection = Arc::new(db.into_connection());
        let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
        let auth_layer =
            AuthManagerLayerBuilder::new(Backend::new(&database_connection), session_layer).build();

        let app = define_routes(AppState {
            database_connection,
            config: Config::parse_from(["transcript_attach_rs"]),
            workflow: Arc::new(fixture.workflow()),
        })
        .layer(auth_layer);

        let login_response = app
            .clone()
            .oneshot(form_post("/login", None, "email=test@domain.com&password=password2"))
            .await
            .unwrap();
        assert_eq!(login_response.status(), StatusCode::OK);

        let cookie = login_response
            .headers()
            .get("set-cookie")
            .and_then(|c| c.to_str().ok())
            .expect("Login should return session cookie")
            .to_string();
        (app, cookie)
    }

    fn form_post(uri: &str, cookie: Option<&str>, body: impl Into<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Body::from(body.into())).unwrap()
    }

    async fn json_reply(app: &Router, request: Request<Body>) -> Value {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn editors_validate_and_then_request_a_transcription() {
        let fixture = Fixture::new();
        fixture.pages.insert("1");
        let user = login_user();
        let (app, cookie) = logged_in(&fixture, &user, 2).await;

        let validated = json_reply(
            &app,
            form_post("/validate_transcription_data", Some(&cookie), WIDGET_FORM),
        )
        .await;

        assert_eq!(validated["class"], "success");
        assert_eq!(validated["type"], "success");
        assert_eq!(validated["video"]["title"], "Video aaaaaaaaaaa");
        assert_eq!(
            validated["video"]["audio_url"],
            "https://audio.example.com/aaaaaaaaaaa.m4a"
        );
        assert!(validated["message"]
            .as_str()
            .unwrap()
            .ends_with("Transcription process will take about 1 minute 12 seconds"));
        let token = validated["token"].as_str().unwrap().to_string();

        let requested = json_reply(
            &app,
            form_post(
                &format!("/request_transcription/{token}"),
                Some(&cookie),
                format!(
                    "{WIDGET_FORM}&audio_url=https%3A%2F%2Faudio.example.com%2Faaaaaaaaaaa.m4a"
                ),
            ),
        )
        .await;

        assert_eq!(requested, json!({"class": "success", "type": "success"}));
        let records = fixture.store.all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].requested_by, Some(user.id));
        assert_eq!(fixture.pages.transcription_of("1"), Some(records[0].id));
        assert_eq!(fixture.provider.submissions().len(), 1);
    }

    #[tokio::test]
    async fn editors_delete_their_notifications_once() {
        let fixture = Fixture::new();
        let user = login_user();
        let notification_id = fixture.notifications.insert(user.id);
        let (app, cookie) = logged_in(&fixture, &user, 2).await;
        let delete = || {
            form_post(
                "/delete_notification",
                Some(&cookie),
                format!("notification_id={notification_id}"),
            )
        };

        let first = json_reply(&app, delete()).await;
        let second = json_reply(&app, delete()).await;

        assert_eq!(first, json!({"message": "Successfully deleted notification"}));
        assert_eq!(second, json!({"message": "Notification does not exist"}));
        assert!(fixture.notifications.sent().is_empty());
    }
}
