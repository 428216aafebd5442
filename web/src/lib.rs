use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum_login::{
    tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer},
    AuthManagerLayerBuilder,
};
use domain::user::Backend;
use domain::TranscriptWorkflow;
use log::*;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::io;
use std::sync::Arc;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

mod controller;
mod error;
mod extractors;
mod middleware;
pub(crate) mod params;
pub(crate) mod response;
mod router;

pub use error::{Error, Result};

/// State shared by every handler: infrastructure from `service` plus the
/// transcript workflow built on top of it.
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub config: Config,
    pub workflow: Arc<TranscriptWorkflow>,
}

impl AppState {
    pub fn new(service_state: service::AppState, workflow: TranscriptWorkflow) -> Self {
        Self {
            database_connection: service_state.database_connection,
            config: service_state.config,
            workflow: Arc::new(workflow),
        }
    }
}

pub async fn init_server(app_state: AppState) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Connecting to DB with URL: {}", app_state.config.database_url());

    // Sessions live in the same schema as the application tables
    let session_store = PostgresStore::new(
        app_state
            .database_connection
            .get_postgres_connection_pool()
            .clone(),
    )
    .with_schema_name(service::DATABASE_SCHEMA)
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
    .with_table_name("authorized_sessions")
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let session_expiry_seconds = app_state.config.backend_session_expiry_seconds as i64;
    info!("Session expiry: {session_expiry_seconds} seconds of inactivity");
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.is_production())
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(session_expiry_seconds)));

    let backend = Backend::new(&app_state.database_connection);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let server_url = format!(
        "{}:{}",
        app_state
            .config
            .interface
            .as_deref()
            .unwrap_or("127.0.0.1"),
        app_state.config.port
    );
    let listener = TcpListener::bind(&server_url).await?;

    info!(
        "Server starting... listening for connections on http://{}",
        server_url
    );

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse()
                .map_err(|_| warn!("Ignoring invalid CORS origin {origin:?}"))
                .ok()
        })
        .collect();
    info!("CORS allowed origins: {:?}", app_state.config.allowed_origins);

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::DELETE, Method::GET, Method::OPTIONS, Method::POST])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(allowed_origins);

    axum::serve(
        listener,
        router::define_routes(app_state)
            .layer(cors_layer)
            .layer(auth_layer)
            .into_make_service(),
    )
    .await?;

    deletion_task.await??;

    Ok(())
}
