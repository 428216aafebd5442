use domain::TranscriptWorkflow;
use log::{error, info};
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    if let Err(reason) = config.validate() {
        error!("Invalid configuration: {reason}");
        std::process::exit(1);
    }

    info!("Starting up in {} mode...", config.runtime_env);

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let workflow = match TranscriptWorkflow::from_config(&config, Arc::clone(&db)) {
        Ok(workflow) => workflow,
        Err(e) => {
            error!("Failed to set up the transcription workflow: {e}");
            std::process::exit(1);
        }
    };

    let app_state = web::AppState::new(AppState::new(config, &db), workflow);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
