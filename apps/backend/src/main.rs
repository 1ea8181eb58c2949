use actix_web::{web, App, HttpServer};
use belka_backend::config::AppConfig;
use belka_backend::infra::pipeline::spawn_pipeline;
use belka_backend::infra::state::build_state;
use belka_backend::middleware::{RequestTrace, StructuredLogger, TraceSpan};
use belka_backend::routes;
use belka_backend::telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: Set via docker-compose env_file or docker run --env-file
    // - Local dev: Source env files manually (e.g., set -a; . ./.env; set +a)
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    let (host, port) = (config.host.clone(), config.port);
    let worker_config = config.worker.clone();

    let app_state = match build_state().with_config(config).build().await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to build application state");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let pipeline = match spawn_pipeline(&app_state, worker_config, cancel.clone()) {
        Ok(handles) => handles,
        Err(e) => {
            error!(error = %e, "Failed to start the stage pipeline");
            std::process::exit(1);
        }
    };

    info!(%host, port, "Starting Belka table service");

    let data = web::Data::new(app_state);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    let result = server.await;

    info!("HTTP server stopped, draining stage pipeline");
    cancel.cancel();
    for handle in pipeline {
        if let Err(e) = handle.await {
            error!(error = %e, "Pipeline task ended abnormally");
        }
    }
    result
}
