use actix_web::web;

pub mod health;
pub mod sessions;
pub mod tables;

/// Register every route. `main.rs` wraps the result in the tracing and
/// logging middleware; tests use it bare.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check: /health
    cfg.service(web::scope("/health").configure(health::configure_routes));

    // Sessions: /api/sessions
    cfg.service(web::scope("/api/sessions").configure(sessions::configure_routes));

    // Tables: /api/tables/**
    cfg.service(web::scope("/api/tables").configure(tables::configure_routes));
}
