#![forbid(unsafe_code)]
//! tramnet-web: JSON HTTP API over the tram network store.
//!
//! Handlers are thin. Each request opens the store, calls into
//! `tramnet_core`, and wraps the outcome in [`response::ApiResponse`].
//! Failures become [`response::ApiError`], whose status follows the error
//! code.

pub mod handlers;
pub mod response;

use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use tracing::info;
use tramnet_core::error::NetworkError;

use crate::response::ApiError;

/// Shared state: where the store lives. Connections are per request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db_path: PathBuf,
}

impl AppState {
    #[must_use]
    pub const fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

/// Register every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::Network(NetworkError::Validation {
            field: "body",
            reason: err.to_string(),
        })
        .into()
    });
    cfg.app_data(json).route("/health", web::get().to(handlers::health)).service(
        web::scope("/api")
            .route("/stops", web::get().to(handlers::list_stops))
            .route("/stops", web::post().to(handlers::add_stop))
            .route("/stops/status", web::get().to(handlers::stops_by_status))
            .route("/stops/{id}", web::get().to(handlers::stop_detail))
            .route("/stops/{id}", web::delete().to(handlers::delete_stop))
            .route("/stops/{id}/status", web::put().to(handlers::set_status))
            .route("/connections", web::get().to(handlers::list_connections))
            .route("/connections", web::post().to(handlers::add_connection))
            .route("/connections", web::delete().to(handlers::delete_connection))
            .route("/lines", web::get().to(handlers::list_lines))
            .route("/routes/shortest", web::post().to(handlers::shortest_path))
            .route("/network/graph", web::get().to(handlers::network_graph))
            .route("/stats", web::get().to(handlers::stats)),
    );
}

/// Serve the API until the process is stopped. The database at `db_path`
/// must already exist; requests against a missing one fail with `E1001`.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn run(host: &str, port: u16, db_path: PathBuf) -> std::io::Result<()> {
    info!(host, port, db = %db_path.display(), "starting tramnet API");
    let state = AppState::new(db_path);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}
