//! Notas Service — records and reviews agent ratings for support tickets.
//!
//! Opens the SQLite store, promotes configured admins and exposes the login
//! flow, ticket rating and reports as JSON RPC endpoints.
//!
//! Default: http://127.0.0.1:9110/

mod auth;
mod config;
mod db;
mod error;
mod models;
mod reporting;
mod routes;
mod session;

use config::Config;
use db::Database;
use models::Role;
use routes::AppState;
use std::sync::Arc;

/// Give the admin role to every configured id that is registered.
fn promote_admins(db: &Database, admin_ids: &[String]) {
    for ra in admin_ids {
        match db.set_role(ra, Role::Admin) {
            Ok(true) => log::info!("Promoted {} to admin", ra),
            Ok(false) => log::warn!("Admin id {} is not registered, skipping", ra),
            Err(e) => log::error!("Failed to promote {}: {}", ra, e),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    log::info!("Notas v{}", env!("CARGO_PKG_VERSION"));

    log::info!("Initializing database at {}", config.database_url);
    let db = match Database::new(&config.database_url) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    promote_admins(&db, &config.admin_ids);

    let addr = format!("127.0.0.1:{}", config.port);
    let state = Arc::new(AppState::new(db, config));

    let cors = tower_http::cors::CorsLayer::permissive();
    let app = routes::router(state).layer(cors);

    log::info!("Notas Service listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
