//! Documentation of Pusaka, a digitized-manuscript reading platform.
//!
//! # General Infrastructure
//! - Visitors browse, search, and read naskah through the frontend; every
//!   data call lands on this backend
//! - This backend fronts Redis (catalog + counters) and Meilisearch
//!   (discovery); neither is ever exposed to the network directly
//! - An admin uploads PDFs to the hosting/conversion service with the
//!   ingest tool, which then registers the record here
//!
//! # Notes
//!
//! ## Redis + Meilisearch
//! In theory Meilisearch alone could hold the catalog and the view
//! counters. But it is a search engine, not a database: per-view atomic
//! increments and single-record lookups happen far more often than
//! searches, and paying search-engine overhead on every page open is
//! excessive. Redis gives atomic increments and O(1) record fetches; the
//! index is synced from it on an interval, so search results trail the live
//! counters by a few minutes at most. Eventual consistency is fine for a
//! popularity signal.
//!
//! ## View dedup
//! A view counts once per browsing session. The session id travels in the
//! `X-Session-Id` header and the markers live in process memory with an
//! idle TTL, so dedup is best effort: a restart or an expired session can
//! let the same reader count again. Acceptable for a reading-room counter.
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run the server (needs Redis and Meilisearch reachable, plus the
//! `MEILI_ADMIN_KEY` and `ADMIN_PASSWORD` secrets).
//! ```sh
//! RUST_LOG=info cargo run -p pusaka
//! ```
use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::{get, post},
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod search;
pub mod session;
pub mod state;
pub mod views;

use auth::{login_handler, logout_handler};
use routes::{
    create_handler, delete_handler, detail_handler, list_handler, popular_handler,
    record_view_handler, search_handler, update_handler, views_handler,
};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(routes::SESSION_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/naskah", get(list_handler).post(create_handler))
        .route("/naskah/popular", get(popular_handler))
        .route(
            "/naskah/{id}",
            get(detail_handler)
                .put(update_handler)
                .delete(delete_handler),
        )
        .route("/naskah/{id}/views", get(views_handler))
        .route("/naskah/{id}/view", post(record_view_handler))
        .route("/search", get(search_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
