//! PAJSK Report Server Library
//!
//! Looks up a student's PAJSK assessment record by IC number and either
//! issues a signed link to the stored PDF report or streams a report
//! generated from the record.
//!
//! # Modules
//!
//! - `config`: startup configuration, read once from the environment
//! - `db`: PostgreSQL record store
//! - `storage`: S3-compatible object store for pre-generated reports
//! - `report`: validation, lookup and delivery pipeline
//! - `routes`: HTTP endpoints

pub mod config;
pub mod db;
pub mod error;
pub mod report;
pub mod routes;
pub mod state;
pub mod storage;

use axum::{
    http::{header, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::reports::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
