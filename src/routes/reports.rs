//! Report endpoint
//!
//! `POST` with `{"idCardNumber": "..."}` returns a signed link or a streamed
//! PDF depending on the delivery mode. `OPTIONS` preflights are answered by
//! the CORS layer before routing; every other method is rejected with 405.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    routing::{post, MethodRouter},
    Router,
};

use crate::error::{ReportError, Result, MSG_INVALID_JSON};
use crate::report::{parse_identifier, Delivery};
use crate::state::AppState;

pub const REPORT_PATH: &str = "/api/generate-pdf";

/// Create the report router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(REPORT_PATH, report_method_router())
        .route("/", report_method_router())
}

fn report_method_router() -> MethodRouter<AppState> {
    post(generate_report).fallback(method_not_allowed)
}

/// Validate, look up, then deliver the report
async fn generate_report(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Delivery> {
    let body = body.map_err(body_rejection)?;
    let identifier = parse_identifier(&body)?;
    state.reports().deliver(identifier).await
}

/// Unreadable bodies still get the JSON error shape
fn body_rejection(rejection: BytesRejection) -> ReportError {
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ReportError::PayloadTooLarge
    } else {
        ReportError::InvalidRequest(MSG_INVALID_JSON)
    }
}

async fn method_not_allowed() -> ReportError {
    ReportError::MethodNotAllowed
}
