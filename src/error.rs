//! Error types for the PAJSK report server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::DeliveryMode;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, ReportError>;

pub const MSG_MISSING_IDENTIFIER: &str = "请求错误：缺少学生身份证号码。";
pub const MSG_INVALID_JSON: &str = "请求错误：JSON 格式无效。";
pub const MSG_PAYLOAD_TOO_LARGE: &str = "请求错误：请求体过大。";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Method Not Allowed.";
pub const MSG_RECORD_NOT_FOUND: &str = "未找到该身份证号码的 PAJSK 报告记录。";
pub const MSG_REPORT_NOT_FOUND: &str = "未找到该身份证号码的 PAJSK 报告。";
pub const MSG_ARTIFACT_NOT_FOUND: &str = "未找到该身份证号码对应的 PDF 报告文件。";
pub const MSG_DATABASE_FAILURE: &str = "数据库查询失败。";
pub const MSG_INTERNAL: &str = "内部服务器错误：无法处理请求。";

/// Failure of a report request, before any response bytes are sent
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// No record matches the identifier; the message differs per delivery mode
    #[error("No record found ({0} mode)")]
    NotFound(DeliveryMode),

    #[error("Stored report not found: {0}")]
    ArtifactNotFound(String),

    #[error("Record store failure: {0}")]
    StoreFailure(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Object storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Presigning failed: {0}")]
    Presign(String),

    #[error("S3 SDK error: {0}")]
    SdkError(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl ReportError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ReportError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ReportError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ReportError::NotFound(_) | ReportError::ArtifactNotFound(_) => StatusCode::NOT_FOUND,
            ReportError::StoreFailure(_) | ReportError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the caller; never carries store or SDK details
    pub fn public_message(&self) -> &'static str {
        match self {
            ReportError::InvalidRequest(msg) => *msg,
            ReportError::PayloadTooLarge => MSG_PAYLOAD_TOO_LARGE,
            ReportError::MethodNotAllowed => MSG_METHOD_NOT_ALLOWED,
            ReportError::NotFound(DeliveryMode::Link) => MSG_RECORD_NOT_FOUND,
            ReportError::NotFound(DeliveryMode::Render) => MSG_REPORT_NOT_FOUND,
            ReportError::ArtifactNotFound(_) => MSG_ARTIFACT_NOT_FOUND,
            ReportError::StoreFailure(_) => MSG_DATABASE_FAILURE,
            ReportError::Storage(_) => MSG_INTERNAL,
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        match &self {
            ReportError::StoreFailure(reason) => {
                tracing::error!("Record store error: {}", reason);
            }
            ReportError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
            }
            ReportError::ArtifactNotFound(key) => {
                tracing::warn!("Stored report missing: {}", key);
            }
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });

        (self.status(), body).into_response()
    }
}
