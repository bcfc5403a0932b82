//! Report delivery pipeline
//!
//! `Validating → LookingUp → {ResolvingArtifact | Rendering} → Done`, single
//! shot with no retries. Validation and lookup are shared by both delivery
//! modes; only the last step depends on the configured [`DeliveryMode`].

use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use serde::Serialize;

use crate::config::{DeliveryMode, ReportConfig};
use crate::db::{LookupOutcome, RecordStore, StudentRecord};
use crate::error::{ReportError, Result, StorageError};
use crate::storage::{report_key, AccessReference, BlobStore};

use super::pdf::{render_document, PageLayout, RenderError};
use super::request::Identifier;
use super::sections::build_sections;

pub const MSG_LINK_ISSUED: &str = "成功获取成绩单链接。";

pub type DocumentStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, RenderError>> + Send>>;

/// Successful outcome of a report request
pub enum Delivery {
    /// Signed link to the stored report
    Link(AccessReference),
    /// Generated report, produced while the body is sent
    Document { filename: String, stream: DocumentStream },
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Link(reference) => f.debug_tuple("Link").field(reference).finish(),
            Delivery::Document { filename, .. } => {
                f.debug_struct("Document").field("filename", filename).finish_non_exhaustive()
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkResponse {
    pdf_url: String,
    message: &'static str,
}

impl IntoResponse for Delivery {
    fn into_response(self) -> Response {
        match self {
            Delivery::Link(reference) => (
                StatusCode::OK,
                Json(LinkResponse {
                    pdf_url: reference.url,
                    message: MSG_LINK_ISSUED,
                }),
            )
                .into_response(),
            Delivery::Document { filename, stream } => {
                let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", filename))
                    .unwrap_or_else(|_| HeaderValue::from_static("inline"));

                // Status and headers are committed before the first page is
                // rendered; a later fault can only cut the body short.
                let body = Body::from_stream(stream.inspect_err(|e| {
                    tracing::error!("Report rendering failed mid-stream: {}", e);
                }));

                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
                        (header::CONTENT_DISPOSITION, disposition),
                        (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
                    ],
                    body,
                )
                    .into_response()
            }
        }
    }
}

/// Looks up student records and delivers their reports
pub struct ReportService {
    records: Arc<dyn RecordStore>,
    blobs: Option<Arc<dyn BlobStore>>,
    config: ReportConfig,
}

impl ReportService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Option<Arc<dyn BlobStore>>,
        config: ReportConfig,
    ) -> Self {
        Self {
            records,
            blobs,
            config,
        }
    }

    /// Find the record for a validated identifier
    pub async fn lookup(&self, identifier: &Identifier) -> Result<StudentRecord> {
        match self.records.find_by_identifier(identifier.as_str()).await {
            LookupOutcome::Found(record) => {
                tracing::debug!("Found record for {}", identifier);
                Ok(record)
            }
            LookupOutcome::NotFound => {
                tracing::debug!("No record for {}", identifier);
                Err(ReportError::NotFound(self.config.mode))
            }
            LookupOutcome::Fault(reason) => Err(ReportError::StoreFailure(reason)),
        }
    }

    /// Issue a signed link to the stored report for `identifier`
    pub async fn resolve_artifact(&self, identifier: &Identifier) -> Result<AccessReference> {
        let blobs = self.blobs.as_ref().ok_or_else(|| {
            ReportError::Storage(StorageError::SdkError(
                "no object store configured for link delivery".to_string(),
            ))
        })?;

        let key = report_key(&self.config.reports_prefix, identifier.as_str());

        match blobs.object_exists(&key).await {
            Ok(true) => {}
            Ok(false) | Err(StorageError::ObjectNotFound(_)) | Err(StorageError::AccessDenied(_)) => {
                return Err(ReportError::ArtifactNotFound(key));
            }
            Err(e) => return Err(e.into()),
        }

        let reference = blobs.presign_get(&key, self.config.signed_url_expiry).await?;
        tracing::info!(
            "Issued signed link for {} valid for {}s (until {:?})",
            key,
            self.config.signed_url_expiry.as_secs(),
            reference.expires_at()
        );
        Ok(reference)
    }

    /// Build the streamed PDF for a found record
    pub fn render(&self, record: &StudentRecord) -> Delivery {
        let sections = build_sections(record, self.config.year);
        let title = format!("PAJSK Report {} - {}", self.config.year, record.name);
        let stream = render_document(sections, title, PageLayout::A4);

        Delivery::Document {
            filename: format!(
                "{}_{}.pdf",
                self.config.filename_prefix,
                filename_safe(&record.id_card)
            ),
            stream: Box::pin(stream),
        }
    }

    /// Run the full pipeline for one identifier
    #[tracing::instrument(skip(self), fields(mode = %self.config.mode))]
    pub async fn deliver(&self, identifier: Identifier) -> Result<Delivery> {
        let record = self.lookup(&identifier).await?;

        match self.config.mode {
            DeliveryMode::Link => self.resolve_artifact(&identifier).await.map(Delivery::Link),
            DeliveryMode::Render => Ok(self.render(&record)),
        }
    }
}

/// Keep a file name header-safe
fn filename_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
