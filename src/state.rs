//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::db::RecordStore;
use crate::report::ReportService;
use crate::storage::BlobStore;

/// Shared application state
///
/// Holds only request-independent handles: the validated configuration and
/// the store clients behind the report service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    reports: ReportService,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        config: Config,
        records: Arc<dyn RecordStore>,
        blobs: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        let reports = ReportService::new(records, blobs, config.report.clone());
        Self {
            inner: Arc::new(AppStateInner { config, reports }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the report service
    pub fn reports(&self) -> &ReportService {
        &self.inner.reports
    }
}
