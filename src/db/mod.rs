//! Database module for the PostgreSQL record store
//!
//! Student assessment records live in a single table keyed by IC number.

mod records;

pub use records::*;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

/// Create a new database connection pool
///
/// Connections are opened lazily, so the server starts even when the
/// database is briefly unreachable; the first lookup surfaces the fault.
pub fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_lazy(&config.url)
}
