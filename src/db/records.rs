//! Student record lookups

use async_trait::async_trait;
use sqlx::PgPool;

/// A student's PAJSK assessment record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StudentRecord {
    pub id_card: String,
    pub name: String,
    pub class_name: String,
    /// Club or society
    pub co_curricular: Option<String>,
    pub sport: Option<String>,
    pub uniformed_body: Option<String>,
    pub remarks: Option<String>,
}

/// Result of looking up a single record
///
/// An empty result is an ordinary outcome, kept apart from store faults.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(StudentRecord),
    NotFound,
    Fault(String),
}

impl LookupOutcome {
    /// Classify a single-row query result
    ///
    /// Only the driver's "no rows" sentinel means `NotFound`; every other
    /// error is a fault.
    pub fn from_query(result: Result<StudentRecord, sqlx::Error>) -> Self {
        match result {
            Ok(record) => LookupOutcome::Found(record),
            Err(sqlx::Error::RowNotFound) => LookupOutcome::NotFound,
            Err(e) => LookupOutcome::Fault(e.to_string()),
        }
    }
}

/// Store that can find a record by its unique identifier
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str) -> LookupOutcome;
}

/// Record store backed by PostgreSQL
pub struct PgRecordStore {
    pool: PgPool,
    query: String,
}

impl PgRecordStore {
    /// `table` must already be validated as a plain identifier
    pub fn new(pool: PgPool, table: &str) -> Self {
        let query = format!(
            r#"
            SELECT id_card, name, class_name, co_curricular, sport,
                   uniformed_body, remarks
            FROM {}
            WHERE id_card = $1
            LIMIT 1
            "#,
            table
        );
        Self { pool, query }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_by_identifier(&self, identifier: &str) -> LookupOutcome {
        let result = sqlx::query_as::<_, StudentRecord>(&self.query)
            .bind(identifier)
            .fetch_one(&self.pool)
            .await;

        LookupOutcome::from_query(result)
    }
}
