//! Call-history persistence
//!
//! Records are written once by the audit workers and only read afterwards.
//! Timestamps are stored as fixed-width RFC 3339 text, so range filters and
//! ordering work on the text column directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::CallRecord;
use crate::pagination::{PageRequest, PageResult};
use pcs_common::{time, Error, Result};

const SELECT_COLUMNS: &str = "SELECT id, endpoint, http_method, request_params, response, \
     error_message, http_status_code, timestamp FROM call_history";

const FAILED_FILTER: &str = "(http_status_code >= 400 OR error_message IS NOT NULL)";

/// Storage of audited calls
#[async_trait]
pub trait CallHistoryStore: Send + Sync {
    async fn save(&self, record: &CallRecord) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallRecord>>;

    async fn find_all(&self, page: &PageRequest) -> Result<PageResult<CallRecord>>;

    /// Calls with `from <= timestamp < to`
    async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: &PageRequest,
    ) -> Result<PageResult<CallRecord>>;

    async fn find_by_endpoint(&self, endpoint: &str, page: &PageRequest)
        -> Result<PageResult<CallRecord>>;

    async fn find_successful(&self, page: &PageRequest) -> Result<PageResult<CallRecord>>;

    /// Calls with an error status or an error message
    async fn find_failed(&self, page: &PageRequest) -> Result<PageResult<CallRecord>>;

    async fn count(&self) -> Result<u64>;
}

/// SQLite-backed call history
#[derive(Clone)]
pub struct SqliteCallHistoryStore {
    pool: SqlitePool,
}

impl SqliteCallHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_page(
        &self,
        filter: Option<&str>,
        params: Vec<String>,
        page: &PageRequest,
    ) -> Result<PageResult<CallRecord>> {
        let where_clause = filter
            .map(|f| format!(" WHERE {}", f))
            .unwrap_or_default();

        let count_sql = format!("SELECT COUNT(*) FROM call_history{}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in &params {
            count_query = count_query.bind(value.as_str());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let rows_sql = format!(
            "{}{} {} LIMIT ? OFFSET ?",
            SELECT_COLUMNS,
            where_clause,
            page.order_by()
        );
        let mut rows_query = sqlx::query(&rows_sql);
        for value in &params {
            rows_query = rows_query.bind(value.as_str());
        }
        let rows = rows_query
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let content = rows.iter().map(row_to_record).collect::<Result<Vec<_>>>()?;

        Ok(PageResult::new(content, page, total.max(0) as u64))
    }
}

fn row_to_record(row: &SqliteRow) -> Result<CallRecord> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Corrupt call_history id '{}': {}", id, e)))?;
    let status: i64 = row.try_get("http_status_code")?;
    let status = u16::try_from(status)
        .map_err(|_| Error::Internal(format!("Corrupt call_history status code {}", status)))?;
    let timestamp: String = row.try_get("timestamp")?;
    let timestamp = time::parse_rfc3339(&timestamp)
        .map_err(|e| Error::Internal(format!("Corrupt call_history timestamp: {}", e)))?;

    CallRecord::from_parts(
        id,
        row.try_get("endpoint")?,
        row.try_get("http_method")?,
        row.try_get("request_params")?,
        row.try_get("response")?,
        row.try_get("error_message")?,
        status,
        timestamp,
    )
    .map_err(|e| Error::Internal(format!("Corrupt call_history row {}: {}", id, e)))
}

#[async_trait]
impl CallHistoryStore for SqliteCallHistoryStore {
    async fn save(&self, record: &CallRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO call_history
                (id, endpoint, http_method, request_params, response, error_message,
                 http_status_code, success, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.endpoint)
        .bind(&record.method)
        .bind(&record.request_params)
        .bind(&record.response)
        .bind(&record.error_message)
        .bind(record.status_code as i64)
        .bind(record.success)
        .bind(time::to_storage(&record.timestamp))
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %record.id, endpoint = %record.endpoint, "Saved call record");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallRecord>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_all(&self, page: &PageRequest) -> Result<PageResult<CallRecord>> {
        self.fetch_page(None, Vec::new(), page).await
    }

    async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: &PageRequest,
    ) -> Result<PageResult<CallRecord>> {
        if from > to {
            return Err(Error::InvalidInput(
                "'from' date must be before or equal to 'to' date".into(),
            ));
        }

        self.fetch_page(
            Some("timestamp >= ? AND timestamp < ?"),
            vec![time::to_storage(&from), time::to_storage(&to)],
            page,
        )
        .await
    }

    async fn find_by_endpoint(
        &self,
        endpoint: &str,
        page: &PageRequest,
    ) -> Result<PageResult<CallRecord>> {
        if endpoint.trim().is_empty() {
            return Err(Error::InvalidInput("Endpoint cannot be null or blank".into()));
        }

        self.fetch_page(
            Some("endpoint = ?"),
            vec![endpoint.to_string()],
            page,
        )
        .await
    }

    async fn find_successful(&self, page: &PageRequest) -> Result<PageResult<CallRecord>> {
        self.fetch_page(Some("success = 1"), Vec::new(), page).await
    }

    async fn find_failed(&self, page: &PageRequest) -> Result<PageResult<CallRecord>> {
        self.fetch_page(Some(FAILED_FILTER), Vec::new(), page).await
    }

    async fn count(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM call_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }
}
