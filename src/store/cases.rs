// omnisync/src/store/cases.rs
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use std::path::Path;
use std::time::Duration;

use super::schema::{self, TrackedColumn, TRACKED_COLUMNS};
use crate::errors::{AppError, Result};
use crate::omni::pages::RawCase;

/// One row of the `cases` table, as read back for checks.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCase {
    pub id: i64,
    pub omni_case_id: i64,
    pub case_number: Option<String>,
    pub subject: String,
    pub status: Option<String>,
    pub priority: String,
    pub channel: Option<String>,
    pub cc_emails: String,
    pub deleted: Option<i64>,
    pub spam: Option<i64>,
    pub parent_case_id: Option<i64>,
    pub language_id: Option<i64>,
}

/// A value ready to be bound to one SQLite parameter.
#[derive(Debug, Clone, PartialEq)]
enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ColumnValue {
    fn from_field(field: Option<&Value>, column: &TrackedColumn) -> Self {
        match field {
            None | Some(Value::Null) => match column.absent_default {
                Some(default) => ColumnValue::Text(default.to_string()),
                None => ColumnValue::Null,
            },
            Some(Value::Bool(b)) => ColumnValue::Integer(i64::from(*b)),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => ColumnValue::Integer(i),
                None => n.as_f64().map_or(ColumnValue::Null, ColumnValue::Real),
            },
            Some(Value::String(s)) => ColumnValue::Text(s.clone()),
            Some(other) => ColumnValue::Text(other.to_string()),
        }
    }

    fn bind_to<'q>(
        self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            ColumnValue::Null => query.bind(None::<String>),
            ColumnValue::Integer(v) => query.bind(v),
            ColumnValue::Real(v) => query.bind(v),
            ColumnValue::Text(v) => query.bind(v),
        }
    }
}

/// Local SQLite table of synchronized cases. The only writer of `cases`.
pub struct CaseStore {
    pool: Pool<Sqlite>,
    upsert_sql: String,
}

impl CaseStore {
    /// Opens (creating if needed) the database file and its schema.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // One writer at a time; a single connection keeps the batch
        // transaction and later reads on the same handle.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        tracing::debug!("Opened case store at {}", path.display());
        Self::from_pool(pool).await
    }

    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: Pool<Sqlite>) -> Result<Self> {
        let store = Self {
            pool,
            upsert_sql: schema::upsert_statement(),
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the `cases` table and its unique index if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(schema::CREATE_CASES_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::CREATE_OMNI_CASE_ID_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Starts a batch; nothing it writes is visible until `commit`.
    pub async fn begin_batch(&self) -> Result<CaseBatch<'_>> {
        Ok(CaseBatch {
            tx: self.pool.begin().await?,
            upsert_sql: &self.upsert_sql,
            written: 0,
        })
    }

    /// Upserts every case in one transaction. On error nothing is kept.
    pub async fn upsert_all(&self, cases: &[RawCase]) -> Result<usize> {
        let mut batch = self.begin_batch().await?;
        for case in cases {
            batch.upsert(case).await?;
        }
        batch.commit().await
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cases")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[cfg(test)]
    pub async fn find_by_omni_id(&self, omni_case_id: i64) -> Result<Option<StoredCase>> {
        use sqlx::Row;

        let row = sqlx::query(
            "SELECT id, omni_case_id, case_number, subject, status, priority, channel, \
             cc_emails, deleted, spam, parent_case_id, language_id \
             FROM cases WHERE omni_case_id = ?",
        )
        .bind(omni_case_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(StoredCase {
            id: row.try_get("id")?,
            omni_case_id: row.try_get("omni_case_id")?,
            case_number: row.try_get("case_number")?,
            subject: row.try_get("subject")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            channel: row.try_get("channel")?,
            cc_emails: row.try_get("cc_emails")?,
            deleted: row.try_get("deleted")?,
            spam: row.try_get("spam")?,
            parent_case_id: row.try_get("parent_case_id")?,
            language_id: row.try_get("language_id")?,
        }))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Writes of one sync run. Dropping it without `commit` rolls back.
pub struct CaseBatch<'a> {
    tx: Transaction<'static, Sqlite>,
    upsert_sql: &'a str,
    written: usize,
}

impl CaseBatch<'_> {
    /// Inserts the case, or overwrites every tracked column of the row that
    /// already holds its `case_id`.
    pub async fn upsert(&mut self, case: &RawCase) -> Result<()> {
        let omni_case_id = case
            .get("case_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::malformed("case without an integer case_id"))?;

        let mut query = sqlx::query(self.upsert_sql).bind(omni_case_id);
        for column in TRACKED_COLUMNS {
            query = ColumnValue::from_field(case.get(column.name), column).bind_to(query);
        }
        query.execute(&mut *self.tx).await?;

        self.written += 1;
        tracing::debug!(omni_case_id, "Upserted case");
        Ok(())
    }

    /// Commits the batch and returns how many cases it wrote.
    pub async fn commit(self) -> Result<usize> {
        self.tx.commit().await?;
        Ok(self.written)
    }
}
