/// PostgreSQL-backed document store
///
/// All collections share one table created by the embedded migrations:
///
/// ```sql
/// CREATE TABLE documents (
///     collection TEXT NOT NULL,
///     id TEXT NOT NULL,
///     data JSONB NOT NULL,
///     version BIGINT NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (collection, id)
/// );
/// ```
///
/// Transactions run at `SERIALIZABLE` isolation, so predicate reads (the
/// email query during signup) are protected against phantoms. PostgreSQL
/// reports a lost race as SQLSTATE `40001` or `40P01`; both surface as
/// [`StoreError::Conflict`] so callers can retry.
///
/// # Example
///
/// ```no_run
/// use globetrotter_shared::db::pool::{create_pool, DatabaseConfig};
/// use globetrotter_shared::store::{postgres::PgDocumentStore, DocumentKey, DocumentStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgDocumentStore::new(pool);
/// let counter = store.get(&DocumentKey::new("counters", "user_count")).await?;
/// # Ok(())
/// # }
/// ```

use super::{Document, DocumentKey, DocumentStore, StoreError, StoreResult, Transaction};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{types::Json, PgConnection, PgPool, Postgres};
use tracing::{debug, warn};

/// SQLSTATE codes that mean "another transaction won, try again"
const RETRYABLE_SQLSTATES: &[&str] = &["40001", "40P01"];

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

const UPSERT_DOCUMENT: &str = r#"
    INSERT INTO documents (collection, id, data, version)
    VALUES ($1, $2, $3, 1)
    ON CONFLICT (collection, id)
    DO UPDATE SET data = EXCLUDED.data,
                  version = documents.version + 1,
                  updated_at = NOW()
"#;

const SELECT_DOCUMENT: &str = r#"
    SELECT data, version
    FROM documents
    WHERE collection = $1 AND id = $2
"#;

const SELECT_BY_FIELD: &str = r#"
    SELECT id, data, version
    FROM documents
    WHERE collection = $1 AND data @> jsonb_build_object($2::text, $3::jsonb)
    ORDER BY id
"#;

/// Maps sqlx failures onto store errors, classifying serialization races
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            let code: &str = &code;
            if RETRYABLE_SQLSTATES.contains(&code) {
                return StoreError::Conflict(format!("serialization failure ({})", code));
            }
            if code == UNIQUE_VIOLATION {
                return StoreError::Conflict(format!("concurrent insert ({})", code));
            }
        }
    }
    StoreError::Database(err)
}

async fn fetch_document(
    conn: &mut PgConnection,
    key: &DocumentKey,
) -> StoreResult<Option<Document>> {
    let row: Option<(Json<JsonValue>, i64)> = sqlx::query_as(SELECT_DOCUMENT)
        .bind(&key.collection)
        .bind(&key.id)
        .fetch_optional(conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(row.map(|(Json(data), version)| Document {
        key: key.clone(),
        data,
        version,
    }))
}

async fn fetch_by_field(
    conn: &mut PgConnection,
    collection: &str,
    field: &str,
    value: &JsonValue,
) -> StoreResult<Vec<Document>> {
    let rows: Vec<(String, Json<JsonValue>, i64)> = sqlx::query_as(SELECT_BY_FIELD)
        .bind(collection)
        .bind(field)
        .bind(Json(value))
        .fetch_all(conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(rows
        .into_iter()
        .map(|(id, Json(data), version)| Document {
            key: DocumentKey::new(collection, id),
            data,
            version,
        })
        .collect())
}

async fn upsert_document(
    conn: &mut PgConnection,
    key: &DocumentKey,
    data: &JsonValue,
) -> StoreResult<()> {
    sqlx::query(UPSERT_DOCUMENT)
        .bind(&key.collection)
        .bind(&key.id)
        .bind(Json(data))
        .execute(conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

/// Document store over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health checks and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        fetch_document(&mut conn, key).await
    }

    async fn set(&self, key: &DocumentKey, data: JsonValue) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        upsert_document(&mut conn, key, &data).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> StoreResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        fetch_by_field(&mut conn, collection, field, value).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Box::new(PgTransaction {
            tx: Some(tx),
            writes: Vec::new(),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// Serializable transaction with buffered writes
pub struct PgTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
    writes: Vec<(DocumentKey, JsonValue)>,
}

impl PgTransaction {
    fn connection(&mut self) -> StoreResult<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(StoreError::TransactionClosed),
        }
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn get(&mut self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        fetch_document(self.connection()?, key).await
    }

    async fn find_by_field(
        &mut self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> StoreResult<Vec<Document>> {
        fetch_by_field(self.connection()?, collection, field, value).await
    }

    fn set(&mut self, key: DocumentKey, data: JsonValue) {
        self.writes.push((key, data));
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let mut tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;

        for (key, data) in std::mem::take(&mut self.writes) {
            if let Err(e) = upsert_document(&mut *tx, &key, &data).await {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed write also failed");
                }
                return Err(e);
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!("Postgres transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        self.writes.clear();
        tx.rollback().await.map_err(map_sqlx_error)
    }
}
