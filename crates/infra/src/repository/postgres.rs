//! Postgres-backed batch repository.
//!
//! ## Schema
//!
//! Two tables, keyed by the natural references the domain already carries:
//!
//! ```sql
//! CREATE TABLE batches (
//!     reference           TEXT PRIMARY KEY,
//!     sku                 TEXT NOT NULL,
//!     purchased_quantity  BIGINT NOT NULL,
//!     eta                 DATE
//! );
//!
//! CREATE TABLE allocations (
//!     batch_reference  TEXT NOT NULL REFERENCES batches (reference) ON DELETE CASCADE,
//!     order_ref        TEXT NOT NULL,
//!     sku              TEXT NOT NULL,
//!     quantity         BIGINT NOT NULL,
//!     PRIMARY KEY (batch_reference, order_ref)
//! );
//! ```
//!
//! `eta IS NULL` marks warehouse stock. On `update` the allocation rows are
//! rewritten wholesale inside one transaction: the per-batch set is small,
//! and a rewrite keeps the stored state exactly what the entity says it is.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError | Scenario |
//! |------------|----------------------|-----------------|----------|
//! | Database (unique violation on `add`) | `23505` | `Duplicate` | Batch reference already taken |
//! | Database (other) | Any other | `Storage` | Constraint or database failure |
//! | PoolClosed | N/A | `Storage` | Connection pool was closed |
//! | Other | N/A | `Storage` | Network errors, connection failures, etc. |
//!
//! ## Thread Safety
//!
//! `PostgresBatchRepository` is `Send + Sync` and can be shared across
//! threads. All operations go through the SQLx connection pool, which
//! handles thread-safe connection management.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use stocklot_allocation::{Batch, OrderLine};
use stocklot_core::BatchRef;

use super::{BatchRepository, RepositoryError};

/// Postgres-backed batch repository.
///
/// Writes run inside a transaction so a batch and its allocation rows can
/// never diverge: either both land or neither does.
#[derive(Debug, Clone)]
pub struct PostgresBatchRepository {
    pool: Arc<PgPool>,
}

impl PostgresBatchRepository {
    /// Create a new repository on top of the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Insert a new batch together with its allocation rows.
    ///
    /// A unique violation on the batch reference maps to
    /// [`RepositoryError::Duplicate`].
    #[instrument(skip(self, batch), fields(reference = %batch.reference()), err)]
    pub async fn add(&self, batch: &Batch) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO batches (reference, sku, purchased_quantity, eta)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(batch.reference().as_str())
        .bind(batch.sku().as_str())
        .bind(batch.purchased_quantity())
        .bind(batch.eta())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Duplicate(batch.reference().clone())
            } else {
                map_sqlx_error("insert_batch", e)
            }
        })?;

        insert_allocations(&mut tx, batch).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    /// Load one batch by reference, rehydrating its allocations.
    #[instrument(
        skip(self, reference),
        fields(reference = %reference, allocation_count = tracing::field::Empty),
        err
    )]
    pub async fn get(&self, reference: &BatchRef) -> Result<Batch, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT reference, sku, purchased_quantity, eta
            FROM batches
            WHERE reference = $1
            "#,
        )
        .bind(reference.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("select_batch", e))?
        .ok_or_else(|| RepositoryError::NotFound(reference.clone()))?;

        let batch_row = BatchRow::from_row(&row)
            .map_err(|e| RepositoryError::Storage(format!("failed to read batch row: {e}")))?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_ref, sku, quantity
            FROM allocations
            WHERE batch_reference = $1
            "#,
        )
        .bind(reference.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("select_allocations", e))?;

        let mut lines = Vec::with_capacity(line_rows.len());
        for row in line_rows {
            let line = OrderLineRow::from_row(&row).map_err(|e| {
                RepositoryError::Storage(format!("failed to read allocation row: {e}"))
            })?;
            lines.push(line.into());
        }

        Span::current().record("allocation_count", lines.len());
        Ok(batch_row.into_batch(lines))
    }

    /// Persist the current state of an existing batch.
    ///
    /// The allocation rows are deleted and re-inserted in the same
    /// transaction as the batch update.
    #[instrument(skip(self, batch), fields(reference = %batch.reference()), err)]
    pub async fn update(&self, batch: &Batch) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE batches
            SET sku = $2, purchased_quantity = $3, eta = $4
            WHERE reference = $1
            "#,
        )
        .bind(batch.reference().as_str())
        .bind(batch.sku().as_str())
        .bind(batch.purchased_quantity())
        .bind(batch.eta())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_batch", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(RepositoryError::NotFound(batch.reference().clone()));
        }

        sqlx::query("DELETE FROM allocations WHERE batch_reference = $1")
            .bind(batch.reference().as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_allocations", e))?;

        insert_allocations(&mut tx, batch).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    /// Load every stored batch, ordered by reference.
    #[instrument(skip(self), fields(batch_count = tracing::field::Empty), err)]
    pub async fn list(&self) -> Result<Vec<Batch>, RepositoryError> {
        let batch_rows = sqlx::query(
            r#"
            SELECT reference, sku, purchased_quantity, eta
            FROM batches
            ORDER BY reference ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("select_batches", e))?;

        let line_rows = sqlx::query(
            r#"
            SELECT batch_reference, order_ref, sku, quantity
            FROM allocations
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("select_allocations", e))?;

        let mut lines_by_batch: HashMap<String, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            let batch_reference: String = row.try_get("batch_reference").map_err(|e| {
                RepositoryError::Storage(format!("failed to read batch_reference: {e}"))
            })?;
            let line = OrderLineRow::from_row(&row).map_err(|e| {
                RepositoryError::Storage(format!("failed to read allocation row: {e}"))
            })?;
            lines_by_batch
                .entry(batch_reference)
                .or_default()
                .push(line.into());
        }

        let mut batches = Vec::with_capacity(batch_rows.len());
        for row in batch_rows {
            let batch_row = BatchRow::from_row(&row)
                .map_err(|e| RepositoryError::Storage(format!("failed to read batch row: {e}")))?;
            let lines = lines_by_batch
                .remove(&batch_row.reference)
                .unwrap_or_default();
            batches.push(batch_row.into_batch(lines));
        }

        Span::current().record("batch_count", batches.len());
        Ok(batches)
    }
}

#[async_trait]
impl BatchRepository for PostgresBatchRepository {
    async fn add(&self, batch: &Batch) -> Result<(), RepositoryError> {
        self.add(batch).await
    }

    async fn get(&self, reference: &BatchRef) -> Result<Batch, RepositoryError> {
        self.get(reference).await
    }

    async fn update(&self, batch: &Batch) -> Result<(), RepositoryError> {
        self.update(batch).await
    }

    async fn list(&self) -> Result<Vec<Batch>, RepositoryError> {
        self.list().await
    }
}

/// Insert one row per allocation of `batch`.
async fn insert_allocations(
    tx: &mut Transaction<'_, Postgres>,
    batch: &Batch,
) -> Result<(), RepositoryError> {
    for line in batch.allocations() {
        sqlx::query(
            r#"
            INSERT INTO allocations (batch_reference, order_ref, sku, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(batch.reference().as_str())
        .bind(line.order_ref().as_str())
        .bind(line.sku().as_str())
        .bind(line.quantity())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_allocation", e))?;
    }
    Ok(())
}

/// Map SQLx errors to RepositoryError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => RepositoryError::Storage(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            RepositoryError::Storage(format!("unexpected row not found in {operation}"))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

#[derive(Debug)]
struct BatchRow {
    reference: String,
    sku: String,
    purchased_quantity: i64,
    eta: Option<NaiveDate>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for BatchRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(BatchRow {
            reference: row.try_get("reference")?,
            sku: row.try_get("sku")?,
            purchased_quantity: row.try_get("purchased_quantity")?,
            eta: row.try_get("eta")?,
        })
    }
}

impl BatchRow {
    fn into_batch(self, allocations: Vec<OrderLine>) -> Batch {
        Batch::rehydrate(
            self.reference,
            self.sku,
            self.purchased_quantity,
            self.eta,
            allocations,
        )
    }
}

#[derive(Debug)]
struct OrderLineRow {
    order_ref: String,
    sku: String,
    quantity: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderLineRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderLineRow {
            order_ref: row.try_get("order_ref")?,
            sku: row.try_get("sku")?,
            quantity: row.try_get("quantity")?,
        })
    }
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine::new(row.order_ref, row.sku, row.quantity)
    }
}
