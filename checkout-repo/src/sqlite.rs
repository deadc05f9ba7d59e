//! SQLite repository adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use checkout_types::{
    ConfirmationJob, ConfirmationStatus, Order, OrderId, OrderRepository, OrderStatus,
    PaymentAttempt, PaymentConfirmation, Receipt, RepoError, SettleOutcome,
};

use crate::types::{DbConfirmation, DbOrder, DbOrderStatus, parse_status};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_orders.sql");
        sqlx::query(ddl).execute(&pool).await?;

        let ddl_settlement = include_str!("../migrations/0002_create_settlement.sql");
        sqlx::query(ddl_settlement).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Maps sqlx failures; CHECK violations become validation errors so the
/// orchestrator can surface them as `OrderValidationFailed` and never retry.
fn map_db_err(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::Database(db) if db.is_check_violation() => {
            RepoError::Validation(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        other => RepoError::Database(other.to_string()),
    }
}

const ORDER_COLUMNS: &str = "id, client_id, service_id, package_type, quantity, amount_usd, \
     amount_eur, amount_inr, currency, status, external_invoice_id, external_customer_id, \
     created_at, updated_at";

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create_order(&self, order: &Order) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO orders
               (id, client_id, service_id, package_type, quantity, amount_usd, amount_eur,
                amount_inr, currency, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(order.id.to_string())
        .bind(order.client_id.to_string())
        .bind(order.service_id.to_string())
        .bind(order.package.as_str())
        .bind(i64::from(order.quantity))
        .bind(order.amounts.usd)
        .bind(order.amounts.eur)
        .bind(order.amounts.inr)
        .bind(order.currency.code())
        .bind(order.status.as_str())
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(DbOrder::into_domain).transpose()
    }

    async fn link_external_refs(
        &self,
        id: OrderId,
        invoice_id: &str,
        customer_id: &str,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE orders
               SET external_invoice_id = ?, external_customer_id = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(invoice_id)
        .bind(customer_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_by_external_invoice(
        &self,
        invoice_id: &str,
    ) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE external_invoice_id = ?"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(DbOrder::into_domain).transpose()
    }

    async fn settle(
        &self,
        invoice_id: &str,
        next: OrderStatus,
    ) -> Result<SettleOutcome, RepoError> {
        let current: Option<DbOrderStatus> =
            sqlx::query_as(r#"SELECT status FROM orders WHERE external_invoice_id = ?"#)
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;

        let Some(current) = current else {
            return Ok(SettleOutcome::NotFound);
        };
        let current = parse_status(&current.status)?;

        if current == next || next == OrderStatus::Pending {
            return Ok(SettleOutcome::Unchanged);
        }

        // Compare-and-set: only pending rows move, so a racing delivery of
        // the same event observes rows_affected == 0 and reports a no-op.
        let result = sqlx::query(
            r#"UPDATE orders SET status = ?, updated_at = ?
               WHERE external_invoice_id = ? AND status = 'PENDING'"#,
        )
        .bind(next.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 1 {
            Ok(SettleOutcome::Updated)
        } else {
            Ok(SettleOutcome::Unchanged)
        }
    }

    async fn create_receipt(&self, receipt: &Receipt) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO receipts
               (id, order_id, external_invoice_id, amount, currency, paid_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(receipt.id.to_string())
        .bind(receipt.order_id.to_string())
        .bind(&receipt.external_invoice_id)
        .bind(receipt.amount)
        .bind(receipt.currency.code())
        .bind(receipt.paid_at.to_rfc3339())
        .bind(receipt.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn enqueue_confirmation(
        &self,
        order_id: OrderId,
        payload: &PaymentConfirmation,
    ) -> Result<bool, RepoError> {
        let payload_json =
            serde_json::to_string(payload).map_err(|e| RepoError::Database(e.to_string()))?;

        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO confirmations (id, order_id, payload, status, created_at)
               VALUES (?, ?, ?, 'PENDING', ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(order_id.to_string())
        .bind(payload_json)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_attempt(&self, attempt: &PaymentAttempt) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO payment_attempts (id, intent_id, client_id, outcome, error, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(attempt.id.to_string())
        .bind(attempt.intent_id.to_string())
        .bind(attempt.client_id.map(|id| id.to_string()))
        .bind(attempt.outcome.as_str())
        .bind(&attempt.error)
        .bind(attempt.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn pending_confirmations(
        &self,
        limit: i64,
    ) -> Result<Vec<ConfirmationJob>, RepoError> {
        let rows: Vec<DbConfirmation> = sqlx::query_as(
            r#"SELECT id, order_id, payload, status, created_at, processed_at, attempts, last_error
               FROM confirmations
               WHERE status = 'PENDING'
               ORDER BY created_at ASC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(DbConfirmation::into_domain).collect()
    }

    async fn mark_confirmation(
        &self,
        id: Uuid,
        delivered: bool,
        last_error: Option<String>,
    ) -> Result<(), RepoError> {
        let status = if delivered {
            ConfirmationStatus::Delivered
        } else {
            ConfirmationStatus::Failed
        };

        sqlx::query(
            r#"UPDATE confirmations
               SET status = ?, processed_at = ?, last_error = ?, attempts = attempts + 1
               WHERE id = ?"#,
        )
        .bind(status.as_ref())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(last_error)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }
}
