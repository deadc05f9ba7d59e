//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use checkout_types::{
    ConfirmationJob, ConfirmationStatus, Order, OrderId, OrderRepository, OrderStatus,
    PaymentAttempt, PaymentConfirmation, Receipt, RepoError, SettleOutcome,
};

use crate::types::{DbConfirmation, DbOrder, DbOrderStatus, parse_status};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository implementation.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_orders_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_settlement_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

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
impl OrderRepository for PostgresRepo {
    async fn create_order(&self, order: &Order) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO orders
               (id, client_id, service_id, package_type, quantity, amount_usd, amount_eur,
                amount_inr, currency, status, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(order.id.as_uuid())
        .bind(order.client_id.as_uuid())
        .bind(order.service_id.as_uuid())
        .bind(order.package.as_str())
        .bind(i64::from(order.quantity))
        .bind(order.amounts.usd)
        .bind(order.amounts.eur)
        .bind(order.amounts.inr)
        .bind(order.currency.code())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
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
               SET external_invoice_id = $1, external_customer_id = $2, updated_at = $3
               WHERE id = $4"#,
        )
        .bind(invoice_id)
        .bind(customer_id)
        .bind(Utc::now())
        .bind(id.as_uuid())
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
            "SELECT {ORDER_COLUMNS} FROM orders WHERE external_invoice_id = $1"
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
            sqlx::query_as(r#"SELECT status FROM orders WHERE external_invoice_id = $1"#)
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

        let result = sqlx::query(
            r#"UPDATE orders SET status = $1, updated_at = $2
               WHERE external_invoice_id = $3 AND status = 'PENDING'"#,
        )
        .bind(next.as_str())
        .bind(Utc::now())
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
            r#"INSERT INTO receipts
               (id, order_id, external_invoice_id, amount, currency, paid_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (order_id) DO NOTHING"#,
        )
        .bind(receipt.id)
        .bind(receipt.order_id.as_uuid())
        .bind(&receipt.external_invoice_id)
        .bind(receipt.amount)
        .bind(receipt.currency.code())
        .bind(receipt.paid_at)
        .bind(receipt.created_at)
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
            serde_json::to_value(payload).map_err(|e| RepoError::Database(e.to_string()))?;

        let result = sqlx::query(
            r#"INSERT INTO confirmations (id, order_id, payload, status, created_at)
               VALUES ($1, $2, $3, 'PENDING', $4)
               ON CONFLICT (order_id) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id.as_uuid())
        .bind(payload_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_attempt(&self, attempt: &PaymentAttempt) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO payment_attempts (id, intent_id, client_id, outcome, error, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(attempt.id)
        .bind(attempt.intent_id.as_uuid())
        .bind(attempt.client_id.map(|id| *id.as_uuid()))
        .bind(attempt.outcome.as_str())
        .bind(&attempt.error)
        .bind(attempt.created_at)
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
               LIMIT $1"#,
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
               SET status = $1, processed_at = $2, last_error = $3, attempts = attempts + 1
               WHERE id = $4"#,
        )
        .bind(status.as_ref())
        .bind(Utc::now())
        .bind(last_error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }
}
