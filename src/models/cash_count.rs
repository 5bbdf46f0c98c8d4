use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::{Filter, Repository};

pub const TABLE: &str = "cash_counts";

/// A counted cash amount attributed to an open batch
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashCount {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub updated_by_id: Uuid,

    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub transaction_batch_id: Uuid,
    pub employee_user_id: Uuid,

    pub name: String,
    pub amount: Decimal,
}

impl CashCount {
    pub fn repository(pool: PgPool) -> Repository<CashCount> {
        Repository::new(TABLE, pool)
    }

    pub async fn for_batch(
        pool: PgPool,
        transaction_batch_id: Uuid,
    ) -> Result<Vec<CashCount>, DatabaseError> {
        Self::repository(pool)
            .select_any(
                Filter::new()
                    .eq("transaction_batch_id", transaction_batch_id)
                    .order_desc("created_at"),
            )
            .await
    }

    /// Sum of counted amounts for a batch; the cash-count total used by the
    /// batch's derived figures.
    pub async fn total_for_batch(
        pool: &PgPool,
        transaction_batch_id: Uuid,
    ) -> Result<Decimal, DatabaseError> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM cash_counts WHERE transaction_batch_id = $1",
        )
        .bind(transaction_batch_id)
        .fetch_one(pool)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }

    pub async fn insert(pool: &PgPool, rec: &CashCount) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO cash_counts (
                id, created_at, created_by_id, updated_at, updated_by_id,
                organization_id, branch_id, transaction_batch_id, employee_user_id,
                name, amount
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
        )
        .bind(rec.id)
        .bind(rec.created_at)
        .bind(rec.created_by_id)
        .bind(rec.updated_at)
        .bind(rec.updated_by_id)
        .bind(rec.organization_id)
        .bind(rec.branch_id)
        .bind(rec.transaction_batch_id)
        .bind(rec.employee_user_id)
        .bind(&rec.name)
        .bind(rec.amount)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM cash_counts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Cash count not found".to_string()));
        }
        Ok(())
    }
}
