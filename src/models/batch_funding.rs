use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::{Filter, Repository};

pub const TABLE: &str = "batch_fundings";

/// Initial cash funding tied 1:1 to a transaction batch at creation.
/// Immutable after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchFunding {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by_id: Uuid,

    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub transaction_batch_id: Uuid,
    pub provided_by_user_id: Uuid,

    pub name: String,
    pub description: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub signature_media_id: Option<Uuid>,
}

impl BatchFunding {
    pub fn repository(pool: PgPool) -> Repository<BatchFunding> {
        Repository::new(TABLE, pool)
    }

    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        rec: &BatchFunding,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO batch_fundings (
                id, created_at, created_by_id,
                organization_id, branch_id, transaction_batch_id, provided_by_user_id,
                name, description, amount, currency_code, signature_media_id
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        )
        .bind(rec.id)
        .bind(rec.created_at)
        .bind(rec.created_by_id)
        .bind(rec.organization_id)
        .bind(rec.branch_id)
        .bind(rec.transaction_batch_id)
        .bind(rec.provided_by_user_id)
        .bind(&rec.name)
        .bind(&rec.description)
        .bind(rec.amount)
        .bind(&rec.currency_code)
        .bind(rec.signature_media_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn for_batch(
        pool: PgPool,
        transaction_batch_id: Uuid,
    ) -> Result<Vec<BatchFunding>, DatabaseError> {
        Self::repository(pool)
            .select_any(Filter::new().eq("transaction_batch_id", transaction_batch_id))
            .await
    }
}
