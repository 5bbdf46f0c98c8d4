use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::{Filter, Repository};

pub const TABLE: &str = "invitation_codes";

/// Shareable token granting eligibility to join an organization branch
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvitationCode {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub updated_by_id: Uuid,

    pub organization_id: Uuid,
    pub branch_id: Uuid,

    /// Membership type granted on redemption: member or employee
    pub user_type: String,
    pub code: String,
    pub expiration_date: DateTime<Utc>,
    pub max_use: i32,
    pub current_use: i32,
    pub description: String,

    // Permission template copied onto new memberships
    pub permission_name: String,
    pub permission_description: String,
    pub permissions: Vec<String>,
}

/// Why a code cannot be redeemed right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemBlock {
    Expired,
    Exhausted,
}

impl RedeemBlock {
    pub fn message(&self) -> &'static str {
        match self {
            RedeemBlock::Expired => "Invitation code has expired",
            RedeemBlock::Exhausted => "Invitation code has no remaining uses",
        }
    }
}

impl InvitationCode {
    pub fn repository(pool: PgPool) -> Repository<InvitationCode> {
        Repository::new(TABLE, pool)
    }

    pub async fn find_by_code(
        pool: PgPool,
        code: &str,
    ) -> Result<Option<InvitationCode>, DatabaseError> {
        Self::repository(pool)
            .select_one(Filter::new().eq("code", code))
            .await
    }

    /// Pure redemption gate: expiry and use-count checks against a supplied clock
    pub fn validate_redeemable(&self, now: DateTime<Utc>) -> Result<(), RedeemBlock> {
        if self.expiration_date <= now {
            return Err(RedeemBlock::Expired);
        }
        if self.current_use >= self.max_use {
            return Err(RedeemBlock::Exhausted);
        }
        Ok(())
    }

    /// Consume one use inside the caller's transaction. The WHERE guard makes
    /// the increment safe under concurrent redemptions: zero affected rows
    /// means the code was exhausted between read and write, and the caller
    /// must roll back.
    pub async fn redeem(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE invitation_codes
             SET current_use = current_use + 1, updated_at = now()
             WHERE id = $1 AND current_use < max_use",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn insert(pool: &PgPool, rec: &InvitationCode) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO invitation_codes (
                id, created_at, created_by_id, updated_at, updated_by_id,
                organization_id, branch_id, user_type, code, expiration_date,
                max_use, current_use, description,
                permission_name, permission_description, permissions
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)",
        )
        .bind(rec.id)
        .bind(rec.created_at)
        .bind(rec.created_by_id)
        .bind(rec.updated_at)
        .bind(rec.updated_by_id)
        .bind(rec.organization_id)
        .bind(rec.branch_id)
        .bind(&rec.user_type)
        .bind(&rec.code)
        .bind(rec.expiration_date)
        .bind(rec.max_use)
        .bind(rec.current_use)
        .bind(&rec.description)
        .bind(&rec.permission_name)
        .bind(&rec.permission_description)
        .bind(&rec.permissions)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, rec: &InvitationCode) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE invitation_codes SET
                updated_at = $2, updated_by_id = $3,
                user_type = $4, code = $5, expiration_date = $6, max_use = $7,
                description = $8, permission_name = $9, permission_description = $10,
                permissions = $11
             WHERE id = $1",
        )
        .bind(rec.id)
        .bind(rec.updated_at)
        .bind(rec.updated_by_id)
        .bind(&rec.user_type)
        .bind(&rec.code)
        .bind(rec.expiration_date)
        .bind(rec.max_use)
        .bind(&rec.description)
        .bind(&rec.permission_name)
        .bind(&rec.permission_description)
        .bind(&rec.permissions)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Invitation code not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM invitation_codes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Invitation code not found".to_string()));
        }
        Ok(())
    }

    /// All-or-nothing bulk delete
    pub async fn bulk_delete(pool: &PgPool, ids: &[Uuid]) -> Result<(), DatabaseError> {
        let mut tx = pool.begin().await?;
        for id in ids {
            let result = sqlx::query("DELETE FROM invitation_codes WHERE id = $1")
                .bind(*id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(DatabaseError::NotFound(format!("Invitation code {} not found", id)));
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code(max_use: i32, current_use: i32, expires_in_hours: i64) -> InvitationCode {
        let now = Utc::now();
        let id = Uuid::new_v4();
        InvitationCode {
            id,
            created_at: now,
            created_by_id: id,
            updated_at: now,
            updated_by_id: id,
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            user_type: "member".to_string(),
            code: "WELCOME-2024".to_string(),
            expiration_date: now + Duration::hours(expires_in_hours),
            max_use,
            current_use,
            description: String::new(),
            permission_name: "member".to_string(),
            permission_description: String::new(),
            permissions: vec!["ledger:read".to_string()],
        }
    }

    #[test]
    fn fresh_code_is_redeemable() {
        assert!(code(5, 0, 24).validate_redeemable(Utc::now()).is_ok());
    }

    #[test]
    fn exhausted_code_is_blocked() {
        assert_eq!(
            code(1, 1, 24).validate_redeemable(Utc::now()),
            Err(RedeemBlock::Exhausted)
        );
    }

    #[test]
    fn expired_code_is_blocked_before_use_count() {
        // Expiry wins even when uses remain
        assert_eq!(
            code(5, 0, -1).validate_redeemable(Utc::now()),
            Err(RedeemBlock::Expired)
        );
    }

    #[test]
    fn last_use_is_still_redeemable() {
        assert!(code(3, 2, 24).validate_redeemable(Utc::now()).is_ok());
    }
}
