use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::{Filter, Repository};

pub const TABLE: &str = "transaction_batches";

/// One named attestation on a batch: who signed, in what position, and the
/// media reference of the captured signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signatory {
    pub name: Option<String>,
    pub position: Option<String>,
    pub signature_media_id: Option<Uuid>,
}

/// The full attestation block. `PUT .../signature` replaces this document
/// wholesale, in any lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureBlock {
    pub employee: Option<Signatory>,
    pub approved: Option<Signatory>,
    pub prepared: Option<Signatory>,
    pub certified: Option<Signatory>,
    pub verified: Option<Signatory>,
    pub check: Option<Signatory>,
    pub acknowledge: Option<Signatory>,
    pub noted: Option<Signatory>,
    pub posted: Option<Signatory>,
    pub paid: Option<Signatory>,
}

/// One cash-handling session for an employee: opened with a funding amount,
/// accumulates cash activity, closed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionBatch {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub updated_by_id: Uuid,

    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub employee_user_id: Uuid,

    pub currency_code: String,
    pub batch_name: String,
    pub description: String,

    pub beginning_balance: Decimal,
    pub deposit_in_bank: Decimal,
    pub cash_count_total: Decimal,
    pub grand_total: Decimal,
    pub total_cash_handled: Decimal,
    pub total_deposit_in_bank: Decimal,

    // Accumulators maintained by flows outside this core
    pub total_cash_collection: Decimal,
    pub total_deposit_entry: Decimal,
    pub petty_cash: Decimal,
    pub loan_releases: Decimal,
    pub savings_withdrawal: Decimal,

    pub is_closed: bool,
    pub ended_at: Option<DateTime<Utc>>,

    pub can_view: bool,
    pub request_view: bool,

    pub signatures: Json<SignatureBlock>,
}

/// Reduced projection served whenever `can_view` is false: identity, scope
/// and headline figures only - no accumulators, no signatures.
#[derive(Debug, Clone, Serialize)]
pub struct MinimalBatch {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub employee_user_id: Uuid,
    pub currency_code: String,
    pub batch_name: String,
    pub description: String,
    pub beginning_balance: Decimal,
    pub deposit_in_bank: Decimal,
    pub cash_count_total: Decimal,
    pub grand_total: Decimal,
    pub is_closed: bool,
    pub ended_at: Option<DateTime<Utc>>,
    pub can_view: bool,
    pub request_view: bool,
}

impl From<&TransactionBatch> for MinimalBatch {
    fn from(b: &TransactionBatch) -> Self {
        Self {
            id: b.id,
            created_at: b.created_at,
            updated_at: b.updated_at,
            organization_id: b.organization_id,
            branch_id: b.branch_id,
            employee_user_id: b.employee_user_id,
            currency_code: b.currency_code.clone(),
            batch_name: b.batch_name.clone(),
            description: b.description.clone(),
            beginning_balance: b.beginning_balance,
            deposit_in_bank: b.deposit_in_bank,
            cash_count_total: b.cash_count_total,
            grand_total: b.grand_total,
            is_closed: b.is_closed,
            ended_at: b.ended_at,
            can_view: b.can_view,
            request_view: b.request_view,
        }
    }
}

impl TransactionBatch {
    pub fn repository(pool: PgPool) -> Repository<TransactionBatch> {
        Repository::new(TABLE, pool)
    }

    /// Visibility policy applied by every read path: full detail only when
    /// the view has been accepted.
    pub fn to_view(&self) -> Value {
        if self.can_view {
            serde_json::to_value(self).unwrap_or(Value::Null)
        } else {
            serde_json::to_value(MinimalBatch::from(self)).unwrap_or(Value::Null)
        }
    }

    pub fn in_scope(&self, organization_id: Uuid, branch_id: Uuid) -> bool {
        self.organization_id == organization_id && self.branch_id == branch_id
    }

    /// Re-derive the running totals from current state. Read-then-write, not
    /// a delta: callers pass the freshly summed cash-count total.
    pub fn recompute_totals(&mut self, cash_count_total: Decimal, deposit_in_bank: Decimal) {
        self.cash_count_total = cash_count_total;
        self.deposit_in_bank = deposit_in_bank;
        self.total_deposit_in_bank = deposit_in_bank;
        self.grand_total = cash_count_total + deposit_in_bank;
        self.total_cash_handled = self.beginning_balance + deposit_in_bank + cash_count_total;
    }

    /// The caller's open batch, if any. At most one exists per
    /// (organization, branch, employee) after a successful open.
    pub async fn current_open(
        pool: PgPool,
        employee_user_id: Uuid,
        organization_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<TransactionBatch>, DatabaseError> {
        Self::repository(pool)
            .select_one(
                Filter::new()
                    .eq("organization_id", organization_id)
                    .eq("branch_id", branch_id)
                    .eq("employee_user_id", employee_user_id)
                    .eq("is_closed", false)
                    .order_desc("updated_at"),
            )
            .await
    }

    /// Batches with an unanswered view request on the branch
    pub async fn view_requests(
        pool: PgPool,
        organization_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Vec<TransactionBatch>, DatabaseError> {
        Self::repository(pool)
            .select_any(
                Filter::new()
                    .eq("organization_id", organization_id)
                    .eq("branch_id", branch_id)
                    .eq("request_view", true)
                    .eq("can_view", false)
                    .eq("is_closed", false)
                    .order_desc("updated_at"),
            )
            .await
    }

    /// Batches closed today on the branch
    pub async fn ended_today(
        pool: &PgPool,
        organization_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Vec<TransactionBatch>, DatabaseError> {
        let now = Utc::now();
        let start_of_day = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let end_of_day = start_of_day + chrono::Duration::days(1);

        let rows = sqlx::query_as::<_, TransactionBatch>(
            "SELECT * FROM transaction_batches
             WHERE organization_id = $1 AND branch_id = $2 AND is_closed = TRUE
               AND ended_at >= $3 AND ended_at < $4
             ORDER BY updated_at DESC",
        )
        .bind(organization_id)
        .bind(branch_id)
        .bind(start_of_day)
        .bind(end_of_day)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        rec: &TransactionBatch,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO transaction_batches (
                id, created_at, created_by_id, updated_at, updated_by_id,
                organization_id, branch_id, employee_user_id,
                currency_code, batch_name, description,
                beginning_balance, deposit_in_bank, cash_count_total, grand_total,
                total_cash_handled, total_deposit_in_bank,
                total_cash_collection, total_deposit_entry, petty_cash,
                loan_releases, savings_withdrawal,
                is_closed, ended_at, can_view, request_view, signatures
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23,$24,$25,$26,$27)",
        )
        .bind(rec.id)
        .bind(rec.created_at)
        .bind(rec.created_by_id)
        .bind(rec.updated_at)
        .bind(rec.updated_by_id)
        .bind(rec.organization_id)
        .bind(rec.branch_id)
        .bind(rec.employee_user_id)
        .bind(&rec.currency_code)
        .bind(&rec.batch_name)
        .bind(&rec.description)
        .bind(rec.beginning_balance)
        .bind(rec.deposit_in_bank)
        .bind(rec.cash_count_total)
        .bind(rec.grand_total)
        .bind(rec.total_cash_handled)
        .bind(rec.total_deposit_in_bank)
        .bind(rec.total_cash_collection)
        .bind(rec.total_deposit_entry)
        .bind(rec.petty_cash)
        .bind(rec.loan_releases)
        .bind(rec.savings_withdrawal)
        .bind(rec.is_closed)
        .bind(rec.ended_at)
        .bind(rec.can_view)
        .bind(rec.request_view)
        .bind(&rec.signatures)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn update_totals(pool: &PgPool, rec: &TransactionBatch) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE transaction_batches SET
                deposit_in_bank = $2, cash_count_total = $3, grand_total = $4,
                total_cash_handled = $5, total_deposit_in_bank = $6,
                updated_at = now(), updated_by_id = $7
             WHERE id = $1",
        )
        .bind(rec.id)
        .bind(rec.deposit_in_bank)
        .bind(rec.cash_count_total)
        .bind(rec.grand_total)
        .bind(rec.total_cash_handled)
        .bind(rec.total_deposit_in_bank)
        .bind(rec.updated_by_id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Transaction batch not found".to_string()));
        }
        Ok(())
    }

    pub async fn update_signatures(
        pool: &PgPool,
        id: Uuid,
        signatures: &SignatureBlock,
        updated_by: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE transaction_batches
             SET signatures = $2, updated_at = now(), updated_by_id = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(signatures))
        .bind(updated_by)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Transaction batch not found".to_string()));
        }
        Ok(())
    }

    /// One-way close: stamps `ended_at` and the ending employee signatory.
    pub async fn close(
        pool: &PgPool,
        id: Uuid,
        signatures: &SignatureBlock,
        ended_at: DateTime<Utc>,
        updated_by: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE transaction_batches
             SET is_closed = TRUE, ended_at = $2, signatures = $3,
                 updated_at = now(), updated_by_id = $4
             WHERE id = $1 AND is_closed = FALSE",
        )
        .bind(id)
        .bind(ended_at)
        .bind(Json(signatures))
        .bind(updated_by)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("No open transaction batch to end".to_string()));
        }
        Ok(())
    }

    pub async fn set_view_flags(
        pool: &PgPool,
        id: Uuid,
        request_view: bool,
        can_view: bool,
        updated_by: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE transaction_batches
             SET request_view = $2, can_view = $3, updated_at = now(), updated_by_id = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(request_view)
        .bind(can_view)
        .bind(updated_by)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Transaction batch not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn batch(beginning_balance: Decimal) -> TransactionBatch {
        let now = Utc::now();
        let id = Uuid::new_v4();
        TransactionBatch {
            id,
            created_at: now,
            created_by_id: id,
            updated_at: now,
            updated_by_id: id,
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            employee_user_id: Uuid::new_v4(),
            currency_code: "PHP".to_string(),
            batch_name: "morning drawer".to_string(),
            description: String::new(),
            beginning_balance,
            deposit_in_bank: Decimal::ZERO,
            cash_count_total: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            total_cash_handled: Decimal::ZERO,
            total_deposit_in_bank: Decimal::ZERO,
            total_cash_collection: Decimal::ZERO,
            total_deposit_entry: Decimal::ZERO,
            petty_cash: Decimal::ZERO,
            loan_releases: Decimal::ZERO,
            savings_withdrawal: Decimal::ZERO,
            is_closed: false,
            ended_at: None,
            can_view: false,
            request_view: false,
            signatures: Json(SignatureBlock::default()),
        }
    }

    #[test]
    fn totals_follow_the_ledger_invariants() {
        let mut b = batch(dec(1000));
        b.recompute_totals(dec(200), dec(300));

        assert_eq!(b.grand_total, dec(500));
        assert_eq!(b.total_cash_handled, dec(1500));
        assert_eq!(b.total_deposit_in_bank, dec(300));
        // invariants hold structurally, not just for this example
        assert_eq!(b.grand_total, b.cash_count_total + b.deposit_in_bank);
        assert_eq!(
            b.total_cash_handled,
            b.beginning_balance + b.deposit_in_bank + b.cash_count_total
        );
    }

    #[test]
    fn recompute_is_read_then_write_not_a_delta() {
        let mut b = batch(dec(1000));
        b.recompute_totals(dec(200), dec(300));
        // A second call with the same inputs lands on the same totals
        b.recompute_totals(dec(200), dec(300));
        assert_eq!(b.grand_total, dec(500));
        assert_eq!(b.total_cash_handled, dec(1500));
    }

    #[test]
    fn minimal_projection_hides_financial_detail() {
        let mut b = batch(dec(1000));
        b.recompute_totals(dec(200), dec(300));
        b.signatures = Json(SignatureBlock {
            employee: Some(Signatory {
                name: Some("A. Teller".to_string()),
                position: Some("Teller".to_string()),
                signature_media_id: Some(Uuid::new_v4()),
            }),
            ..Default::default()
        });

        b.can_view = false;
        let minimal = b.to_view();
        assert!(minimal.get("total_cash_handled").is_none());
        assert!(minimal.get("total_cash_collection").is_none());
        assert!(minimal.get("signatures").is_none());
        assert_eq!(minimal["grand_total"], serde_json::json!("500"));

        b.can_view = true;
        let full = b.to_view();
        assert!(full.get("total_cash_handled").is_some());
        assert!(full.get("signatures").is_some());
    }

    #[test]
    fn signature_block_overwrite_replaces_whole_document() {
        let first = SignatureBlock {
            prepared: Some(Signatory {
                name: Some("B. Clerk".to_string()),
                position: None,
                signature_media_id: None,
            }),
            ..Default::default()
        };
        let replacement: SignatureBlock = serde_json::from_value(serde_json::json!({
            "noted": { "name": "C. Manager", "position": "Branch Manager" }
        }))
        .unwrap();
        // Roles absent from the replacement are gone, not merged
        assert!(replacement.prepared.is_none());
        assert!(replacement.noted.is_some());
        assert_ne!(first, replacement);
    }

    #[test]
    fn scope_check_requires_both_org_and_branch() {
        let b = batch(dec(100));
        assert!(b.in_scope(b.organization_id, b.branch_id));
        assert!(!b.in_scope(Uuid::new_v4(), b.branch_id));
        assert!(!b.in_scope(b.organization_id, Uuid::new_v4()));
    }
}
