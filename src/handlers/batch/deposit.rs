use axum::{extract::Path, response::Json, Extension};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::audit::{footstep, FootstepEvent};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::cash_count::CashCount;
use crate::models::transaction_batch::TransactionBatch;

#[derive(Debug, Deserialize)]
pub struct DepositInBankRequest {
    pub deposit_in_bank: Decimal,
}

/// PUT /api/v1/transaction-batch/:transaction_batch_id/deposit-in-bank -
/// set the deposit and re-derive the running totals from current state
pub async fn batch_update_deposit(
    Path(transaction_batch_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DepositInBankRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.deposit_in_bank < Decimal::ZERO {
        return Err(ApiError::validation_error("Deposit must be non-negative", None));
    }

    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let mut batch = TransactionBatch::repository(pool.clone())
        .select_by_id(transaction_batch_id)
        .await
        .map_err(|_| ApiError::not_found("Transaction batch not found"))?;

    if !batch.in_scope(membership.organization_id, membership.branch_id) {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "update-error",
                description: "Update deposit in bank failed: batch not in org/branch".to_string(),
                module: "TransactionBatch",
            },
        );
        return Err(ApiError::forbidden(
            "Transaction batch not found in your organization/branch",
        ));
    }

    if batch.is_closed {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "update-error",
                description: "Update deposit in bank failed: batch is closed".to_string(),
                module: "TransactionBatch",
            },
        );
        return Err(ApiError::forbidden(
            "Cannot update deposit for a closed transaction batch",
        ));
    }

    // Read-then-write: totals come from the current cash-count sum plus the
    // submitted deposit, never from deltas
    let cash_total = CashCount::total_for_batch(&pool, batch.id).await?;
    batch.recompute_totals(cash_total, req.deposit_in_bank);
    batch.updated_by_id = membership.user_id;
    TransactionBatch::update_totals(&pool, &batch).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "update-success",
            description: format!("Updated deposit in bank for batch {}", batch.id),
            module: "TransactionBatch",
        },
    );

    Ok(Json(batch.to_view()))
}
