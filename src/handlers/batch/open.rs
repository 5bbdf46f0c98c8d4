use axum::{http::StatusCode, response::Json, Extension};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::audit::{footstep, FootstepEvent};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::batch_funding::BatchFunding;
use crate::models::transaction_batch::{MinimalBatch, SignatureBlock, TransactionBatch};

#[derive(Debug, Deserialize)]
pub struct OpenBatchRequest {
    pub amount: Decimal,
    pub currency_code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub signature_media_id: Option<Uuid>,
}

/// POST /api/v1/transaction-batch - open a batch and its funding record in
/// one transaction. Conflict if the caller already has an open batch.
pub async fn batch_open(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<OpenBatchRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if req.amount < Decimal::ZERO {
        return Err(ApiError::validation_error("Funding amount must be non-negative", None));
    }
    if req.name.trim().is_empty() || req.currency_code.trim().is_empty() {
        return Err(ApiError::validation_error("Name and currency are required", None));
    }

    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;

    // Check-then-insert: a concurrent second open can slip through this read;
    // the duplicate is reconciled manually (see DESIGN.md).
    let existing = TransactionBatch::current_open(
        pool.clone(),
        membership.user_id,
        membership.organization_id,
        membership.branch_id,
    )
    .await?;
    if existing.is_some() {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "create-error",
                description: "Open transaction batch failed: ongoing batch".to_string(),
                module: "TransactionBatch",
            },
        );
        return Err(ApiError::conflict("There is an ongoing transaction batch"));
    }

    let now = Utc::now();
    let batch = TransactionBatch {
        id: Uuid::new_v4(),
        created_at: now,
        created_by_id: membership.user_id,
        updated_at: now,
        updated_by_id: membership.user_id,
        organization_id: membership.organization_id,
        branch_id: membership.branch_id,
        employee_user_id: membership.user_id,
        currency_code: req.currency_code.trim().to_string(),
        batch_name: req.name.trim().to_string(),
        description: req.description.clone(),
        beginning_balance: req.amount,
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
        signatures: SqlJson(SignatureBlock::default()),
    };

    let funding = BatchFunding {
        id: Uuid::new_v4(),
        created_at: now,
        created_by_id: membership.user_id,
        organization_id: membership.organization_id,
        branch_id: membership.branch_id,
        transaction_batch_id: batch.id,
        provided_by_user_id: membership.user_id,
        name: batch.batch_name.clone(),
        description: req.description,
        amount: req.amount,
        currency_code: batch.currency_code.clone(),
        signature_media_id: req.signature_media_id,
    };

    let mut tx = pool.begin().await.map_err(ApiError::from)?;
    TransactionBatch::insert(&mut tx, &batch).await?;
    BatchFunding::insert(&mut tx, &funding).await?;
    tx.commit().await.map_err(ApiError::from)?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "create-success",
            description: format!("Opened transaction batch {} with funding", batch.id),
            module: "TransactionBatch",
        },
    );

    let body = serde_json::to_value(MinimalBatch::from(&batch))
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(body)))
}
