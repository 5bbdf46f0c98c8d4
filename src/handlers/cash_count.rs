use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{footstep, FootstepEvent};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::cash_count::CashCount;
use crate::models::transaction_batch::TransactionBatch;
use crate::models::user_organization::UserOrganization;

#[derive(Debug, Deserialize)]
pub struct CashCountRequest {
    pub name: String,
    pub amount: Decimal,
}

async fn open_batch_for(
    pool: &PgPool,
    membership: &UserOrganization,
) -> Result<TransactionBatch, ApiError> {
    TransactionBatch::current_open(
        pool.clone(),
        membership.user_id,
        membership.organization_id,
        membership.branch_id,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("No open transaction batch"))
}

/// Totals are re-derived on every cash-count mutation, same read-then-write
/// path the deposit update uses
async fn rebalance(pool: &PgPool, batch: &mut TransactionBatch, updated_by: Uuid) -> Result<(), ApiError> {
    let cash_total = CashCount::total_for_batch(pool, batch.id).await?;
    batch.recompute_totals(cash_total, batch.deposit_in_bank);
    batch.updated_by_id = updated_by;
    TransactionBatch::update_totals(pool, batch).await?;
    Ok(())
}

/// POST /api/v1/cash-count - append a counted amount to the caller's open batch
pub async fn cash_count_create(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CashCountRequest>,
) -> Result<(StatusCode, Json<CashCount>), ApiError> {
    if req.amount < Decimal::ZERO {
        return Err(ApiError::validation_error("Amount must be non-negative", None));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::validation_error("Name is required", None));
    }

    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let mut batch = open_batch_for(&pool, &membership).await?;

    let now = Utc::now();
    let rec = CashCount {
        id: Uuid::new_v4(),
        created_at: now,
        created_by_id: membership.user_id,
        updated_at: now,
        updated_by_id: membership.user_id,
        organization_id: membership.organization_id,
        branch_id: membership.branch_id,
        transaction_batch_id: batch.id,
        employee_user_id: membership.user_id,
        name: req.name.trim().to_string(),
        amount: req.amount,
    };
    CashCount::insert(&pool, &rec).await?;
    rebalance(&pool, &mut batch, membership.user_id).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "create-success",
            description: format!("Recorded cash count for batch {}", batch.id),
            module: "CashCount",
        },
    );

    Ok((StatusCode::CREATED, Json(rec)))
}

/// GET /api/v1/cash-count - counts on the caller's open batch
pub async fn cash_count_list(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<CashCount>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let batch = open_batch_for(&pool, &membership).await?;
    let rows = CashCount::for_batch(pool, batch.id).await?;
    Ok(Json(rows))
}

/// DELETE /api/v1/cash-count/:cash_count_id - remove a count while its batch
/// is still open
pub async fn cash_count_delete(
    Path(cash_count_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let rec = CashCount::repository(pool.clone())
        .select_by_id(cash_count_id)
        .await
        .map_err(|_| ApiError::not_found("Cash count not found"))?;

    if rec.organization_id != membership.organization_id || rec.branch_id != membership.branch_id {
        return Err(ApiError::forbidden("Cash count not found in your organization/branch"));
    }

    let mut batch = TransactionBatch::repository(pool.clone())
        .select_by_id(rec.transaction_batch_id)
        .await
        .map_err(|_| ApiError::not_found("Transaction batch not found"))?;
    if batch.is_closed {
        return Err(ApiError::forbidden("Cannot modify cash counts of a closed batch"));
    }

    CashCount::delete(&pool, rec.id).await?;
    rebalance(&pool, &mut batch, membership.user_id).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "delete-success",
            description: format!("Deleted cash count {} from batch {}", rec.id, batch.id),
            module: "CashCount",
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
