use axum::{extract::Path, response::Json, Extension};
use serde_json::Value;
use uuid::Uuid;

use crate::audit::{footstep, FootstepEvent};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::transaction_batch::TransactionBatch;

/// PUT /api/v1/transaction-batch/:transaction_batch_id/view-request - ask to
/// inspect another employee's batch detail. Marks the gate, mutates no data.
pub async fn batch_view_request(
    Path(transaction_batch_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let mut batch = TransactionBatch::repository(pool.clone())
        .select_by_id(transaction_batch_id)
        .await
        .map_err(|_| ApiError::not_found("Transaction batch not found"))?;

    TransactionBatch::set_view_flags(&pool, batch.id, true, false, membership.user_id).await?;
    batch.request_view = true;
    batch.can_view = false;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "update-success",
            description: format!("Requested view for transaction batch {}", batch.id),
            module: "TransactionBatch",
        },
    );

    Ok(Json(batch.to_view()))
}

/// PUT /api/v1/transaction-batch/:transaction_batch_id/view-accept - grant
/// the view. Sets `can_view` only; `request_view` is left as-is.
pub async fn batch_view_accept(
    Path(transaction_batch_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
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
                description: "Accept view request failed: batch not in org/branch".to_string(),
                module: "TransactionBatch",
            },
        );
        return Err(ApiError::forbidden(
            "Transaction batch not found in your organization/branch",
        ));
    }

    TransactionBatch::set_view_flags(&pool, batch.id, batch.request_view, true, membership.user_id)
        .await?;
    batch.can_view = true;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "update-success",
            description: format!("Accepted view request for transaction batch {}", batch.id),
            module: "TransactionBatch",
        },
    );

    Ok(Json(batch.to_view()))
}
