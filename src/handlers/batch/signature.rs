use axum::{extract::Path, response::Json, Extension};
use serde_json::Value;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::audit::{footstep, FootstepEvent};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::transaction_batch::{SignatureBlock, TransactionBatch};

/// PUT /api/v1/transaction-batch/:transaction_batch_id/signature - replace
/// the attestation block. Permitted in any lifecycle state: signatures may be
/// attached after close, during the view/audit workflow.
pub async fn batch_update_signature(
    Path(transaction_batch_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
    Json(block): Json<SignatureBlock>,
) -> Result<Json<Value>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let mut batch = TransactionBatch::repository(pool.clone())
        .select_by_id(transaction_batch_id)
        .await
        .map_err(|_| ApiError::not_found("Transaction batch not found"))?;

    TransactionBatch::update_signatures(&pool, batch.id, &block, membership.user_id).await?;
    batch.signatures = SqlJson(block);
    batch.updated_by_id = membership.user_id;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "update-success",
            description: format!("Updated transaction batch signatures for batch {}", batch.id),
            module: "TransactionBatch",
        },
    );

    Ok(Json(batch.to_view()))
}
