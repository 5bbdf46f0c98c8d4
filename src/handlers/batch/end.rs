use axum::{response::Json, Extension};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::audit::{footstep, FootstepEvent};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::transaction_batch::{Signatory, TransactionBatch};

#[derive(Debug, Deserialize)]
pub struct EndBatchRequest {
    pub employee: Signatory,
}

/// PUT /api/v1/transaction-batch/end - close the caller's open batch. The
/// transition is one-way: a second call finds no open batch and fails with
/// NotFound.
pub async fn batch_end(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<EndBatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let mut batch = TransactionBatch::current_open(
        pool.clone(),
        membership.user_id,
        membership.organization_id,
        membership.branch_id,
    )
    .await?
    .ok_or_else(|| {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "update-error",
                description: "End transaction batch failed: no open batch".to_string(),
                module: "TransactionBatch",
            },
        );
        ApiError::not_found("No open transaction batch to end")
    })?;

    let now = Utc::now();
    batch.signatures.0.employee = Some(req.employee);
    TransactionBatch::close(&pool, batch.id, &batch.signatures.0, now, membership.user_id).await?;
    batch.is_closed = true;
    batch.ended_at = Some(now);
    batch.updated_by_id = membership.user_id;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "update-success",
            description: format!("Ended transaction batch {}", batch.id),
            module: "TransactionBatch",
        },
    );

    Ok(Json(batch.to_view()))
}
