use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;
use serde_json::Value;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::pagination::{Page, PageQuery};
use crate::database::repository::Filter;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::transaction_batch::TransactionBatch;
use crate::models::user_organization::UserOrganization;

fn branch_filter(organization_id: Uuid, branch_id: Uuid) -> Filter {
    Filter::new()
        .eq("organization_id", organization_id)
        .eq("branch_id", branch_id)
        .order_desc("updated_at")
}

/// GET /api/v1/transaction-batch - all batches on the caller's branch
pub async fn batch_list(Extension(auth): Extension<AuthUser>) -> Result<Json<Vec<Value>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let batches = TransactionBatch::repository(pool)
        .select_any(branch_filter(membership.organization_id, membership.branch_id))
        .await?;
    Ok(Json(batches.iter().map(TransactionBatch::to_view).collect()))
}

/// GET /api/v1/transaction-batch/search - paginated batches on the branch
pub async fn batch_search(
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Value>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let repo = TransactionBatch::repository(pool);
    let filter = branch_filter(membership.organization_id, membership.branch_id);
    let total = repo.count(filter.clone()).await?;
    let batches = repo.select_page(filter, page.page_size(), page.offset()).await?;
    let data = batches.iter().map(TransactionBatch::to_view).collect();
    Ok(Json(Page::new(data, total, &page)))
}

/// GET /api/v1/transaction-batch/current - the caller's open batch, minimal
/// unless viewable; 204 when none is open
pub async fn batch_current(Extension(auth): Extension<AuthUser>) -> Result<Response, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let batch = TransactionBatch::current_open(
        pool,
        membership.user_id,
        membership.organization_id,
        membership.branch_id,
    )
    .await?;

    match batch {
        Some(batch) => Ok(Json(batch.to_view()).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /api/v1/transaction-batch/:transaction_batch_id
pub async fn batch_get(
    Path(transaction_batch_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let batch = TransactionBatch::repository(pool)
        .select_by_id(transaction_batch_id)
        .await
        .map_err(|_| ApiError::not_found("Transaction batch not found"))?;
    Ok(Json(batch.to_view()))
}

/// GET /api/v1/transaction-batch/view-request - unanswered view requests on
/// the caller's branch
pub async fn batch_view_requests(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let batches =
        TransactionBatch::view_requests(pool, membership.organization_id, membership.branch_id)
            .await?;
    Ok(Json(batches.iter().map(TransactionBatch::to_view).collect()))
}

/// GET /api/v1/transaction-batch/ended-batch - batches closed today on the
/// caller's branch
pub async fn batch_ended_today(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let batches =
        TransactionBatch::ended_today(&pool, membership.organization_id, membership.branch_id)
            .await?;
    Ok(Json(batches.iter().map(TransactionBatch::to_view).collect()))
}

/// GET /api/v1/transaction-batch/employee/:user_organization_id/search -
/// paginated batches for one employee on the caller's branch
pub async fn batch_employee_search(
    Path(user_organization_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Value>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let employee = UserOrganization::repository(pool.clone())
        .select_by_id(user_organization_id)
        .await
        .map_err(|_| ApiError::not_found("User organization not found"))?;

    let repo = TransactionBatch::repository(pool);
    let filter = branch_filter(membership.organization_id, membership.branch_id)
        .eq("employee_user_id", employee.user_id);
    let total = repo.count(filter.clone()).await?;
    let batches = repo.select_page(filter, page.page_size(), page.offset()).await?;
    let data = batches.iter().map(TransactionBatch::to_view).collect();
    Ok(Json(Page::new(data, total, &page)))
}
