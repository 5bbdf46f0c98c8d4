use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{footstep, FootstepEvent};
use crate::database::manager::DatabaseManager;
use crate::database::pagination::{Page, PageQuery};
use crate::database::repository::Filter;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::invitation_code::InvitationCode;
use crate::models::user_organization::{ROLE_EMPLOYEE, ROLE_MEMBER, ROLE_OWNER};

#[derive(Debug, Deserialize)]
pub struct InvitationCodeRequest {
    pub user_type: String,
    pub code: String,
    pub expiration_date: DateTime<Utc>,
    pub max_use: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permission_name: String,
    #[serde(default)]
    pub permission_description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<Uuid>,
}

fn validate_request(req: &InvitationCodeRequest) -> Result<(), ApiError> {
    if req.user_type == ROLE_OWNER {
        return Err(ApiError::forbidden(
            "Cannot create invitation code with user type 'owner'",
        ));
    }
    if req.user_type != ROLE_MEMBER && req.user_type != ROLE_EMPLOYEE {
        return Err(ApiError::validation_error("user_type must be member or employee", None));
    }
    if req.code.trim().is_empty() {
        return Err(ApiError::validation_error("Code is required", None));
    }
    if req.max_use < 1 {
        return Err(ApiError::validation_error("max_use must be at least 1", None));
    }
    Ok(())
}

/// POST /api/v1/invitation-code
pub async fn invitation_create(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<InvitationCodeRequest>,
) -> Result<(StatusCode, Json<InvitationCode>), ApiError> {
    let membership = current_membership(&auth).await?;
    if !membership.is_staff() {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "create-error",
                description: "Unauthorized invitation code create attempt".to_string(),
                module: "InvitationCode",
            },
        );
        return Err(ApiError::forbidden("Only owners and employees can create invitation codes"));
    }
    validate_request(&req)?;

    let now = Utc::now();
    let rec = InvitationCode {
        id: Uuid::new_v4(),
        created_at: now,
        created_by_id: membership.user_id,
        updated_at: now,
        updated_by_id: membership.user_id,
        organization_id: membership.organization_id,
        branch_id: membership.branch_id,
        user_type: req.user_type,
        code: req.code.trim().to_string(),
        expiration_date: req.expiration_date,
        max_use: req.max_use,
        current_use: 0,
        description: req.description,
        permission_name: req.permission_name,
        permission_description: req.permission_description,
        permissions: req.permissions,
    };

    let pool = DatabaseManager::pool().await?;
    InvitationCode::insert(&pool, &rec).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "create-success",
            description: format!("Created invitation code {}", rec.code),
            module: "InvitationCode",
        },
    );

    Ok((StatusCode::CREATED, Json(rec)))
}

/// GET /api/v1/invitation-code - codes on the caller's branch
pub async fn invitation_list(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<InvitationCode>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let rows = InvitationCode::repository(pool)
        .select_any(
            Filter::new()
                .eq("organization_id", membership.organization_id)
                .eq("branch_id", membership.branch_id)
                .order_desc("created_at"),
        )
        .await?;
    Ok(Json(rows))
}

/// GET /api/v1/invitation-code/search - paginated codes on the branch
pub async fn invitation_search(
    Extension(auth): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<InvitationCode>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let repo = InvitationCode::repository(pool);
    let filter = Filter::new()
        .eq("organization_id", membership.organization_id)
        .eq("branch_id", membership.branch_id)
        .order_desc("created_at");
    let total = repo.count(filter.clone()).await?;
    let rows = repo.select_page(filter, page.page_size(), page.offset()).await?;
    Ok(Json(Page::new(rows, total, &page)))
}

/// GET /api/v1/invitation-code/code/:code - lookup by code string; any
/// authenticated user may inspect a code they were handed
pub async fn invitation_get_by_code(
    Path(code): Path<String>,
) -> Result<Json<InvitationCode>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let rec = InvitationCode::find_by_code(pool, &code)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation code not found"))?;
    Ok(Json(rec))
}

/// GET /api/v1/invitation-code/:invitation_code_id
pub async fn invitation_get(
    Path(invitation_code_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<InvitationCode>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let rec = InvitationCode::repository(pool)
        .select_by_id(invitation_code_id)
        .await
        .map_err(|_| ApiError::not_found("Invitation code not found"))?;
    Ok(Json(rec))
}

/// PUT /api/v1/invitation-code/:invitation_code_id
pub async fn invitation_update(
    Path(invitation_code_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<InvitationCodeRequest>,
) -> Result<Json<InvitationCode>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;
    validate_request(&req)?;

    let pool = DatabaseManager::pool().await?;
    let mut rec = InvitationCode::repository(pool.clone())
        .select_by_id(invitation_code_id)
        .await
        .map_err(|_| ApiError::not_found("Invitation code not found"))?;

    rec.updated_at = Utc::now();
    rec.updated_by_id = membership.user_id;
    rec.user_type = req.user_type;
    rec.code = req.code.trim().to_string();
    rec.expiration_date = req.expiration_date;
    rec.max_use = req.max_use;
    rec.description = req.description;
    rec.permission_name = req.permission_name;
    rec.permission_description = req.permission_description;
    rec.permissions = req.permissions;

    InvitationCode::update(&pool, &rec).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "update-success",
            description: format!("Updated invitation code {}", rec.code),
            module: "InvitationCode",
        },
    );

    Ok(Json(rec))
}

/// DELETE /api/v1/invitation-code/:invitation_code_id
pub async fn invitation_delete(
    Path(invitation_code_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let rec = InvitationCode::repository(pool.clone())
        .select_by_id(invitation_code_id)
        .await
        .map_err(|_| ApiError::not_found("Invitation code not found"))?;
    InvitationCode::delete(&pool, rec.id).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "delete-success",
            description: format!("Deleted invitation code {}", rec.code),
            module: "InvitationCode",
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/invitation-code/bulk-delete - all-or-nothing
pub async fn invitation_bulk_delete(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<IdsRequest>,
) -> Result<StatusCode, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    if req.ids.is_empty() {
        return Err(ApiError::bad_request("No IDs provided for bulk delete"));
    }

    let pool = DatabaseManager::pool().await?;
    InvitationCode::bulk_delete(&pool, &req.ids).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "bulk-delete-success",
            description: format!("Bulk deleted {} invitation codes", req.ids.len()),
            module: "InvitationCode",
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
