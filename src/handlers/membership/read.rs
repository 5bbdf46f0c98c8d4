use axum::extract::Path;
use axum::response::Json;
use axum::Extension;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::repository::Filter;
use crate::error::ApiError;
use crate::handlers::context::{current_membership, require_staff};
use crate::middleware::AuthUser;
use crate::models::user_organization::{
    UserOrganization, ROLE_EMPLOYEE, ROLE_MEMBER, STATUS_PENDING,
};

/// GET /api/v1/user-organization/:user_organization_id
pub async fn membership_get(
    Path(user_organization_id): Path<Uuid>,
    Extension(_auth): Extension<AuthUser>,
) -> Result<Json<UserOrganization>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let membership = UserOrganization::repository(pool)
        .select_by_id(user_organization_id)
        .await
        .map_err(|_| ApiError::not_found("User organization not found"))?;
    Ok(Json(membership))
}

async fn branch_memberships_of_type(
    auth: &AuthUser,
    user_type: &'static str,
) -> Result<Vec<UserOrganization>, ApiError> {
    let membership = current_membership(auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let rows = UserOrganization::repository(pool)
        .select_any(
            Filter::new()
                .eq("organization_id", membership.organization_id)
                .eq("branch_id", membership.branch_id)
                .eq("user_type", user_type)
                .order_desc("created_at"),
        )
        .await?;
    Ok(rows)
}

/// GET /api/v1/user-organization/employee - employees of the caller's branch
pub async fn membership_employees(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserOrganization>>, ApiError> {
    Ok(Json(branch_memberships_of_type(&auth, ROLE_EMPLOYEE).await?))
}

/// GET /api/v1/user-organization/members - members of the caller's branch
pub async fn membership_members(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserOrganization>>, ApiError> {
    Ok(Json(branch_memberships_of_type(&auth, ROLE_MEMBER).await?))
}

/// GET /api/v1/user-organization/join-request - pending applications on the
/// caller's branch
pub async fn membership_join_requests(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserOrganization>>, ApiError> {
    let membership = current_membership(&auth).await?;
    require_staff(&membership)?;

    let pool = DatabaseManager::pool().await?;
    let rows = UserOrganization::repository(pool)
        .select_any(
            Filter::new()
                .eq("organization_id", membership.organization_id)
                .eq("branch_id", membership.branch_id)
                .eq("application_status", STATUS_PENDING)
                .order_desc("created_at"),
        )
        .await?;
    Ok(Json(rows))
}
