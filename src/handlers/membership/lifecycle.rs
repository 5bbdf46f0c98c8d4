use axum::extract::Path;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use uuid::Uuid;

use crate::audit::{footstep, notify_user, FootstepEvent, NotificationEvent, NOTIFICATION_SUCCESS};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::current_membership;
use crate::handlers::invitation::IdsRequest;
use crate::middleware::AuthUser;
use crate::models::user_organization::{UserOrganization, STATUS_ACCEPTED};

/// POST /api/v1/user-organization/:user_organization_id/accept - approve a
/// pending application. Owners only; never your own.
pub async fn membership_accept(
    Path(user_organization_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let caller = current_membership(&auth).await?;

    let pool = DatabaseManager::pool().await?;
    let target = UserOrganization::repository(pool.clone())
        .select_by_id(user_organization_id)
        .await
        .map_err(|_| ApiError::not_found("User organization not found"))?;

    if !caller.is_owner() {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "approve-error",
                description: "Accept application failed: not an owner".to_string(),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden("Only organization owners can accept applications"));
    }

    if caller.user_id == target.user_id {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "approve-error",
                description: "Accept application failed: cannot accept own application".to_string(),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden("You cannot accept your own application"));
    }

    UserOrganization::set_application_status(&pool, target.id, STATUS_ACCEPTED, caller.user_id)
        .await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "approve-success",
            description: format!("Accepted application for user {}", target.user_id),
            module: "UserOrganization",
        },
    );
    notify_user(
        target.user_id,
        NotificationEvent {
            title: "Application Accepted".to_string(),
            description: format!("Your {} application has been accepted", target.user_type),
            notification_type: NOTIFICATION_SUCCESS,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/user-organization/:user_organization_id/reject - rejection
/// removes the row outright; owners and employees only, never your own.
pub async fn membership_reject(
    Path(user_organization_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let caller = current_membership(&auth).await?;

    let pool = DatabaseManager::pool().await?;
    let target = UserOrganization::repository(pool.clone())
        .select_by_id(user_organization_id)
        .await
        .map_err(|_| ApiError::not_found("User organization not found"))?;

    if !caller.is_staff() {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "delete-error",
                description: "Reject application failed: not owner or employee".to_string(),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden(
            "Only organization owners or employees can reject applications",
        ));
    }

    if caller.user_id == target.user_id {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "delete-error",
                description: "Reject application failed: cannot reject own application".to_string(),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden("You cannot reject your own application"));
    }

    UserOrganization::delete(&pool, target.id).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "delete-success",
            description: format!("Rejected application for user {}", target.user_id),
            module: "UserOrganization",
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/user-organization/leave - self-removal, members only
pub async fn membership_leave(Extension(auth): Extension<AuthUser>) -> Result<StatusCode, ApiError> {
    let caller = current_membership(&auth).await?;

    if !caller.can_leave() {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "delete-error",
                description: "Leave organization failed: forbidden for owner or employee".to_string(),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden("Owners and employees cannot leave an organization"));
    }

    let pool = DatabaseManager::pool().await?;
    UserOrganization::delete(&pool, caller.id).await?;

    footstep(
        auth.user_id,
        None,
        FootstepEvent {
            activity: "delete-success",
            description: format!("Left organization {}", caller.organization_id),
            module: "UserOrganization",
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/user-organization/:user_organization_id - admin removal
pub async fn membership_delete(
    Path(user_organization_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let caller = current_membership(&auth).await?;
    if !caller.is_owner() {
        return Err(ApiError::forbidden("Only organization owners can delete memberships"));
    }

    let pool = DatabaseManager::pool().await?;
    let target = UserOrganization::repository(pool.clone())
        .select_by_id(user_organization_id)
        .await
        .map_err(|_| ApiError::not_found("User organization not found"))?;
    UserOrganization::delete(&pool, target.id).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "delete-success",
            description: format!("Deleted user organization {}", target.id),
            module: "UserOrganization",
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/user-organization/bulk-delete - all-or-nothing
pub async fn membership_bulk_delete(
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<IdsRequest>,
) -> Result<StatusCode, ApiError> {
    let caller = current_membership(&auth).await?;
    if !caller.is_owner() {
        return Err(ApiError::forbidden("Only organization owners can delete memberships"));
    }

    if req.ids.is_empty() {
        return Err(ApiError::bad_request("No IDs provided for bulk delete"));
    }

    let pool = DatabaseManager::pool().await?;
    UserOrganization::bulk_delete(&pool, &req.ids).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "bulk-delete-success",
            description: format!("Bulk deleted {} user organizations", req.ids.len()),
            module: "UserOrganization",
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
