use axum::extract::Path;
use axum::response::Json;
use axum::Extension;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::audit::{footstep, FootstepEvent};
use crate::auth::{generate_jwt, Claims};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::context::current_membership;
use crate::middleware::AuthUser;
use crate::models::user_organization::{generate_developer_key, UserOrganization};

/// GET /api/v1/user-organization/:user_organization_id/switch - set the
/// session's organization context by minting a fresh token. No persistent
/// state is written.
pub async fn membership_switch(
    Path(user_organization_id): Path<Uuid>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let membership = UserOrganization::repository(pool)
        .select_by_id(user_organization_id)
        .await
        .map_err(|_| ApiError::not_found("User organization not found"))?;

    if membership.user_id != auth.user_id {
        return Err(ApiError::forbidden("You do not own this user organization"));
    }
    if !membership.is_accepted() {
        return Err(ApiError::forbidden(format!(
            "Switching forbidden - application is {}",
            membership.application_status
        )));
    }

    let claims = Claims::new(auth.user_id, auth.email.clone(), Some(membership.id));
    let token = generate_jwt(claims)?;

    footstep(
        auth.user_id,
        Some(membership.id),
        FootstepEvent {
            activity: "update-success",
            description: format!("Switched into organization {}", membership.organization_id),
            module: "UserOrganization",
        },
    );

    Ok(Json(json!({
        "token": token,
        "user_organization": membership
    })))
}

/// POST /api/v1/user-organization/unswitch - clear the session's
/// organization context
pub async fn membership_unswitch(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let claims = Claims::new(auth.user_id, auth.email.clone(), None);
    let token = generate_jwt(claims)?;

    footstep(
        auth.user_id,
        None,
        FootstepEvent {
            activity: "update-success",
            description: "Cleared organization context (unswitch)".to_string(),
            module: "UserOrganization",
        },
    );

    Ok(Json(json!({ "token": token })))
}

/// GET /api/v1/user-organization/current - the caller's current membership
pub async fn membership_current(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserOrganization>, ApiError> {
    let membership = current_membership(&auth)
        .await
        .map_err(|_| ApiError::not_found("No current organization context"))?;
    Ok(Json(membership))
}

/// POST /api/v1/user-organization/developer-key-refresh
pub async fn developer_key_refresh(
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let membership = current_membership(&auth).await?;

    let key = generate_developer_key(membership.user_id);
    let pool = DatabaseManager::pool().await?;
    UserOrganization::set_developer_key(&pool, membership.id, &key).await?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "update-success",
            description: format!("Refreshed developer key for membership {}", membership.id),
            module: "UserOrganization",
        },
    );

    Ok(Json(json!({ "developer_secret_key": key })))
}
