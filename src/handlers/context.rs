use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::user_organization::UserOrganization;

/// Resolve the caller's current organization membership from the session
/// context carried in the token. Every org-scoped handler starts here.
pub async fn current_membership(auth: &AuthUser) -> Result<UserOrganization, ApiError> {
    let membership_id = auth.user_organization_id.ok_or_else(|| {
        ApiError::unauthorized("No organization context; switch into a membership first")
    })?;

    let pool = DatabaseManager::pool().await?;
    let membership = UserOrganization::repository(pool)
        .select_by_id(membership_id)
        .await
        .map_err(|_| ApiError::unauthorized("Organization context no longer exists"))?;

    if membership.user_id != auth.user_id {
        return Err(ApiError::unauthorized(
            "Organization context does not belong to this user",
        ));
    }
    Ok(membership)
}

/// Gate for back-office operations: owner or employee only
pub fn require_staff(membership: &UserOrganization) -> Result<(), ApiError> {
    if membership.is_staff() {
        Ok(())
    } else {
        Err(ApiError::forbidden("User is not authorized"))
    }
}
