use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{
    footstep, notify_organization_owners, FootstepEvent, NotificationEvent, NOTIFICATION_INFO,
};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::invitation_code::InvitationCode;
use crate::models::organization::{Branch, Organization};
use crate::models::user_organization::{
    generate_developer_key, UserOrganization, ROLE_EMPLOYEE, ROLE_MEMBER, STATUS_PENDING,
};

#[derive(Debug, Deserialize, Default)]
pub struct JoinRequest {
    #[serde(default)]
    pub description: String,
}

fn new_membership(
    auth: &AuthUser,
    organization_id: Uuid,
    branch_id: Uuid,
    user_type: &str,
    description: String,
    permission_name: String,
    permission_description: String,
    permissions: Vec<String>,
) -> UserOrganization {
    let now = Utc::now();
    UserOrganization {
        id: Uuid::new_v4(),
        created_at: now,
        created_by_id: auth.user_id,
        updated_at: now,
        updated_by_id: auth.user_id,
        organization_id,
        branch_id,
        user_id: auth.user_id,
        user_type: user_type.to_string(),
        application_status: STATUS_PENDING.to_string(),
        description,
        application_description: String::new(),
        developer_secret_key: generate_developer_key(auth.user_id),
        permission_name,
        permission_description,
        permissions,
        payment_or_unique: false,
        payment_or_allow_user_input: true,
        payment_or_start: 1,
        payment_or_end: 9999,
        payment_or_current: 1,
        payment_or_iteration: 1,
        payment_prefix: String::new(),
        payment_padding: 6,
    }
}

/// POST /api/v1/user-organization/invitation-code/:code/join - redeem a code
/// and create a pending membership, atomically
pub async fn join_with_code(
    Path(code): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<(StatusCode, Json<UserOrganization>), ApiError> {
    let pool = DatabaseManager::pool().await?;

    let invitation = InvitationCode::find_by_code(pool.clone(), &code)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation code not found"))?;

    if let Err(block) = invitation.validate_redeemable(Utc::now()) {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "create-error",
                description: format!("Join via invitation code failed: {}", block.message()),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden(block.message()));
    }

    let eligible = match invitation.user_type.as_str() {
        ROLE_MEMBER => {
            UserOrganization::member_can_join(
                &pool,
                auth.user_id,
                invitation.organization_id,
                invitation.branch_id,
            )
            .await?
        }
        ROLE_EMPLOYEE => {
            UserOrganization::employee_can_join(
                &pool,
                auth.user_id,
                invitation.organization_id,
                invitation.branch_id,
            )
            .await?
        }
        _ => false,
    };
    if !eligible {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "create-error",
                description: format!("Join via invitation code failed: cannot join as {}", invitation.user_type),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden(format!("Cannot join as {}", invitation.user_type)));
    }

    let membership = new_membership(
        &auth,
        invitation.organization_id,
        invitation.branch_id,
        &invitation.user_type,
        invitation.description.clone(),
        invitation.permission_name.clone(),
        invitation.permission_description.clone(),
        invitation.permissions.clone(),
    );

    // Increment and insert commit together or not at all. The guarded UPDATE
    // returns zero rows when a concurrent redemption exhausted the code first.
    let mut tx = pool.begin().await.map_err(ApiError::from)?;
    if !InvitationCode::redeem(&mut tx, invitation.id).await? {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "create-error",
                description: "Join via invitation code failed: no remaining uses".to_string(),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden("Invitation code has no remaining uses"));
    }
    UserOrganization::insert(&mut tx, &membership).await?;
    tx.commit().await.map_err(ApiError::from)?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "create-success",
            description: format!("Joined organization via invitation code {}", invitation.code),
            module: "UserOrganization",
        },
    );
    notify_organization_owners(
        invitation.organization_id,
        NotificationEvent {
            title: "New Member Joined via Invitation".to_string(),
            description: format!("New {} joined using invitation code {}", membership.user_type, invitation.code),
            notification_type: NOTIFICATION_INFO,
        },
    );

    Ok((StatusCode::CREATED, Json(membership)))
}

/// POST /api/v1/user-organization/organization/:organization_id/branch/:branch_id/join
/// - direct join, always a pending member with default permissions
pub async fn join_direct(
    Path((organization_id, branch_id)): Path<(Uuid, Uuid)>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<UserOrganization>), ApiError> {
    let pool = DatabaseManager::pool().await?;

    Organization::repository(pool.clone())
        .select_by_id(organization_id)
        .await
        .map_err(|_| ApiError::not_found("Organization not found"))?;
    let branch = Branch::repository(pool.clone())
        .select_by_id(branch_id)
        .await
        .map_err(|_| ApiError::not_found("Branch not found"))?;
    if branch.organization_id != organization_id {
        return Err(ApiError::not_found("Branch not found in this organization"));
    }

    if !UserOrganization::member_can_join(&pool, auth.user_id, organization_id, branch_id).await? {
        footstep(
            auth.user_id,
            auth.user_organization_id,
            FootstepEvent {
                activity: "create-error",
                description: "Direct join failed: cannot join as member".to_string(),
                module: "UserOrganization",
            },
        );
        return Err(ApiError::forbidden("Cannot join as member"));
    }

    let membership = new_membership(
        &auth,
        organization_id,
        branch_id,
        ROLE_MEMBER,
        req.description,
        ROLE_MEMBER.to_string(),
        "organization member".to_string(),
        vec![],
    );

    let mut tx = pool.begin().await.map_err(ApiError::from)?;
    UserOrganization::insert(&mut tx, &membership).await?;
    tx.commit().await.map_err(ApiError::from)?;

    footstep(
        auth.user_id,
        auth.user_organization_id,
        FootstepEvent {
            activity: "create-success",
            description: format!("Applied to join organization {} as member", organization_id),
            module: "UserOrganization",
        },
    );
    notify_organization_owners(
        organization_id,
        NotificationEvent {
            title: "New Member Application".to_string(),
            description: "New member application received".to_string(),
            notification_type: NOTIFICATION_INFO,
        },
    );

    Ok((StatusCode::CREATED, Json(membership)))
}

/// GET .../can-join-member - eligibility probe, no side effects
pub async fn can_join_member(
    Path((organization_id, branch_id)): Path<(Uuid, Uuid)>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let pool = DatabaseManager::pool().await?;
    if UserOrganization::member_can_join(&pool, auth.user_id, organization_id, branch_id).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::forbidden("Cannot join as member"))
    }
}

/// GET .../can-join-employee - eligibility probe, no side effects
pub async fn can_join_employee(
    Path((organization_id, branch_id)): Path<(Uuid, Uuid)>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let pool = DatabaseManager::pool().await?;
    if UserOrganization::employee_can_join(&pool, auth.user_id, organization_id, branch_id).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::forbidden("Cannot join as employee"))
    }
}
