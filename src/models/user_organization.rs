use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::{Filter, Repository};

pub const TABLE: &str = "user_organizations";

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_EMPLOYEE: &str = "employee";
pub const ROLE_MEMBER: &str = "member";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";

/// Membership edge between a user and an organization branch
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserOrganization {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub updated_by_id: Uuid,

    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub user_id: Uuid,

    pub user_type: String,
    pub application_status: String,
    pub description: String,
    pub application_description: String,
    #[serde(skip_serializing)]
    pub developer_secret_key: String,

    // Permission snapshot copied from the invitation code (or defaults)
    pub permission_name: String,
    pub permission_description: String,
    pub permissions: Vec<String>,

    // Numbered-document (official receipt) settings
    pub payment_or_unique: bool,
    pub payment_or_allow_user_input: bool,
    pub payment_or_start: i64,
    pub payment_or_end: i64,
    pub payment_or_current: i64,
    pub payment_or_iteration: i64,
    pub payment_prefix: String,
    pub payment_padding: i32,
}

impl UserOrganization {
    pub fn repository(pool: PgPool) -> Repository<UserOrganization> {
        Repository::new(TABLE, pool)
    }

    /// Owners and employees are back-office staff with batch/invitation rights
    pub fn is_staff(&self) -> bool {
        self.user_type == ROLE_OWNER || self.user_type == ROLE_EMPLOYEE
    }

    pub fn is_owner(&self) -> bool {
        self.user_type == ROLE_OWNER
    }

    pub fn is_accepted(&self) -> bool {
        self.application_status == STATUS_ACCEPTED
    }

    /// Only plain members may remove themselves; staff must be deleted by an admin
    pub fn can_leave(&self) -> bool {
        self.user_type == ROLE_MEMBER
    }

    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        rec: &UserOrganization,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO user_organizations (
                id, created_at, created_by_id, updated_at, updated_by_id,
                organization_id, branch_id, user_id,
                user_type, application_status, description, application_description,
                developer_secret_key, permission_name, permission_description, permissions,
                payment_or_unique, payment_or_allow_user_input,
                payment_or_start, payment_or_end, payment_or_current, payment_or_iteration,
                payment_prefix, payment_padding
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23,$24)",
        )
        .bind(rec.id)
        .bind(rec.created_at)
        .bind(rec.created_by_id)
        .bind(rec.updated_at)
        .bind(rec.updated_by_id)
        .bind(rec.organization_id)
        .bind(rec.branch_id)
        .bind(rec.user_id)
        .bind(&rec.user_type)
        .bind(&rec.application_status)
        .bind(&rec.description)
        .bind(&rec.application_description)
        .bind(&rec.developer_secret_key)
        .bind(&rec.permission_name)
        .bind(&rec.permission_description)
        .bind(&rec.permissions)
        .bind(rec.payment_or_unique)
        .bind(rec.payment_or_allow_user_input)
        .bind(rec.payment_or_start)
        .bind(rec.payment_or_end)
        .bind(rec.payment_or_current)
        .bind(rec.payment_or_iteration)
        .bind(&rec.payment_prefix)
        .bind(rec.payment_padding)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn set_application_status(
        pool: &PgPool,
        id: Uuid,
        status: &str,
        updated_by: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE user_organizations
             SET application_status = $2, updated_at = now(), updated_by_id = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(updated_by)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User organization not found".to_string()));
        }
        Ok(())
    }

    pub async fn set_developer_key(
        pool: &PgPool,
        id: Uuid,
        key: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE user_organizations SET developer_secret_key = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(key)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM user_organizations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User organization not found".to_string()));
        }
        Ok(())
    }

    /// All-or-nothing bulk delete: the first missing id rolls the whole call back
    pub async fn bulk_delete(pool: &PgPool, ids: &[Uuid]) -> Result<(), DatabaseError> {
        let mut tx = pool.begin().await?;
        for id in ids {
            let result = sqlx::query("DELETE FROM user_organizations WHERE id = $1")
                .bind(*id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(DatabaseError::NotFound(format!("User organization {} not found", id)));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count_in_branch(
        pool: PgPool,
        user_id: Uuid,
        organization_id: Uuid,
        branch_id: Uuid,
    ) -> Result<i64, DatabaseError> {
        Self::repository(pool)
            .count(
                Filter::new()
                    .eq("user_id", user_id)
                    .eq("organization_id", organization_id)
                    .eq("branch_id", branch_id),
            )
            .await
    }

    pub async fn count_in_organization(
        pool: PgPool,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<i64, DatabaseError> {
        Self::repository(pool)
            .count(
                Filter::new()
                    .eq("user_id", user_id)
                    .eq("organization_id", organization_id),
            )
            .await
    }

    pub async fn member_can_join(
        pool: &PgPool,
        user_id: Uuid,
        organization_id: Uuid,
        branch_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let in_branch = Self::count_in_branch(pool.clone(), user_id, organization_id, branch_id).await?;
        let in_org = Self::count_in_organization(pool.clone(), user_id, organization_id).await?;
        Ok(member_join_allowed(in_branch, in_org))
    }

    pub async fn employee_can_join(
        pool: &PgPool,
        user_id: Uuid,
        organization_id: Uuid,
        branch_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let in_branch = Self::count_in_branch(pool.clone(), user_id, organization_id, branch_id).await?;
        Ok(employee_join_allowed(in_branch))
    }

    /// Owner memberships of an organization, for admin notifications
    pub async fn organization_owners(
        pool: PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<UserOrganization>, DatabaseError> {
        Self::repository(pool)
            .select_any(
                Filter::new()
                    .eq("organization_id", organization_id)
                    .eq("user_type", ROLE_OWNER),
            )
            .await
    }
}

/// A member may hold at most one membership per organization, across all
/// branches.
pub fn member_join_allowed(memberships_in_branch: i64, memberships_in_org: i64) -> bool {
    memberships_in_branch == 0 && memberships_in_org == 0
}

/// An employee may join any branch they are not already in.
pub fn employee_join_allowed(memberships_in_branch: i64) -> bool {
    memberships_in_branch == 0
}

/// Developer secret key: deterministic uuid-v5 of the user id, salted with a
/// random component so refreshes produce distinct keys.
pub fn generate_developer_key(user_id: Uuid) -> String {
    let derived = Uuid::new_v5(&Uuid::NAMESPACE_OID, user_id.as_bytes());
    format!("{}-{}", derived.simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(user_type: &str, status: &str) -> UserOrganization {
        let now = Utc::now();
        let id = Uuid::new_v4();
        UserOrganization {
            id,
            created_at: now,
            created_by_id: id,
            updated_at: now,
            updated_by_id: id,
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_type: user_type.to_string(),
            application_status: status.to_string(),
            description: String::new(),
            application_description: String::new(),
            developer_secret_key: generate_developer_key(id),
            permission_name: ROLE_MEMBER.to_string(),
            permission_description: String::new(),
            permissions: vec![],
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

    #[test]
    fn only_members_can_leave() {
        assert!(membership(ROLE_MEMBER, STATUS_ACCEPTED).can_leave());
        assert!(!membership(ROLE_EMPLOYEE, STATUS_ACCEPTED).can_leave());
        assert!(!membership(ROLE_OWNER, STATUS_ACCEPTED).can_leave());
    }

    #[test]
    fn staff_roles() {
        assert!(membership(ROLE_OWNER, STATUS_ACCEPTED).is_staff());
        assert!(membership(ROLE_EMPLOYEE, STATUS_PENDING).is_staff());
        assert!(!membership(ROLE_MEMBER, STATUS_ACCEPTED).is_staff());
    }

    #[test]
    fn member_join_requires_no_membership_anywhere_in_org() {
        assert!(member_join_allowed(0, 0));
        assert!(!member_join_allowed(1, 1));
        assert!(!member_join_allowed(0, 1)); // already in another branch
    }

    #[test]
    fn employee_join_requires_no_membership_in_branch() {
        assert!(employee_join_allowed(0));
        assert!(!employee_join_allowed(1));
    }

    #[test]
    fn developer_keys_are_salted() {
        let user = Uuid::new_v4();
        let a = generate_developer_key(user);
        let b = generate_developer_key(user);
        assert_ne!(a, b);
        // deterministic prefix is shared between refreshes for the same user
        assert_eq!(a.split('-').next(), b.split('-').next());
    }

    #[test]
    fn membership_serialization_hides_secret_key() {
        let rec = membership(ROLE_MEMBER, STATUS_PENDING);
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("developer_secret_key").is_none());
        assert_eq!(json["application_status"], STATUS_PENDING);
    }
}
