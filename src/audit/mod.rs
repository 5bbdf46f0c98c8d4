use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};

/// An audit "footstep": one user action and its outcome
#[derive(Debug, Clone)]
pub struct FootstepEvent {
    pub activity: &'static str,
    pub description: String,
    pub module: &'static str,
}

/// Best-effort notification pushed to a user's inbox
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub title: String,
    pub description: String,
    pub notification_type: &'static str,
}

pub const NOTIFICATION_INFO: &str = "info";
pub const NOTIFICATION_SUCCESS: &str = "success";

/// Destination for audit events. The database sink is the default; tests can
/// observe through their own implementation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_footstep(
        &self,
        user_id: Uuid,
        user_organization_id: Option<Uuid>,
        event: &FootstepEvent,
    ) -> Result<(), DatabaseError>;

    async fn record_notification(
        &self,
        user_id: Uuid,
        event: &NotificationEvent,
    ) -> Result<(), DatabaseError>;
}

pub struct DatabaseSink;

#[async_trait]
impl AuditSink for DatabaseSink {
    async fn record_footstep(
        &self,
        user_id: Uuid,
        user_organization_id: Option<Uuid>,
        event: &FootstepEvent,
    ) -> Result<(), DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        insert_footstep(&pool, user_id, user_organization_id, event).await
    }

    async fn record_notification(
        &self,
        user_id: Uuid,
        event: &NotificationEvent,
    ) -> Result<(), DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        insert_notification(&pool, user_id, event).await
    }
}

async fn insert_footstep(
    pool: &PgPool,
    user_id: Uuid,
    user_organization_id: Option<Uuid>,
    event: &FootstepEvent,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO footsteps (id, created_at, user_id, user_organization_id, activity, description, module)
         VALUES (gen_random_uuid(), now(), $1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(user_organization_id)
    .bind(event.activity)
    .bind(&event.description)
    .bind(event.module)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_notification(
    pool: &PgPool,
    user_id: Uuid,
    event: &NotificationEvent,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO notifications (id, created_at, user_id, title, description, notification_type, is_read)
         VALUES (gen_random_uuid(), now(), $1, $2, $3, $4, FALSE)",
    )
    .bind(user_id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.notification_type)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a footstep without blocking the request. Failures are logged and
/// never reach the caller: the primary transaction has already settled by the
/// time this runs.
pub fn footstep(user_id: Uuid, user_organization_id: Option<Uuid>, event: FootstepEvent) {
    tokio::spawn(async move {
        if let Err(e) = DatabaseSink
            .record_footstep(user_id, user_organization_id, &event)
            .await
        {
            tracing::warn!(
                activity = event.activity,
                module = event.module,
                error = %e,
                "failed to record footstep"
            );
        }
    });
}

/// Notify every owner of an organization, best-effort
pub fn notify_organization_owners(organization_id: Uuid, event: NotificationEvent) {
    tokio::spawn(async move {
        let result = async {
            let pool = DatabaseManager::pool().await?;
            let owners = crate::models::user_organization::UserOrganization::organization_owners(
                pool.clone(),
                organization_id,
            )
            .await?;
            for owner in owners {
                insert_notification(&pool, owner.user_id, &event).await?;
            }
            Ok::<(), DatabaseError>(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(%organization_id, error = %e, "failed to notify organization owners");
        }
    });
}

/// Notify a single user, best-effort
pub fn notify_user(user_id: Uuid, event: NotificationEvent) {
    tokio::spawn(async move {
        if let Err(e) = DatabaseSink.record_notification(user_id, &event).await {
            tracing::warn!(%user_id, error = %e, "failed to record notification");
        }
    });
}
