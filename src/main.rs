use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use coop_batch_api::database::manager::DatabaseManager;
use coop_batch_api::handlers;
use coop_batch_api::middleware::jwt_auth_middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = coop_batch_api::config::config();
    tracing::info!("Starting coop-batch-api in {:?} mode", config.environment);

    // Best-effort: the server still starts without a database and reports
    // degraded health until one appears
    if let Err(e) = DatabaseManager::migrate().await {
        tracing::warn!("startup migration skipped: {}", e);
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("COOP_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("coop-batch-api listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/auth/login", axum::routing::post(handlers::auth::login))
        // Everything else requires a bearer token
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn protected_routes() -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(batch_routes())
        .merge(cash_count_routes())
        .merge(invitation_routes())
        .merge(membership_routes())
        .layer(axum::middleware::from_fn(jwt_auth_middleware))
}

fn auth_routes() -> Router {
    use coop_batch_api::handlers::auth;

    Router::new().route("/api/v1/auth/whoami", get(auth::whoami))
}

fn batch_routes() -> Router {
    use axum::routing::put;
    use coop_batch_api::handlers::batch;

    Router::new()
        .route(
            "/api/v1/transaction-batch",
            get(batch::batch_list).post(batch::batch_open),
        )
        .route("/api/v1/transaction-batch/search", get(batch::batch_search))
        .route("/api/v1/transaction-batch/current", get(batch::batch_current))
        .route("/api/v1/transaction-batch/end", put(batch::batch_end))
        .route(
            "/api/v1/transaction-batch/view-request",
            get(batch::batch_view_requests),
        )
        .route(
            "/api/v1/transaction-batch/ended-batch",
            get(batch::batch_ended_today),
        )
        .route(
            "/api/v1/transaction-batch/:transaction_batch_id",
            get(batch::batch_get),
        )
        .route(
            "/api/v1/transaction-batch/:transaction_batch_id/deposit-in-bank",
            put(batch::batch_update_deposit),
        )
        .route(
            "/api/v1/transaction-batch/:transaction_batch_id/signature",
            put(batch::batch_update_signature),
        )
        .route(
            "/api/v1/transaction-batch/:transaction_batch_id/view-request",
            put(batch::batch_view_request),
        )
        .route(
            "/api/v1/transaction-batch/:transaction_batch_id/view-accept",
            put(batch::batch_view_accept),
        )
        .route(
            "/api/v1/transaction-batch/employee/:user_organization_id/search",
            get(batch::batch_employee_search),
        )
}

fn cash_count_routes() -> Router {
    use axum::routing::delete;
    use coop_batch_api::handlers::cash_count;

    Router::new()
        .route(
            "/api/v1/cash-count",
            get(cash_count::cash_count_list).post(cash_count::cash_count_create),
        )
        .route(
            "/api/v1/cash-count/:cash_count_id",
            delete(cash_count::cash_count_delete),
        )
}

fn invitation_routes() -> Router {
    use axum::routing::delete;
    use coop_batch_api::handlers::invitation;

    Router::new()
        .route(
            "/api/v1/invitation-code",
            get(invitation::invitation_list).post(invitation::invitation_create),
        )
        .route("/api/v1/invitation-code/search", get(invitation::invitation_search))
        .route(
            "/api/v1/invitation-code/code/:code",
            get(invitation::invitation_get_by_code),
        )
        .route(
            "/api/v1/invitation-code/bulk-delete",
            delete(invitation::invitation_bulk_delete),
        )
        .route(
            "/api/v1/invitation-code/:invitation_code_id",
            get(invitation::invitation_get)
                .put(invitation::invitation_update)
                .delete(invitation::invitation_delete),
        )
}

fn membership_routes() -> Router {
    use axum::routing::{delete, post};
    use coop_batch_api::handlers::membership;

    Router::new()
        .route(
            "/api/v1/user-organization/invitation-code/:code/join",
            post(membership::join_with_code),
        )
        .route(
            "/api/v1/user-organization/organization/:organization_id/branch/:branch_id/join",
            post(membership::join_direct),
        )
        .route(
            "/api/v1/user-organization/organization/:organization_id/branch/:branch_id/can-join-member",
            get(membership::can_join_member),
        )
        .route(
            "/api/v1/user-organization/organization/:organization_id/branch/:branch_id/can-join-employee",
            get(membership::can_join_employee),
        )
        .route("/api/v1/user-organization/leave", post(membership::membership_leave))
        .route("/api/v1/user-organization/unswitch", post(membership::membership_unswitch))
        .route("/api/v1/user-organization/current", get(membership::membership_current))
        .route(
            "/api/v1/user-organization/developer-key-refresh",
            post(membership::developer_key_refresh),
        )
        .route("/api/v1/user-organization/employee", get(membership::membership_employees))
        .route("/api/v1/user-organization/members", get(membership::membership_members))
        .route(
            "/api/v1/user-organization/join-request",
            get(membership::membership_join_requests),
        )
        .route(
            "/api/v1/user-organization/bulk-delete",
            delete(membership::membership_bulk_delete),
        )
        .route(
            "/api/v1/user-organization/:user_organization_id",
            get(membership::membership_get).delete(membership::membership_delete),
        )
        .route(
            "/api/v1/user-organization/:user_organization_id/accept",
            post(membership::membership_accept),
        )
        .route(
            "/api/v1/user-organization/:user_organization_id/reject",
            delete(membership::membership_reject),
        )
        .route(
            "/api/v1/user-organization/:user_organization_id/switch",
            get(membership::membership_switch),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "coop-batch-api",
            "version": version,
            "description": "Cooperative back-office API - transaction batches and organization membership",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/api/v1/auth/login (public), /api/v1/auth/whoami (protected)",
                "transaction_batch": "/api/v1/transaction-batch[...] (protected)",
                "cash_count": "/api/v1/cash-count[...] (protected)",
                "invitation_code": "/api/v1/invitation-code[...] (protected)",
                "user_organization": "/api/v1/user-organization[...] (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
