use axum::{response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::repository::Filter;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::user::User;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auth/login - authenticate and receive a bearer token with no
/// organization context set
pub async fn login(Json(req): Json<LoginRequest>) -> Result<Json<Value>, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation_error("Email and password are required", None));
    }

    let pool = DatabaseManager::pool().await?;
    let user = User::repository(pool)
        .select_one(Filter::new().eq("email", req.email.trim()))
        .await?
        .filter(|u| u.verify_password(&req.password))
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let claims = Claims::new(user.id, user.email.clone(), None);
    let token = generate_jwt(claims)?;
    let expires_in = config::config().security.jwt_expiry_hours * 3600;

    Ok(Json(json!({
        "token": token,
        "user": user,
        "expires_in": expires_in
    })))
}

/// GET /api/v1/auth/whoami - echo the authenticated claims
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "user_id": auth.user_id,
        "email": auth.email,
        "user_organization_id": auth.user_organization_id,
    }))
}
