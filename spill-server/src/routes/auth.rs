use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use validator::Validate;

use spill_shared::errors::{AppError, AppResult, ErrorCode};
use spill_shared::middleware::sign_jwt;
use spill_shared::types::auth::{AccessToken, Claims, UserRole};
use spill_shared::types::ApiResponse;

use crate::models::Account;
use crate::schema::{accounts, user_roles};
use crate::services::auth_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
}

fn invalid_credentials() -> AppError {
    AppError::new(ErrorCode::InvalidCredentials, "invalid email or password")
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AccessToken>>> {
    req.validate()?;

    let mut conn = state.conn()?;
    let account: Account = accounts::table
        .filter(accounts::email.eq(req.email.trim().to_lowercase()))
        .select(Account::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(invalid_credentials)?;

    if !auth_service::verify_password(&req.password, &account.password_hash)? {
        tracing::warn!(account_id = %account.id, "failed sign-in attempt");
        return Err(invalid_credentials());
    }

    let roles: Vec<String> = user_roles::table
        .filter(user_roles::user_id.eq(account.id))
        .select(user_roles::role)
        .load(&mut conn)?;
    let role = if roles.iter().any(|r| r.parse::<UserRole>() == Ok(UserRole::Admin)) {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let ttl = state.config.jwt_ttl_secs;
    let token = sign_jwt(&Claims::new(account.id, role, ttl), &state.config.jwt_secret)?;

    tracing::info!(account_id = %account.id, role = %role, "signed in");

    Ok(Json(ApiResponse::ok(AccessToken::bearer(token, ttl, role))))
}
