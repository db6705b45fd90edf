//! Account endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{LoginRequest, RegisterRequest, ResetCredential, User},
    AppState,
};

/// Generic acknowledgement
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid request or guest role"),
        (status = 401, description = "Registrar credentials don't match"),
        (status = 403, description = "Administrator role requested without an administrator registrar"),
        (status = 409, description = "Username already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    request.account.validate()?;

    let user = state
        .services
        .accounts
        .register_by(request.registrar.as_ref(), &request.account)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get an account by username
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "Account details", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.accounts.get_user(&user_id).await?;
    Ok(Json(user))
}

/// Replace an account's password
#[utoipa::path(
    post,
    path = "/users/{id}/credential",
    tag = "users",
    params(
        ("id" = String, Path, description = "Username")
    ),
    request_body = ResetCredential,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_credential(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ResetCredential>,
) -> AppResult<Json<MessageResponse>> {
    request.validate()?;

    state
        .services
        .accounts
        .reset_credential(&user_id, &request.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}

/// Check a username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials match", body = User),
        (status = 401, description = "Username and password don't match")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .services
        .accounts
        .authenticate(&request.id, &request.password)
        .await?;
    Ok(Json(user))
}
