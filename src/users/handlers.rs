use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath, ClientIp},
    state::AppState,
    users::dto::{PublicUser, ResetPasswordRequest, UpdateUserRequest},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user", get(list_users))
        .route("/api/user/resetpassword", patch(reset_password))
        .route(
            "/api/user/currentuser",
            get(get_current_user)
                .put(update_current_user)
                .delete(delete_current_user),
        )
        .route(
            "/api/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Writes through `/api/user/{id}` are limited to the caller's own account.
/// Another account answers 404, the same as a missing one.
fn require_owner(caller: i64, id: i64) -> AppResult<()> {
    if caller != id {
        warn!(caller, target_id = id, "write to another user's profile refused");
        return Err(AppError::NotFound("User not found.".into()));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> AppResult<Json<Vec<PublicUser>>> {
    Ok(Json(state.users.list().await?))
}

#[instrument(skip(state))]
pub async fn get_current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(state.users.get(user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ClientIp(origin): ClientIp,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(state.users.update(user_id, payload, origin).await?))
}

#[instrument(skip(state))]
pub async fn delete_current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    state.users.delete(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(state.users.get(id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ClientIp(origin): ClientIp,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    require_owner(caller, id)?;
    Ok(Json(state.users.update(id, payload, origin).await?))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    require_owner(caller, id)?;
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Anonymous: the email alone identifies the account.
#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ClientIp(origin): ClientIp,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    state.auth.reset_password(payload, origin).await?;
    Ok(StatusCode::NO_CONTENT)
}
