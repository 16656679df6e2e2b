use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::dto::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest},
    error::{AppError, AppResult},
    extract::{ApiJson, ClientIp},
    state::AppState,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/checkemail/:email", get(check_email))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

#[instrument(skip(state))]
pub async fn check_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if state.auth.email_taken(&email).await? {
        return Err(AppError::DuplicateEmail);
    }
    Ok(Json(MessageResponse {
        message: "This email is available.",
    }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ClientIp(origin): ClientIp,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state.auth.register(payload, origin).await?;
    let location = format!("/api/user/{}", user.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(PublicUser::from(user)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.auth.login(payload).await?))
}
