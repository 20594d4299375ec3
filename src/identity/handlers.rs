use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::error::IdentityError;
use crate::identity::dto::{SignUpRequest, UserResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/login", get(login))
}

#[instrument(skip(state, payload))]
async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<UserResponse>), IdentityError> {
    let response = state.identity.sign_up(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, headers))]
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, IdentityError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let response = state.identity.login(authorization).await?;
    Ok(Json(response))
}
