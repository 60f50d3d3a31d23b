use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use crate::auth::extractor::AuthUser;
use crate::auth::service::{AuthPayload, GoogleAuthRequest, MePayload, SigninRequest, SignupRequest};
use crate::errors::AppError;
use crate::response::{self, ApiResponse};
use crate::state::AppState;

/// POST /api/v1/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AuthPayload>>), AppError> {
    let Json(req) = body?;
    let payload = state.auth.signup(req).await?;
    Ok(response::created(payload, "User created successfully"))
}

/// POST /api/v1/auth/signin
pub async fn handle_signin(
    State(state): State<AppState>,
    body: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthPayload>>, AppError> {
    let Json(req) = body?;
    let payload = state.auth.signin(req).await?;
    Ok(response::ok_with_message(payload, "Signed in successfully"))
}

/// POST /api/v1/auth/google
pub async fn handle_google(
    State(state): State<AppState>,
    body: Result<Json<GoogleAuthRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthPayload>>, AppError> {
    let Json(req) = body?;
    let payload = state.auth.google(req).await?;
    Ok(response::ok_with_message(payload, "Google sign-in successful"))
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ApiResponse<MePayload>>, AppError> {
    Ok(response::ok(state.auth.me(caller.user).await?))
}
