//! Authentication handlers: signup, login, current profile.
//!
//! The identity provider here is deliberately minimal — email lookup plus
//! a signed session token. Production deployments would front this with a
//! real IdP; the token contract (signed claims with expiry) stays the
//! same.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{LoginRequest, LoginResponse, ProfileResponse, SignupRequest};
use crate::app_state::AppState;
use crate::auth::Session;
use crate::domain::{Profile, Role};
use crate::error::{ErrorResponse, ServerError};

/// `POST /auth/signup` — Create a profile and start a session.
///
/// # Errors
///
/// Returns [`ServerError`] on an invalid role, self-assigned admin, or
/// duplicate email.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "Auth",
    summary = "Create a profile",
    description = "Creates a profile with the given role (admin cannot be self-assigned) and returns a session token.",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Profile created", body = LoginResponse),
        (status = 400, description = "Invalid role or fields", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ServerError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ServerError::InvalidRequest(
            "name and email are required".to_string(),
        ));
    }
    let role: Role = req
        .role
        .parse()
        .map_err(ServerError::InvalidRequest)?;
    if role == Role::Admin {
        return Err(ServerError::InvalidRequest(
            "admin role cannot be self-assigned".to_string(),
        ));
    }

    let profile = Profile::new(req.name.trim(), req.email.trim(), role);
    state.store.insert_profile(profile.clone()).await?;
    let token = state.sessions.mint(&profile)?;
    tracing::info!(profile = %profile.id, role = %role, "profile created");

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            profile: profile.into(),
        }),
    ))
}

/// `POST /auth/login` — Start a session for an existing profile.
///
/// # Errors
///
/// Returns [`ServerError::Unauthorized`] for unknown emails.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    summary = "Log in",
    description = "Looks up the profile by email and returns a fresh signed session token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session started", body = LoginResponse),
        (status = 401, description = "Unknown email", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let profile = state
        .store
        .profile_by_email(req.email.trim())
        .await?
        .ok_or_else(|| ServerError::Unauthorized("unknown email".to_string()))?;
    let token = state.sessions.mint(&profile)?;
    Ok(Json(LoginResponse {
        token,
        profile: profile.into(),
    }))
}

/// `GET /auth/me` — The authenticated profile.
///
/// # Errors
///
/// Returns [`ServerError::Unauthorized`] without a valid session.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ServerError> {
    let profile = state.store.profile(session.profile_id()).await?;
    Ok(Json(ProfileResponse::from(profile)))
}

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}
