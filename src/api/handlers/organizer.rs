//! Organizer verification handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ApplyOrganizerRequest, OrganizerResponse, RejectOrganizerRequest};
use crate::app_state::AppState;
use crate::auth::Session;
use crate::domain::OrganizerId;
use crate::error::{ErrorResponse, ServerError};

/// `POST /organizers` — Apply to become an organizer.
///
/// # Errors
///
/// Returns [`ServerError::StateConflict`] when the profile already has an
/// organizer record.
pub async fn apply(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<ApplyOrganizerRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let organizer = state
        .organizers
        .apply(session.actor(), &req.name, &req.contact_email)
        .await?;
    Ok((StatusCode::CREATED, Json(OrganizerResponse::from(organizer))))
}

/// `GET /organizers/me` — The caller's organizer record.
///
/// # Errors
///
/// Returns [`ServerError::InvalidRequest`] when the caller has never
/// applied.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ServerError> {
    let organizer = state
        .store
        .organizer_by_profile(session.profile_id())
        .await?
        .ok_or_else(|| {
            ServerError::InvalidRequest("no organizer record for this profile".to_string())
        })?;
    Ok(Json(OrganizerResponse::from(organizer)))
}

/// `GET /organizers/pending` — Verification queue. Admin only.
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] for non-admins.
pub async fn pending(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ServerError> {
    let organizers = state.organizers.pending(session.actor()).await?;
    let data: Vec<OrganizerResponse> =
        organizers.into_iter().map(OrganizerResponse::from).collect();
    Ok(Json(data))
}

/// `POST /organizers/{id}/approve` — Approve a pending organizer. Admin
/// only.
///
/// # Errors
///
/// Returns [`ServerError`] for non-admins or already-decided organizers.
#[utoipa::path(
    post,
    path = "/api/v1/organizers/{id}/approve",
    tag = "Organizers",
    summary = "Approve an organizer",
    description = "Terminal admin decision. Approved organizers may publish their approved events.",
    params(
        ("id" = uuid::Uuid, Path, description = "Organizer UUID"),
    ),
    responses(
        (status = 200, description = "Organizer approved", body = OrganizerResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 409, description = "Already decided", body = ErrorResponse),
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let organizer = state
        .organizers
        .approve(session.actor(), OrganizerId::from_uuid(id))
        .await?;
    Ok(Json(OrganizerResponse::from(organizer)))
}

/// `POST /organizers/{id}/reject` — Reject a pending organizer with a
/// reason. Admin only.
///
/// # Errors
///
/// Returns [`ServerError`] for non-admins, blank reasons, or
/// already-decided organizers.
pub async fn reject(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RejectOrganizerRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let organizer = state
        .organizers
        .reject(session.actor(), OrganizerId::from_uuid(id), &req.reason)
        .await?;
    Ok(Json(OrganizerResponse::from(organizer)))
}

/// Organizer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizers", post(apply))
        .route("/organizers/me", get(me))
        .route("/organizers/pending", get(pending))
        .route("/organizers/{id}/approve", post(approve))
        .route("/organizers/{id}/reject", post(reject))
}
