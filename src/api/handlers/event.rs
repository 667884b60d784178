//! Event catalog handlers: CRUD, lifecycle transitions, passes,
//! attendance.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AttendanceResponse, CreateEventRequest, CreatePassRequest, EventListResponse, EventResponse,
    PaginationParams, PassTypeResponse,
};
use crate::app_state::AppState;
use crate::auth::Session;
use crate::domain::{EventId, NewEvent, OrganizerId};
use crate::error::{ErrorResponse, ServerError};
use crate::service::NewPass;

/// `POST /events` — Draft a new event.
///
/// # Errors
///
/// Returns [`ServerError`] when the caller has no organizer record or the
/// fields are invalid.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Draft an event",
    description = "Creates a draft event owned by the caller's organizer record. Publication happens later through submit/approve/publish.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event drafted", body = EventResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 403, description = "No organizer record", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let new = NewEvent {
        // Replaced with the caller's organizer record by the service.
        organizer_id: OrganizerId::new(),
        title: req.title,
        description: req.description,
        venue: req.venue,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        max_participants: req.max_participants,
        is_team_event: req.is_team_event,
        max_team_size: req.max_team_size,
    };
    let event = state.events.create_event(session.actor(), new).await?;
    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// `GET /events` — Public catalog of published events, paginated.
///
/// # Errors
///
/// Returns [`ServerError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List published events",
    description = "Returns a paginated list of events visible in the public catalog.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServerError> {
    let params = params.clamped();
    let events = state.events.list_published().await?;

    let total = u32::try_from(events.len()).unwrap_or(u32::MAX);
    let data: Vec<EventResponse> = events
        .into_iter()
        .skip(params.offset())
        .take(params.per_page as usize)
        .map(EventResponse::from)
        .collect();

    Ok(Json(EventListResponse {
        data,
        pagination: params.meta(total),
    }))
}

/// `GET /events/mine` — Every event owned by the caller, any status.
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] when the caller has no organizer
/// record.
pub async fn my_events(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ServerError> {
    let events = state.events.my_events(session.actor()).await?;
    let data: Vec<EventResponse> = events.into_iter().map(EventResponse::from).collect();
    Ok(Json(data))
}

/// `GET /events/{id}` — Event details.
///
/// Unpublished events are visible only to their owner and admins.
///
/// # Errors
///
/// Returns [`ServerError::EventNotFound`] when absent or hidden.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event details",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    session: Option<Session>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let viewer = session.as_ref().map(Session::actor);
    let event = state
        .events
        .event_detail(viewer, EventId::from_uuid(id))
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `POST /events/{id}/submit` — Submit a draft for admin review.
///
/// # Errors
///
/// Returns [`ServerError`] for non-owners or off-graph transitions.
pub async fn submit_event(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let event = state
        .events
        .submit_event(session.actor(), EventId::from_uuid(id))
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `POST /events/{id}/approve` — Admin approval.
///
/// # Errors
///
/// Returns [`ServerError`] for non-admins or off-graph transitions.
pub async fn approve_event(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let event = state
        .events
        .approve_event(session.actor(), EventId::from_uuid(id))
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `POST /events/{id}/publish` — Publish an approved event.
///
/// # Errors
///
/// Returns [`ServerError::OrganizerNotVerified`] when the owning
/// organizer has not passed verification.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/publish",
    tag = "Events",
    summary = "Publish an event",
    description = "Moves an approved event into the public catalog. Gated on the owning organizer being verified.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event published", body = EventResponse),
        (status = 409, description = "Not in a publishable state", body = ErrorResponse),
        (status = 422, description = "Organizer not verified", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let event = state
        .events
        .publish_event(session.actor(), EventId::from_uuid(id))
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `POST /events/{id}/cancel` — Cancel an event.
///
/// # Errors
///
/// Returns [`ServerError`] for non-owners or terminal events.
pub async fn cancel_event(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let event = state
        .events
        .cancel_event(session.actor(), EventId::from_uuid(id))
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `GET /events/{id}/passes` — Pass types for an event.
///
/// # Errors
///
/// Returns [`ServerError`] on internal failures.
pub async fn list_passes(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let passes = state.events.passes(EventId::from_uuid(id)).await?;
    let data: Vec<PassTypeResponse> = passes.into_iter().map(PassTypeResponse::from).collect();
    Ok(Json(data))
}

/// `POST /events/{id}/passes` — Define a new pass type.
///
/// # Errors
///
/// Returns [`ServerError`] for non-owners or invalid fields.
pub async fn create_pass(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<CreatePassRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let pass = state
        .events
        .create_pass(session.actor(), EventId::from_uuid(id), NewPass {
            name: req.name,
            price: req.price,
            quantity: req.quantity,
            sale_start: req.sale_start,
            sale_end: req.sale_end,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(PassTypeResponse::from(pass))))
}

/// `GET /events/{id}/attendance` — Attendance dashboard numbers.
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] for non-staff callers.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/attendance",
    tag = "Events",
    summary = "Attendance summary",
    description = "Ticket counts (issued / checked in / cancelled / outstanding) for an event. Staff only.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceResponse),
        (status = 403, description = "Not staff", body = ErrorResponse),
    )
)]
pub async fn attendance(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let (event, summary) = state
        .events
        .attendance(session.actor(), EventId::from_uuid(id))
        .await?;
    Ok(Json(AttendanceResponse::build(&event, summary)))
}

/// Event catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/mine", get(my_events))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/submit", post(submit_event))
        .route("/events/{id}/approve", post(approve_event))
        .route("/events/{id}/publish", post(publish_event))
        .route("/events/{id}/cancel", post(cancel_event))
        .route("/events/{id}/passes", get(list_passes).post(create_pass))
        .route("/events/{id}/attendance", get(attendance))
}
