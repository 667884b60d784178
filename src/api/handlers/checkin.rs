//! Check-in and ticket handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CheckInRequest, QrResponse, ScanResultResponse, TicketResponse};
use crate::app_state::AppState;
use crate::auth::Session;
use crate::domain::{EventId, TicketId};
use crate::error::{ErrorResponse, ServerError};

/// `POST /events/{id}/checkin` — Validate a scanned code and check the
/// ticket in.
///
/// Always returns 200 with a three-way verdict; scan failures are data,
/// not errors, so one bad read never breaks the scanning loop.
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] when the caller cannot operate a
/// scanner — the only failure that escapes as an error.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/checkin",
    tag = "Check-in",
    summary = "Scan a ticket",
    description = "Decodes the QR payload, rejects cross-event replays, and performs an at-most-once active→used transition. Duplicates report the original scan time.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID the scanner is operating for"),
    ),
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Scan verdict", body = ScanResultResponse),
        (status = 403, description = "Caller may not scan", body = ErrorResponse),
    )
)]
pub async fn check_in(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<CheckInRequest>,
) -> Result<impl IntoResponse, ServerError> {
    session.require_scanner()?;
    let outcome = state
        .checkin
        .validate_and_check_in(&req.code, EventId::from_uuid(id), session.actor())
        .await;
    Ok(Json(ScanResultResponse::from(outcome)))
}

/// `GET /tickets/mine` — Tickets held by the caller.
///
/// # Errors
///
/// Returns [`ServerError`] on internal failures.
pub async fn my_tickets(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ServerError> {
    let tickets = state.checkin.my_tickets(session.actor()).await?;
    let data: Vec<TicketResponse> = tickets.into_iter().map(TicketResponse::from).collect();
    Ok(Json(data))
}

/// `GET /tickets/{id}/qr` — The QR wire string for a ticket.
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] unless the caller holds the ticket
/// or has a scanning role.
#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}/qr",
    tag = "Check-in",
    summary = "Render a ticket's QR payload",
    params(
        ("id" = uuid::Uuid, Path, description = "Ticket UUID"),
    ),
    responses(
        (status = 200, description = "QR payload", body = QrResponse),
        (status = 403, description = "Not the holder", body = ErrorResponse),
        (status = 409, description = "Ticket no longer active", body = ErrorResponse),
    )
)]
pub async fn ticket_qr(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let (payload, encoded) = state
        .checkin
        .qr_for_ticket(session.actor(), TicketId::from_uuid(id))
        .await?;
    Ok(Json(QrResponse {
        ticket_id: id,
        payload: encoded,
        qr: payload.into(),
    }))
}

/// `POST /tickets/{id}/cancel` — Administratively void a ticket.
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] for non-admins; used tickets cannot
/// be voided.
pub async fn cancel_ticket(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let ticket = state
        .checkin
        .cancel_ticket(session.actor(), TicketId::from_uuid(id))
        .await?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// Check-in and ticket routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/checkin", post(check_in))
        .route("/tickets/mine", get(my_tickets))
        .route("/tickets/{id}/qr", get(ticket_qr))
        .route("/tickets/{id}/cancel", post(cancel_ticket))
}
