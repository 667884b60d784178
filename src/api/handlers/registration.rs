//! Registration and payment handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ConfirmPaymentRequest, CreateRegistrationRequest, OrderResponse,
    RegistrationReceiptResponse, RegistrationResponse,
};
use crate::app_state::AppState;
use crate::auth::Session;
use crate::domain::{EventId, PassTypeId, RegistrationId};
use crate::error::{ErrorResponse, ServerError};
use crate::service::NewRegistration;

/// `POST /registrations` — Register for an event.
///
/// Free passes confirm and issue the ticket inline; paid passes return a
/// pending registration awaiting payment.
///
/// # Errors
///
/// Returns [`ServerError`] on validation, capacity, or state failures.
#[utoipa::path(
    post,
    path = "/api/v1/registrations",
    tag = "Registrations",
    summary = "Register for an event",
    description = "Creates a registration for a pass. Team events require a team name and roster within the event's size limit.",
    request_body = CreateRegistrationRequest,
    responses(
        (status = 201, description = "Registration created", body = RegistrationReceiptResponse),
        (status = 400, description = "Validation failure", body = ErrorResponse),
        (status = 422, description = "Sold out or event full", body = ErrorResponse),
    )
)]
pub async fn create_registration(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateRegistrationRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let receipt = state
        .registrations
        .register(session.actor(), NewRegistration {
            event_id: EventId::from_uuid(req.event_id),
            pass_type_id: PassTypeId::from_uuid(req.pass_type_id),
            team_name: req.team_name,
            team_members: req.team_members.into_iter().map(Into::into).collect(),
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegistrationReceiptResponse::from(receipt)),
    ))
}

/// `GET /registrations/{id}` — Registration details (registrant or
/// admin).
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] for other callers.
pub async fn get_registration(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let registration = state
        .registrations
        .registration(session.actor(), RegistrationId::from_uuid(id))
        .await?;
    Ok(Json(RegistrationResponse::from(registration)))
}

/// `POST /registrations/{id}/cancel` — Cancel a pending registration.
///
/// # Errors
///
/// Returns [`ServerError`] for non-owners or non-pending registrations.
pub async fn cancel_registration(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let registration = state
        .registrations
        .cancel(session.actor(), RegistrationId::from_uuid(id))
        .await?;
    Ok(Json(RegistrationResponse::from(registration)))
}

/// `POST /registrations/{id}/order` — Open a payment order.
///
/// # Errors
///
/// Returns [`ServerError`] for free passes or non-pending registrations.
pub async fn open_order(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let order = state
        .registrations
        .open_order(session.actor(), RegistrationId::from_uuid(id))
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// `POST /registrations/{id}/confirm` — Confirm a payment callback.
///
/// The signature must verify against the shared payment secret;
/// confirmation issues the ticket atomically.
///
/// # Errors
///
/// Returns [`ServerError::SignatureMismatch`] on a bad signature —
/// a hard rejection, the payment flow must restart.
#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/confirm",
    tag = "Registrations",
    summary = "Confirm payment",
    description = "Verifies the collaborator's HMAC signature over order_id|payment_id and, on success, confirms the registration and issues the ticket in one unit of work.",
    params(
        ("id" = uuid::Uuid, Path, description = "Registration UUID"),
    ),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed, ticket issued", body = RegistrationReceiptResponse),
        (status = 422, description = "Signature mismatch", body = ErrorResponse),
    )
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let receipt = state
        .registrations
        .confirm_payment(
            session.actor(),
            RegistrationId::from_uuid(id),
            &req.order_id,
            &req.payment_id,
            &req.signature,
        )
        .await?;
    Ok(Json(RegistrationReceiptResponse::from(receipt)))
}

/// Registration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/registrations", post(create_registration))
        .route("/registrations/{id}", get(get_registration))
        .route("/registrations/{id}/cancel", post(cancel_registration))
        .route("/registrations/{id}/order", post(open_order))
        .route("/registrations/{id}/confirm", post(confirm_payment))
}
