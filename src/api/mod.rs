//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints are mounted under `/api/v1` except the system routes.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document covering the annotated endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "tessera-server",
        description = "Student-event ticketing: catalog, registration, payment confirmation, QR check-in."
    ),
    paths(
        handlers::system::health_handler,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::event::create_event,
        handlers::event::list_events,
        handlers::event::get_event,
        handlers::event::publish_event,
        handlers::event::attendance,
        handlers::registration::create_registration,
        handlers::registration::confirm_payment,
        handlers::checkin::check_in,
        handlers::checkin::ticket_qr,
        handlers::organizer::approve,
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
