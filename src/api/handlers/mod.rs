//! REST endpoint handlers organized by resource.

pub mod auth;
pub mod checkin;
pub mod event;
pub mod organizer;
pub mod registration;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(event::routes())
        .merge(registration::routes())
        .merge(checkin::routes())
        .merge(organizer::routes())
}
