//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::SessionKeys;
use crate::domain::EventBus;
use crate::payment::PaymentVerifier;
use crate::service::{CheckInService, EventService, OrganizerService, RegistrationService};
use crate::store::DataStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Selected data store backend.
    pub store: Arc<dyn DataStore>,
    /// Event catalog and pass management.
    pub events: Arc<EventService>,
    /// Organizer verification workflow.
    pub organizers: Arc<OrganizerService>,
    /// Registration, payment, issuance pipeline.
    pub registrations: Arc<RegistrationService>,
    /// Scan validation and ticket operations.
    pub checkin: Arc<CheckInService>,
    /// Session token minting and verification.
    pub sessions: SessionKeys,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires the service layer over a store and returns the shared state.
    #[must_use]
    pub fn new(
        store: Arc<dyn DataStore>,
        sessions: SessionKeys,
        payments: PaymentVerifier,
        event_bus: EventBus,
    ) -> Self {
        let events = Arc::new(EventService::new(Arc::clone(&store), event_bus.clone()));
        let organizers = Arc::new(OrganizerService::new(Arc::clone(&store), event_bus.clone()));
        let registrations = Arc::new(RegistrationService::new(
            Arc::clone(&store),
            event_bus.clone(),
            payments,
        ));
        let checkin = Arc::new(CheckInService::new(Arc::clone(&store), event_bus.clone()));
        Self {
            store,
            events,
            organizers,
            registrations,
            checkin,
            sessions,
            event_bus,
        }
    }
}
