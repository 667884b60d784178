//! Service layer: business logic orchestration.
//!
//! Each service owns a slice of the domain: catalog lifecycle
//! ([`EventService`]), organizer verification ([`OrganizerService`]),
//! registration and issuance ([`RegistrationService`]), and the check-in
//! validator ([`CheckInService`]). Every mutation follows the same
//! pattern: validate → delegate the atomic write to the store → emit
//! events on the bus → return the result.

pub mod checkin_service;
pub mod event_service;
pub mod organizer_service;
pub mod registration_service;

pub use checkin_service::{CheckInService, ScanOutcome};
pub use event_service::{EventService, NewPass};
pub use organizer_service::OrganizerService;
pub use registration_service::{NewRegistration, RegistrationReceipt, RegistrationService};

use crate::domain::{ProfileId, Role};

/// The authenticated identity a handler passes into a service call.
///
/// Derived from a verified session; carries exactly what permission checks
/// need, keeping services independent of the HTTP auth plumbing.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    /// Acting profile.
    pub profile_id: ProfileId,
    /// Role at session-mint time.
    pub role: Role,
}

impl Actor {
    /// Returns `true` for platform administrators.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
