//! Pluggable data store: trait plus PostgreSQL and in-memory backends.
//!
//! All persistence goes through [`DataStore`], selected once at startup by
//! configuration — business logic never branches on which backend is live.
//! [`postgres::PgStore`] is the production implementation;
//! [`memory::MemStore`] backs the fixture/demo configuration and unit
//! tests.
//!
//! The trait is mostly filter-by-equality reads and single-row writes, plus
//! the two operations that MUST be atomic in every backend:
//!
//! - [`DataStore::confirm_and_issue`] — the issuance unit of work:
//!   capacity-guarded counter bumps, registration confirmation, and ticket
//!   insert succeed or fail together.
//! - [`DataStore::check_in`] — the check-in compare-and-swap: the `used`
//!   write is conditioned on the ticket still being `active`, so exactly
//!   one of two racing scanners wins.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Event, EventId, EventStatus, Organizer, OrganizerId, PassType, PassTypeId, Profile, ProfileId,
    Registration, RegistrationId, Ticket, TicketId, TicketToken, VerificationStatus,
};
use crate::error::ServerError;

/// Outcome of the check-in compare-and-swap.
#[derive(Debug, Clone)]
pub enum CheckInWrite {
    /// This caller won the CAS; the returned ticket is the updated row.
    CheckedIn(Ticket),
    /// The ticket was already `used` (including CAS losers racing this
    /// scan). Carries the row as-is with the original scan fields.
    AlreadyUsed(Ticket),
    /// The ticket is in a non-scannable state (`cancelled`).
    NotScannable(Ticket),
    /// No ticket carries the given token.
    NotFound,
}

/// Aggregated per-event ticket counts for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AttendanceSummary {
    /// Tickets issued (any status).
    pub issued: u32,
    /// Tickets checked in.
    pub checked_in: u32,
    /// Tickets cancelled.
    pub cancelled: u32,
}

/// Generic query interface over the relational store.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to share
/// across request handlers.
#[async_trait]
pub trait DataStore: Send + Sync + std::fmt::Debug {
    // ── Profiles ────────────────────────────────────────────────────────

    /// Inserts a profile.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::StateConflict`] on duplicate email, or
    /// [`ServerError::PersistenceError`] on backend failure.
    async fn insert_profile(&self, profile: Profile) -> Result<(), ServerError>;

    /// Fetches a profile by id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ProfileNotFound`] when absent.
    async fn profile(&self, id: ProfileId) -> Result<Profile, ServerError>;

    /// Looks up a profile by email.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, ServerError>;

    // ── Organizers ──────────────────────────────────────────────────────

    /// Inserts an organizer application.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn insert_organizer(&self, organizer: Organizer) -> Result<(), ServerError>;

    /// Fetches an organizer by id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::OrganizerNotFound`] when absent.
    async fn organizer(&self, id: OrganizerId) -> Result<Organizer, ServerError>;

    /// Looks up the organizer record owned by a profile.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn organizer_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Organizer>, ServerError>;

    /// Lists organizers awaiting verification.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn pending_organizers(&self) -> Result<Vec<Organizer>, ServerError>;

    /// Applies a verification decision, conditioned on the organizer still
    /// being `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::OrganizerNotFound`] when absent, or
    /// [`ServerError::StateConflict`] when the organizer already left
    /// `pending`.
    async fn set_organizer_verification(
        &self,
        id: OrganizerId,
        status: VerificationStatus,
        rejection_reason: Option<String>,
    ) -> Result<Organizer, ServerError>;

    // ── Events ──────────────────────────────────────────────────────────

    /// Inserts an event.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn insert_event(&self, event: Event) -> Result<(), ServerError>;

    /// Fetches an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::EventNotFound`] when absent.
    async fn event(&self, id: EventId) -> Result<Event, ServerError>;

    /// Lists events, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn events_by_status(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, ServerError>;

    /// Lists all events owned by an organizer, any status.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn events_by_organizer(&self, id: OrganizerId) -> Result<Vec<Event>, ServerError>;

    /// Transitions an event's status, conditioned on its current status
    /// being `from`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::EventNotFound`] when absent, or
    /// [`ServerError::StateConflict`] when the row is no longer in `from`.
    async fn set_event_status(
        &self,
        id: EventId,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<Event, ServerError>;

    // ── Pass types ──────────────────────────────────────────────────────

    /// Inserts a pass type.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn insert_pass_type(&self, pass: PassType) -> Result<(), ServerError>;

    /// Fetches a pass type by id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PassTypeNotFound`] when absent.
    async fn pass_type(&self, id: PassTypeId) -> Result<PassType, ServerError>;

    /// Lists pass types for an event.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn pass_types_for_event(&self, event_id: EventId)
    -> Result<Vec<PassType>, ServerError>;

    // ── Registrations ───────────────────────────────────────────────────

    /// Inserts a registration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn insert_registration(&self, registration: Registration) -> Result<(), ServerError>;

    /// Fetches a registration by id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::RegistrationNotFound`] when absent.
    async fn registration(&self, id: RegistrationId) -> Result<Registration, ServerError>;

    /// Records the payment order id opened for a pending registration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::RegistrationNotFound`] when absent, or
    /// [`ServerError::StateConflict`] when the registration is not
    /// `pending`.
    async fn set_registration_order(
        &self,
        id: RegistrationId,
        order_id: &str,
    ) -> Result<Registration, ServerError>;

    /// Cancels a pending registration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::RegistrationNotFound`] when absent, or
    /// [`ServerError::StateConflict`] when the registration already left
    /// `pending`.
    async fn cancel_registration(&self, id: RegistrationId) -> Result<Registration, ServerError>;

    // ── Issuance unit of work ───────────────────────────────────────────

    /// Atomically confirms a pending registration and issues its ticket.
    ///
    /// In one unit of work: re-checks pass capacity and event capacity,
    /// increments `sold` and `current_participants`, flips the
    /// registration to `confirmed` recording `payment_reference`, and
    /// inserts `ticket`. Exactly one ticket may ever exist per
    /// (registration, pass type) pair.
    ///
    /// # Errors
    ///
    /// - [`ServerError::RegistrationNotFound`] when the registration is
    ///   absent.
    /// - [`ServerError::StateConflict`] when it is not `pending`, or a
    ///   ticket already exists for the pair.
    /// - [`ServerError::SoldOut`] / [`ServerError::EventFull`] when a
    ///   capacity guard fails at write time.
    async fn confirm_and_issue(
        &self,
        registration_id: RegistrationId,
        payment_reference: Option<String>,
        ticket: Ticket,
    ) -> Result<Ticket, ServerError>;

    // ── Tickets ─────────────────────────────────────────────────────────

    /// Fetches a ticket by system id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::TicketNotFound`] when absent.
    async fn ticket(&self, id: TicketId) -> Result<Ticket, ServerError>;

    /// Lists tickets held by a user.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn tickets_for_user(&self, user_id: ProfileId) -> Result<Vec<Ticket>, ServerError>;

    /// Performs the check-in compare-and-swap on the ticket carrying
    /// `token`.
    ///
    /// The `used` write happens only if the row is still `active` at write
    /// time; all other outcomes are reads.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure. State
    /// outcomes (already used, cancelled, missing) are data, not errors —
    /// see [`CheckInWrite`].
    async fn check_in(
        &self,
        token: TicketToken,
        scanner: ProfileId,
        at: DateTime<Utc>,
    ) -> Result<CheckInWrite, ServerError>;

    /// Administratively cancels an active ticket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::TicketNotFound`] when absent, or
    /// [`ServerError::StateConflict`] when the ticket is not `active`
    /// (a used ticket cannot be un-scanned or voided).
    async fn cancel_ticket(&self, id: TicketId) -> Result<Ticket, ServerError>;

    /// Aggregates ticket counts for an event.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    async fn attendance(&self, event_id: EventId) -> Result<AttendanceSummary, ServerError>;
}
