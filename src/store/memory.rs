//! In-memory store for the fixture configuration and unit tests.
//!
//! All tables live behind one [`tokio::sync::RwLock`], so the issuance
//! unit of work and the check-in compare-and-swap are trivially atomic:
//! both run entirely under the write lock. This trades per-entity
//! concurrency for correctness, which is the right trade for a demo/test
//! backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AttendanceSummary, CheckInWrite, DataStore};
use crate::domain::{
    Event, EventId, EventStatus, NewEvent, Organizer, OrganizerId, PassType, PassTypeId, Profile,
    ProfileId, Registration, RegistrationId, RegistrationStatus, Role, Ticket, TicketId,
    TicketStatus, TicketToken, VerificationStatus,
};
use crate::error::ServerError;

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<ProfileId, Profile>,
    organizers: HashMap<OrganizerId, Organizer>,
    events: HashMap<EventId, Event>,
    pass_types: HashMap<PassTypeId, PassType>,
    registrations: HashMap<RegistrationId, Registration>,
    tickets: HashMap<TicketId, Ticket>,
    token_index: HashMap<TicketToken, TicketId>,
}

/// In-process [`DataStore`] implementation.
#[derive(Debug, Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with demo data: one profile per role, an
    /// approved organizer, and a published event with a free and a paid
    /// pass.
    ///
    /// Login emails are `admin@tessera.dev`, `organizer@tessera.dev`,
    /// `volunteer@tessera.dev`, and `student@tessera.dev`.
    #[must_use]
    pub fn with_fixture() -> Self {
        let mut tables = Tables::default();

        let admin = Profile::new("Fixture Admin", "admin@tessera.dev", Role::Admin);
        let organizer_profile =
            Profile::new("Fixture Organizer", "organizer@tessera.dev", Role::Organizer);
        let volunteer = Profile::new("Fixture Volunteer", "volunteer@tessera.dev", Role::Volunteer);
        let student = Profile::new("Fixture Student", "student@tessera.dev", Role::Student);

        let mut organizer = Organizer::apply(
            organizer_profile.id,
            "Fixture Collective",
            "organizer@tessera.dev",
        );
        organizer.status = VerificationStatus::Approved;

        let mut event: Event = NewEvent {
            organizer_id: organizer.id,
            title: "Tessera Launch Night".to_string(),
            description: Some("Demo event seeded by the fixture store".to_string()),
            venue: "Innovation Hall".to_string(),
            starts_at: Utc::now() + chrono::Duration::days(7),
            ends_at: None,
            max_participants: Some(200),
            is_team_event: false,
            max_team_size: 1,
        }
        .into();
        event.status = EventStatus::Published;

        let free_pass = PassType::new(event.id, "Community", 0);
        let mut paid_pass = PassType::new(event.id, "Premium", 25_000);
        paid_pass.quantity = Some(50);

        tracing::info!(
            event = %event.id,
            passes = 2,
            "seeded fixture data"
        );

        for profile in [admin, organizer_profile, volunteer, student] {
            tables.profiles.insert(profile.id, profile);
        }
        tables.organizers.insert(organizer.id, organizer);
        tables.events.insert(event.id, event);
        for pass in [free_pass, paid_pass] {
            tables.pass_types.insert(pass.id, pass);
        }

        Self {
            tables: RwLock::new(tables),
        }
    }
}

#[async_trait]
impl DataStore for MemStore {
    async fn insert_profile(&self, profile: Profile) -> Result<(), ServerError> {
        let mut tables = self.tables.write().await;
        if tables.profiles.values().any(|p| p.email == profile.email) {
            return Err(ServerError::StateConflict(format!(
                "email {} is already registered",
                profile.email
            )));
        }
        tables.profiles.insert(profile.id, profile);
        Ok(())
    }

    async fn profile(&self, id: ProfileId) -> Result<Profile, ServerError> {
        let tables = self.tables.read().await;
        tables
            .profiles
            .get(&id)
            .cloned()
            .ok_or(ServerError::ProfileNotFound(id))
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, ServerError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.values().find(|p| p.email == email).cloned())
    }

    async fn insert_organizer(&self, organizer: Organizer) -> Result<(), ServerError> {
        let mut tables = self.tables.write().await;
        tables.organizers.insert(organizer.id, organizer);
        Ok(())
    }

    async fn organizer(&self, id: OrganizerId) -> Result<Organizer, ServerError> {
        let tables = self.tables.read().await;
        tables
            .organizers
            .get(&id)
            .cloned()
            .ok_or(ServerError::OrganizerNotFound(id))
    }

    async fn organizer_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Organizer>, ServerError> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizers
            .values()
            .find(|o| o.profile_id == profile_id)
            .cloned())
    }

    async fn pending_organizers(&self) -> Result<Vec<Organizer>, ServerError> {
        let tables = self.tables.read().await;
        let mut pending: Vec<Organizer> = tables
            .organizers
            .values()
            .filter(|o| o.status == VerificationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|o| o.created_at);
        Ok(pending)
    }

    async fn set_organizer_verification(
        &self,
        id: OrganizerId,
        status: VerificationStatus,
        rejection_reason: Option<String>,
    ) -> Result<Organizer, ServerError> {
        let mut tables = self.tables.write().await;
        let organizer = tables
            .organizers
            .get_mut(&id)
            .ok_or(ServerError::OrganizerNotFound(id))?;
        match status {
            VerificationStatus::Approved => organizer.approve()?,
            VerificationStatus::Rejected => {
                organizer.reject(rejection_reason.unwrap_or_default())?;
            }
            VerificationStatus::Pending => {
                return Err(ServerError::InvalidRequest(
                    "cannot reset an organizer to pending".to_string(),
                ));
            }
        }
        Ok(organizer.clone())
    }

    async fn insert_event(&self, event: Event) -> Result<(), ServerError> {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id, event);
        Ok(())
    }

    async fn event(&self, id: EventId) -> Result<Event, ServerError> {
        let tables = self.tables.read().await;
        tables
            .events
            .get(&id)
            .cloned()
            .ok_or(ServerError::EventNotFound(id))
    }

    async fn events_by_status(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, ServerError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn events_by_organizer(&self, id: OrganizerId) -> Result<Vec<Event>, ServerError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.organizer_id == id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn set_event_status(
        &self,
        id: EventId,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<Event, ServerError> {
        let mut tables = self.tables.write().await;
        let event = tables
            .events
            .get_mut(&id)
            .ok_or(ServerError::EventNotFound(id))?;
        if event.status != from {
            return Err(ServerError::StateConflict(format!(
                "event is {} (expected {from})",
                event.status
            )));
        }
        event.status = to;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn insert_pass_type(&self, pass: PassType) -> Result<(), ServerError> {
        let mut tables = self.tables.write().await;
        tables.pass_types.insert(pass.id, pass);
        Ok(())
    }

    async fn pass_type(&self, id: PassTypeId) -> Result<PassType, ServerError> {
        let tables = self.tables.read().await;
        tables
            .pass_types
            .get(&id)
            .cloned()
            .ok_or(ServerError::PassTypeNotFound(id))
    }

    async fn pass_types_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<PassType>, ServerError> {
        let tables = self.tables.read().await;
        let mut passes: Vec<PassType> = tables
            .pass_types
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        passes.sort_by_key(|p| p.created_at);
        Ok(passes)
    }

    async fn insert_registration(&self, registration: Registration) -> Result<(), ServerError> {
        let mut tables = self.tables.write().await;
        tables.registrations.insert(registration.id, registration);
        Ok(())
    }

    async fn registration(&self, id: RegistrationId) -> Result<Registration, ServerError> {
        let tables = self.tables.read().await;
        tables
            .registrations
            .get(&id)
            .cloned()
            .ok_or(ServerError::RegistrationNotFound(id))
    }

    async fn set_registration_order(
        &self,
        id: RegistrationId,
        order_id: &str,
    ) -> Result<Registration, ServerError> {
        let mut tables = self.tables.write().await;
        let registration = tables
            .registrations
            .get_mut(&id)
            .ok_or(ServerError::RegistrationNotFound(id))?;
        if registration.status != RegistrationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "registration is {}",
                registration.status
            )));
        }
        registration.payment_order_id = Some(order_id.to_string());
        registration.updated_at = Utc::now();
        Ok(registration.clone())
    }

    async fn cancel_registration(&self, id: RegistrationId) -> Result<Registration, ServerError> {
        let mut tables = self.tables.write().await;
        let registration = tables
            .registrations
            .get_mut(&id)
            .ok_or(ServerError::RegistrationNotFound(id))?;
        if registration.status != RegistrationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "registration is {}",
                registration.status
            )));
        }
        registration.status = RegistrationStatus::Cancelled;
        registration.updated_at = Utc::now();
        Ok(registration.clone())
    }

    async fn confirm_and_issue(
        &self,
        registration_id: RegistrationId,
        payment_reference: Option<String>,
        ticket: Ticket,
    ) -> Result<Ticket, ServerError> {
        let mut tables = self.tables.write().await;

        let registration = tables
            .registrations
            .get(&registration_id)
            .ok_or(ServerError::RegistrationNotFound(registration_id))?;
        if registration.status != RegistrationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "registration is {}",
                registration.status
            )));
        }
        let pass_type_id = registration.pass_type_id;
        let event_id = registration.event_id;

        if tables
            .tickets
            .values()
            .any(|t| t.registration_id == registration_id && t.pass_type_id == pass_type_id)
        {
            return Err(ServerError::StateConflict(
                "a ticket already exists for this registration".to_string(),
            ));
        }

        // Capacity guards re-checked at write time, under the same lock
        // that applies the counter bumps.
        let pass = tables
            .pass_types
            .get(&pass_type_id)
            .ok_or(ServerError::PassTypeNotFound(pass_type_id))?;
        if pass.is_sold_out() {
            return Err(ServerError::SoldOut);
        }
        let event = tables
            .events
            .get(&event_id)
            .ok_or(ServerError::EventNotFound(event_id))?;
        if event.is_full() {
            return Err(ServerError::EventFull);
        }

        let now = Utc::now();
        if let Some(pass) = tables.pass_types.get_mut(&pass_type_id) {
            pass.sold += 1;
        }
        if let Some(event) = tables.events.get_mut(&event_id) {
            event.current_participants += 1;
            event.updated_at = now;
        }
        if let Some(registration) = tables.registrations.get_mut(&registration_id) {
            registration.status = RegistrationStatus::Confirmed;
            registration.payment_reference = payment_reference;
            registration.updated_at = now;
        }
        tables.token_index.insert(ticket.ticket_token, ticket.id);
        tables.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn ticket(&self, id: TicketId) -> Result<Ticket, ServerError> {
        let tables = self.tables.read().await;
        tables
            .tickets
            .get(&id)
            .cloned()
            .ok_or(ServerError::TicketNotFound(id))
    }

    async fn tickets_for_user(&self, user_id: ProfileId) -> Result<Vec<Ticket>, ServerError> {
        let tables = self.tables.read().await;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        Ok(tickets)
    }

    async fn check_in(
        &self,
        token: TicketToken,
        scanner: ProfileId,
        at: DateTime<Utc>,
    ) -> Result<CheckInWrite, ServerError> {
        let mut tables = self.tables.write().await;
        let Some(&ticket_id) = tables.token_index.get(&token) else {
            return Ok(CheckInWrite::NotFound);
        };
        let Some(ticket) = tables.tickets.get_mut(&ticket_id) else {
            return Ok(CheckInWrite::NotFound);
        };
        match ticket.status {
            TicketStatus::Active => {
                ticket.mark_used(scanner, at);
                Ok(CheckInWrite::CheckedIn(ticket.clone()))
            }
            TicketStatus::Used => Ok(CheckInWrite::AlreadyUsed(ticket.clone())),
            TicketStatus::Cancelled => Ok(CheckInWrite::NotScannable(ticket.clone())),
        }
    }

    async fn cancel_ticket(&self, id: TicketId) -> Result<Ticket, ServerError> {
        let mut tables = self.tables.write().await;
        let ticket = tables
            .tickets
            .get_mut(&id)
            .ok_or(ServerError::TicketNotFound(id))?;
        if ticket.status != TicketStatus::Active {
            return Err(ServerError::StateConflict(format!(
                "ticket is {}",
                ticket.status
            )));
        }
        ticket.status = TicketStatus::Cancelled;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn attendance(&self, event_id: EventId) -> Result<AttendanceSummary, ServerError> {
        let tables = self.tables.read().await;
        let mut summary = AttendanceSummary::default();
        for ticket in tables.tickets.values().filter(|t| t.event_id == event_id) {
            summary.issued += 1;
            match ticket.status {
                TicketStatus::Used => summary.checked_in += 1,
                TicketStatus::Cancelled => summary.cancelled += 1,
                TicketStatus::Active => {}
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn seed_confirmable(
        store: &MemStore,
        quantity: Option<u32>,
        max_participants: Option<u32>,
    ) -> Registration {
        let mut event: Event = NewEvent {
            organizer_id: OrganizerId::new(),
            title: "Store Test".to_string(),
            description: None,
            venue: "Room 1".to_string(),
            starts_at: Utc::now(),
            ends_at: None,
            max_participants,
            is_team_event: false,
            max_team_size: 1,
        }
        .into();
        event.status = EventStatus::Published;

        let mut pass = PassType::new(event.id, "General", 0);
        pass.quantity = quantity;

        let registration =
            Registration::create(&event, pass.id, ProfileId::new(), None, vec![])
                .ok()
                .unwrap_or_else(|| panic!("registration must validate"));

        let _ = store.insert_event(event).await;
        let _ = store.insert_pass_type(pass).await;
        let _ = store.insert_registration(registration.clone()).await;
        registration
    }

    #[tokio::test]
    async fn confirm_and_issue_bumps_counters() {
        let store = MemStore::new();
        let registration = seed_confirmable(&store, Some(10), Some(10)).await;
        let ticket = Ticket::issue(&registration);

        let issued = store
            .confirm_and_issue(registration.id, None, ticket)
            .await;
        assert!(issued.is_ok());

        let pass = store.pass_type(registration.pass_type_id).await;
        let Ok(pass) = pass else {
            panic!("pass must exist");
        };
        assert_eq!(pass.sold, 1);

        let event = store.event(registration.event_id).await;
        let Ok(event) = event else {
            panic!("event must exist");
        };
        assert_eq!(event.current_participants, 1);

        let reg = store.registration(registration.id).await;
        let Ok(reg) = reg else {
            panic!("registration must exist");
        };
        assert_eq!(reg.status, RegistrationStatus::Confirmed);
    }

    #[tokio::test]
    async fn sold_out_pass_rejects_issuance_and_writes_nothing() {
        let store = MemStore::new();
        let registration = seed_confirmable(&store, Some(0), None).await;
        let ticket = Ticket::issue(&registration);

        let result = store
            .confirm_and_issue(registration.id, None, ticket)
            .await;
        assert!(matches!(result, Err(ServerError::SoldOut)));

        // No partial writes: registration still pending, no ticket rows.
        let reg = store.registration(registration.id).await;
        assert!(matches!(
            reg.map(|r| r.status),
            Ok(RegistrationStatus::Pending)
        ));
        let summary = store.attendance(registration.event_id).await;
        assert_eq!(summary.ok().map(|s| s.issued), Some(0));
    }

    #[tokio::test]
    async fn full_event_rejects_issuance() {
        let store = MemStore::new();
        let registration = seed_confirmable(&store, None, Some(0)).await;
        let ticket = Ticket::issue(&registration);
        let result = store
            .confirm_and_issue(registration.id, None, ticket)
            .await;
        assert!(matches!(result, Err(ServerError::EventFull)));
    }

    #[tokio::test]
    async fn second_ticket_for_same_registration_conflicts() {
        let store = MemStore::new();
        let registration = seed_confirmable(&store, None, None).await;

        let first = store
            .confirm_and_issue(registration.id, None, Ticket::issue(&registration))
            .await;
        assert!(first.is_ok());

        // Even if the registration were somehow pending again, the pair
        // uniqueness guard holds.
        let second = store
            .confirm_and_issue(registration.id, None, Ticket::issue(&registration))
            .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn check_in_cas_first_write_wins() {
        let store = Arc::new(MemStore::new());
        let registration = seed_confirmable(&store, None, None).await;
        let ticket = store
            .confirm_and_issue(registration.id, None, Ticket::issue(&registration))
            .await
            .ok()
            .unwrap_or_else(|| panic!("issuance must succeed"));

        let token = ticket.ticket_token;
        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store.check_in(token, ProfileId::new(), Utc::now()).await
            })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store.check_in(token, ProfileId::new(), Utc::now()).await
            })
        };

        let results = [a.await, b.await];
        let mut wins = 0;
        let mut duplicates = 0;
        for joined in results {
            let Ok(Ok(outcome)) = joined else {
                panic!("check_in task failed");
            };
            match outcome {
                CheckInWrite::CheckedIn(_) => wins += 1,
                CheckInWrite::AlreadyUsed(_) => duplicates += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(duplicates, 1);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let store = MemStore::new();
        let outcome = store
            .check_in(TicketToken::new(), ProfileId::new(), Utc::now())
            .await;
        assert!(matches!(outcome, Ok(CheckInWrite::NotFound)));
    }

    #[tokio::test]
    async fn cancelled_ticket_is_not_scannable() {
        let store = MemStore::new();
        let registration = seed_confirmable(&store, None, None).await;
        let ticket = store
            .confirm_and_issue(registration.id, None, Ticket::issue(&registration))
            .await
            .ok()
            .unwrap_or_else(|| panic!("issuance must succeed"));

        let cancelled = store.cancel_ticket(ticket.id).await;
        assert!(cancelled.is_ok());

        let outcome = store
            .check_in(ticket.ticket_token, ProfileId::new(), Utc::now())
            .await;
        assert!(matches!(outcome, Ok(CheckInWrite::NotScannable(_))));
    }

    #[tokio::test]
    async fn used_ticket_cannot_be_cancelled() {
        let store = MemStore::new();
        let registration = seed_confirmable(&store, None, None).await;
        let ticket = store
            .confirm_and_issue(registration.id, None, Ticket::issue(&registration))
            .await
            .ok()
            .unwrap_or_else(|| panic!("issuance must succeed"));

        let _ = store
            .check_in(ticket.ticket_token, ProfileId::new(), Utc::now())
            .await;
        assert!(store.cancel_ticket(ticket.id).await.is_err());
    }

    #[tokio::test]
    async fn fixture_store_has_published_catalog() {
        let store = MemStore::with_fixture();
        let events = store.events_by_status(Some(EventStatus::Published)).await;
        let Ok(events) = events else {
            panic!("listing must succeed");
        };
        assert_eq!(events.len(), 1);

        let Some(event) = events.first() else {
            panic!("fixture event missing");
        };
        let passes = store.pass_types_for_event(event.id).await;
        assert_eq!(passes.ok().map(|p| p.len()), Some(2));

        let admin = store.profile_by_email("admin@tessera.dev").await;
        assert!(matches!(admin, Ok(Some(_))));
    }
}
