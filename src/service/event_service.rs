//! Event catalog lifecycle and pass management.

use std::sync::Arc;

use chrono::Utc;

use super::Actor;
use crate::domain::{
    Event, EventBus, EventId, EventStatus, NewEvent, Organizer, PassType, TicketEvent,
};
use crate::error::ServerError;
use crate::store::{AttendanceSummary, DataStore};

/// Input for creating a pass type under an event.
#[derive(Debug, Clone)]
pub struct NewPass {
    /// Display name.
    pub name: String,
    /// Price in minor units; `0` = free.
    pub price: u32,
    /// Sellable quantity; `None` = unlimited.
    pub quantity: Option<u32>,
    /// Optional sale-window start.
    pub sale_start: Option<chrono::DateTime<Utc>>,
    /// Optional sale-window end.
    pub sale_end: Option<chrono::DateTime<Utc>>,
}

/// Orchestrates the event catalog: creation, lifecycle transitions, pass
/// definitions, and attendance aggregation.
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<dyn DataStore>,
    event_bus: EventBus,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Creates a draft event owned by the actor's organizer record.
    ///
    /// Any organizer may draft events; verification only gates the final
    /// publish step.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] when the actor has no organizer
    /// record, or [`ServerError::InvalidRequest`] on bad fields.
    pub async fn create_event(&self, actor: Actor, new: NewEvent) -> Result<Event, ServerError> {
        let organizer = self
            .store
            .organizer_by_profile(actor.profile_id)
            .await?
            .ok_or_else(|| {
                ServerError::Forbidden("no organizer record for this profile".to_string())
            })?;

        if new.title.trim().is_empty() {
            return Err(ServerError::InvalidRequest(
                "event title is required".to_string(),
            ));
        }
        if new.is_team_event && new.max_team_size < 1 {
            return Err(ServerError::InvalidRequest(
                "team events need max_team_size of at least 1".to_string(),
            ));
        }
        if let Some(ends) = new.ends_at
            && ends <= new.starts_at
        {
            return Err(ServerError::InvalidRequest(
                "event must end after it starts".to_string(),
            ));
        }

        let event: Event = NewEvent {
            organizer_id: organizer.id,
            ..new
        }
        .into();
        self.store.insert_event(event.clone()).await?;
        tracing::info!(event = %event.id, organizer = %organizer.id, "event drafted");
        Ok(event)
    }

    /// Submits a draft event for admin review.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] unless the actor owns the event
    /// (or is an admin), or [`ServerError::StateConflict`] off the
    /// lifecycle graph.
    pub async fn submit_event(&self, actor: Actor, id: EventId) -> Result<Event, ServerError> {
        let event = self.store.event(id).await?;
        self.require_owner(&event, actor).await?;
        event.check_transition(EventStatus::Pending)?;
        self.store
            .set_event_status(id, EventStatus::Draft, EventStatus::Pending)
            .await
    }

    /// Admin approval of a submitted event.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-admins or
    /// [`ServerError::StateConflict`] off the lifecycle graph.
    pub async fn approve_event(&self, actor: Actor, id: EventId) -> Result<Event, ServerError> {
        if !actor.is_admin() {
            return Err(ServerError::Forbidden("requires admin role".to_string()));
        }
        let event = self.store.event(id).await?;
        event.check_transition(EventStatus::Approved)?;
        self.store
            .set_event_status(id, EventStatus::Pending, EventStatus::Approved)
            .await
    }

    /// Publishes an approved event to the public catalog.
    ///
    /// This is the organizer-verification gate: an event can only reach
    /// `published` while its owning organizer is `approved`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::OrganizerNotVerified`] when the gate fails,
    /// [`ServerError::Forbidden`] for non-owners, or
    /// [`ServerError::StateConflict`] off the lifecycle graph.
    pub async fn publish_event(&self, actor: Actor, id: EventId) -> Result<Event, ServerError> {
        let event = self.store.event(id).await?;
        let organizer = self.require_owner(&event, actor).await?;
        event.check_transition(EventStatus::Published)?;
        if !organizer.is_verified() {
            return Err(ServerError::OrganizerNotVerified(
                organizer.status.to_string(),
            ));
        }
        let published = self
            .store
            .set_event_status(id, EventStatus::Approved, EventStatus::Published)
            .await?;
        let _ = self.event_bus.publish(TicketEvent::EventPublished {
            event_id: id,
            timestamp: Utc::now(),
        });
        tracing::info!(event = %id, "event published");
        Ok(published)
    }

    /// Cancels an event from any non-terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-owners, or
    /// [`ServerError::StateConflict`] when already terminal.
    pub async fn cancel_event(&self, actor: Actor, id: EventId) -> Result<Event, ServerError> {
        let event = self.store.event(id).await?;
        self.require_owner(&event, actor).await?;
        event.check_transition(EventStatus::Cancelled)?;
        let cancelled = self
            .store
            .set_event_status(id, event.status, EventStatus::Cancelled)
            .await?;
        let _ = self.event_bus.publish(TicketEvent::EventCancelled {
            event_id: id,
            timestamp: Utc::now(),
        });
        tracing::info!(event = %id, "event cancelled");
        Ok(cancelled)
    }

    /// Lists events in the public catalog (published only).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    pub async fn list_published(&self) -> Result<Vec<Event>, ServerError> {
        self.store
            .events_by_status(Some(EventStatus::Published))
            .await
    }

    /// Lists every event owned by the actor's organizer record, any
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] when the actor has no organizer
    /// record.
    pub async fn my_events(&self, actor: Actor) -> Result<Vec<Event>, ServerError> {
        let organizer = self
            .store
            .organizer_by_profile(actor.profile_id)
            .await?
            .ok_or_else(|| {
                ServerError::Forbidden("no organizer record for this profile".to_string())
            })?;
        self.store.events_by_organizer(organizer.id).await
    }

    /// Fetches one event. Unpublished events are only visible to their
    /// owner and admins.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::EventNotFound`] when absent or hidden from
    /// the viewer.
    pub async fn event_detail(
        &self,
        viewer: Option<Actor>,
        id: EventId,
    ) -> Result<Event, ServerError> {
        let event = self.store.event(id).await?;
        if event.status == EventStatus::Published {
            return Ok(event);
        }
        // Hidden unless the viewer owns it or is an admin. Report absence,
        // not forbiddenness, to avoid leaking draft existence.
        if let Some(actor) = viewer
            && (actor.is_admin() || self.require_owner(&event, actor).await.is_ok())
        {
            return Ok(event);
        }
        Err(ServerError::EventNotFound(id))
    }

    /// Defines a new pass type for an event.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-owners,
    /// [`ServerError::StateConflict`] for cancelled events, or
    /// [`ServerError::InvalidRequest`] on bad fields.
    pub async fn create_pass(
        &self,
        actor: Actor,
        event_id: EventId,
        new: NewPass,
    ) -> Result<PassType, ServerError> {
        let event = self.store.event(event_id).await?;
        self.require_owner(&event, actor).await?;
        if event.status == EventStatus::Cancelled {
            return Err(ServerError::StateConflict(
                "cannot add passes to a cancelled event".to_string(),
            ));
        }
        if new.name.trim().is_empty() {
            return Err(ServerError::InvalidRequest(
                "pass name is required".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (new.sale_start, new.sale_end)
            && end <= start
        {
            return Err(ServerError::InvalidRequest(
                "sale window must end after it starts".to_string(),
            ));
        }

        let mut pass = PassType::new(event_id, new.name, new.price);
        pass.quantity = new.quantity;
        pass.sale_start = new.sale_start;
        pass.sale_end = new.sale_end;
        self.store.insert_pass_type(pass.clone()).await?;
        tracing::info!(event = %event_id, pass = %pass.id, "pass type created");
        Ok(pass)
    }

    /// Lists pass types for an event.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    pub async fn passes(&self, event_id: EventId) -> Result<Vec<PassType>, ServerError> {
        self.store.pass_types_for_event(event_id).await
    }

    /// Attendance dashboard numbers for an event. Owner and staff only.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for plain students.
    pub async fn attendance(
        &self,
        actor: Actor,
        event_id: EventId,
    ) -> Result<(Event, AttendanceSummary), ServerError> {
        let event = self.store.event(event_id).await?;
        if !actor.role.can_scan() {
            return Err(ServerError::Forbidden(
                "requires volunteer, organizer, or admin role".to_string(),
            ));
        }
        let summary = self.store.attendance(event_id).await?;
        Ok((event, summary))
    }

    /// Resolves the owning organizer and checks the actor controls it.
    /// Admins bypass the ownership check.
    async fn require_owner(&self, event: &Event, actor: Actor) -> Result<Organizer, ServerError> {
        let organizer = self.store.organizer(event.organizer_id).await?;
        if actor.is_admin() || organizer.profile_id == actor.profile_id {
            Ok(organizer)
        } else {
            Err(ServerError::Forbidden(
                "only the owning organizer may manage this event".to_string(),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Organizer, ProfileId, Role, VerificationStatus};
    use crate::store::memory::MemStore;

    struct Fixture {
        service: EventService,
        store: Arc<MemStore>,
        owner: Actor,
        admin: Actor,
    }

    async fn make_fixture(verified: bool) -> Fixture {
        let store = Arc::new(MemStore::new());
        let service = EventService::new(
            Arc::clone(&store) as Arc<dyn DataStore>,
            EventBus::new(100),
        );

        let owner_profile = ProfileId::new();
        let mut organizer = Organizer::apply(owner_profile, "Film Club", "film@campus.edu");
        if verified {
            organizer.status = VerificationStatus::Approved;
        }
        let _ = store.insert_organizer(organizer).await;

        Fixture {
            service,
            store,
            owner: Actor {
                profile_id: owner_profile,
                role: Role::Organizer,
            },
            admin: Actor {
                profile_id: ProfileId::new(),
                role: Role::Admin,
            },
        }
    }

    fn new_event() -> NewEvent {
        NewEvent {
            // Replaced by the actor's organizer record in create_event.
            organizer_id: crate::domain::OrganizerId::new(),
            title: "Open Mic".to_string(),
            description: None,
            venue: "Cafeteria".to_string(),
            starts_at: Utc::now() + chrono::Duration::days(3),
            ends_at: None,
            max_participants: None,
            is_team_event: false,
            max_team_size: 1,
        }
    }

    #[tokio::test]
    async fn full_lifecycle_with_verified_organizer() {
        let fx = make_fixture(true).await;
        let event = fx.service.create_event(fx.owner, new_event()).await;
        let Ok(event) = event else {
            panic!("draft must succeed");
        };
        assert_eq!(event.status, EventStatus::Draft);

        let submitted = fx.service.submit_event(fx.owner, event.id).await;
        assert!(matches!(
            submitted.map(|e| e.status),
            Ok(EventStatus::Pending)
        ));

        let approved = fx.service.approve_event(fx.admin, event.id).await;
        assert!(matches!(
            approved.map(|e| e.status),
            Ok(EventStatus::Approved)
        ));

        let published = fx.service.publish_event(fx.owner, event.id).await;
        assert!(matches!(
            published.map(|e| e.status),
            Ok(EventStatus::Published)
        ));

        let listed = fx.service.list_published().await;
        assert_eq!(listed.ok().map(|v| v.len()), Some(1));
    }

    #[tokio::test]
    async fn unverified_organizer_cannot_publish() {
        let fx = make_fixture(false).await;
        let event = fx
            .service
            .create_event(fx.owner, new_event())
            .await
            .ok()
            .unwrap_or_else(|| panic!("draft must succeed"));
        let _ = fx.service.submit_event(fx.owner, event.id).await;
        let _ = fx.service.approve_event(fx.admin, event.id).await;

        let published = fx.service.publish_event(fx.owner, event.id).await;
        assert!(matches!(
            published,
            Err(ServerError::OrganizerNotVerified(_))
        ));

        // The event stays approved, not published.
        let current = fx.store.event(event.id).await;
        assert!(matches!(
            current.map(|e| e.status),
            Ok(EventStatus::Approved)
        ));
    }

    #[tokio::test]
    async fn non_owner_cannot_manage() {
        let fx = make_fixture(true).await;
        let event = fx
            .service
            .create_event(fx.owner, new_event())
            .await
            .ok()
            .unwrap_or_else(|| panic!("draft must succeed"));

        let stranger = Actor {
            profile_id: ProfileId::new(),
            role: Role::Organizer,
        };
        assert!(matches!(
            fx.service.submit_event(stranger, event.id).await,
            Err(ServerError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn draft_is_hidden_from_public_but_visible_to_owner() {
        let fx = make_fixture(true).await;
        let event = fx
            .service
            .create_event(fx.owner, new_event())
            .await
            .ok()
            .unwrap_or_else(|| panic!("draft must succeed"));

        assert!(matches!(
            fx.service.event_detail(None, event.id).await,
            Err(ServerError::EventNotFound(_))
        ));
        assert!(fx.service.event_detail(Some(fx.owner), event.id).await.is_ok());
        assert!(fx.service.event_detail(Some(fx.admin), event.id).await.is_ok());
    }

    #[tokio::test]
    async fn pass_creation_validates_window() {
        let fx = make_fixture(true).await;
        let event = fx
            .service
            .create_event(fx.owner, new_event())
            .await
            .ok()
            .unwrap_or_else(|| panic!("draft must succeed"));

        let now = Utc::now();
        let bad = fx
            .service
            .create_pass(fx.owner, event.id, NewPass {
                name: "Backwards".to_string(),
                price: 0,
                quantity: None,
                sale_start: Some(now),
                sale_end: Some(now - chrono::Duration::hours(1)),
            })
            .await;
        assert!(matches!(bad, Err(ServerError::InvalidRequest(_))));

        let good = fx
            .service
            .create_pass(fx.owner, event.id, NewPass {
                name: "General".to_string(),
                price: 10_000,
                quantity: Some(100),
                sale_start: None,
                sale_end: None,
            })
            .await;
        assert!(good.is_ok());
        assert_eq!(fx.service.passes(event.id).await.ok().map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn attendance_requires_staff_role() {
        let fx = make_fixture(true).await;
        let event = fx
            .service
            .create_event(fx.owner, new_event())
            .await
            .ok()
            .unwrap_or_else(|| panic!("draft must succeed"));

        let student = Actor {
            profile_id: ProfileId::new(),
            role: Role::Student,
        };
        assert!(matches!(
            fx.service.attendance(student, event.id).await,
            Err(ServerError::Forbidden(_))
        ));
        assert!(fx.service.attendance(fx.admin, event.id).await.is_ok());
    }
}
