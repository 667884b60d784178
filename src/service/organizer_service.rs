//! Organizer verification workflow.

use std::sync::Arc;

use chrono::Utc;

use super::Actor;
use crate::domain::{
    EventBus, Organizer, OrganizerId, TicketEvent, VerificationStatus,
};
use crate::error::ServerError;
use crate::store::DataStore;

/// Orchestrates organizer applications and admin verification decisions.
#[derive(Debug, Clone)]
pub struct OrganizerService {
    store: Arc<dyn DataStore>,
    event_bus: EventBus,
}

impl OrganizerService {
    /// Creates a new `OrganizerService`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Submits an organizer application for the acting profile.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::StateConflict`] when the profile already has
    /// an organizer record, or [`ServerError::InvalidRequest`] on blank
    /// fields.
    pub async fn apply(
        &self,
        actor: Actor,
        name: &str,
        contact_email: &str,
    ) -> Result<Organizer, ServerError> {
        if name.trim().is_empty() || contact_email.trim().is_empty() {
            return Err(ServerError::InvalidRequest(
                "organizer name and contact email are required".to_string(),
            ));
        }
        if let Some(existing) = self.store.organizer_by_profile(actor.profile_id).await? {
            return Err(ServerError::StateConflict(format!(
                "profile already has an organizer record ({})",
                existing.status
            )));
        }
        let organizer = Organizer::apply(actor.profile_id, name, contact_email);
        self.store.insert_organizer(organizer.clone()).await?;
        tracing::info!(organizer = %organizer.id, "organizer application submitted");
        Ok(organizer)
    }

    /// Lists organizers awaiting verification. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-admins.
    pub async fn pending(&self, actor: Actor) -> Result<Vec<Organizer>, ServerError> {
        if !actor.is_admin() {
            return Err(ServerError::Forbidden("requires admin role".to_string()));
        }
        self.store.pending_organizers().await
    }

    /// Approves a pending organizer. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-admins,
    /// [`ServerError::OrganizerNotFound`] when absent, or
    /// [`ServerError::StateConflict`] when already decided.
    pub async fn approve(&self, actor: Actor, id: OrganizerId) -> Result<Organizer, ServerError> {
        if !actor.is_admin() {
            return Err(ServerError::Forbidden("requires admin role".to_string()));
        }
        let organizer = self
            .store
            .set_organizer_verification(id, VerificationStatus::Approved, None)
            .await?;
        let _ = self.event_bus.publish(TicketEvent::OrganizerApproved {
            organizer_id: id,
            timestamp: Utc::now(),
        });
        tracing::info!(organizer = %id, "organizer approved");
        Ok(organizer)
    }

    /// Rejects a pending organizer with a reason. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-admins,
    /// [`ServerError::InvalidRequest`] on a blank reason,
    /// [`ServerError::OrganizerNotFound`] when absent, or
    /// [`ServerError::StateConflict`] when already decided.
    pub async fn reject(
        &self,
        actor: Actor,
        id: OrganizerId,
        reason: &str,
    ) -> Result<Organizer, ServerError> {
        if !actor.is_admin() {
            return Err(ServerError::Forbidden("requires admin role".to_string()));
        }
        if reason.trim().is_empty() {
            return Err(ServerError::InvalidRequest(
                "a rejection reason is required".to_string(),
            ));
        }
        let organizer = self
            .store
            .set_organizer_verification(
                id,
                VerificationStatus::Rejected,
                Some(reason.to_string()),
            )
            .await?;
        let _ = self.event_bus.publish(TicketEvent::OrganizerRejected {
            organizer_id: id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        tracing::info!(organizer = %id, "organizer rejected");
        Ok(organizer)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::store::memory::MemStore;

    fn make_service() -> OrganizerService {
        OrganizerService::new(Arc::new(MemStore::new()), EventBus::new(100))
    }

    fn admin() -> Actor {
        Actor {
            profile_id: crate::domain::ProfileId::new(),
            role: Role::Admin,
        }
    }

    fn student() -> Actor {
        Actor {
            profile_id: crate::domain::ProfileId::new(),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn apply_then_approve() {
        let service = make_service();
        let applicant = student();
        let organizer = service
            .apply(applicant, "Chess Society", "chess@campus.edu")
            .await;
        let Ok(organizer) = organizer else {
            panic!("application must succeed");
        };

        let approved = service.approve(admin(), organizer.id).await;
        assert!(matches!(
            approved.map(|o| o.status),
            Ok(VerificationStatus::Approved)
        ));
    }

    #[tokio::test]
    async fn duplicate_application_conflicts() {
        let service = make_service();
        let applicant = student();
        let _ = service
            .apply(applicant, "Chess Society", "chess@campus.edu")
            .await;
        let second = service
            .apply(applicant, "Chess Society Again", "chess@campus.edu")
            .await;
        assert!(matches!(second, Err(ServerError::StateConflict(_))));
    }

    #[tokio::test]
    async fn non_admin_cannot_decide() {
        let service = make_service();
        let organizer = service
            .apply(student(), "Chess Society", "chess@campus.edu")
            .await
            .ok()
            .unwrap_or_else(|| panic!("application must succeed"));

        assert!(matches!(
            service.approve(student(), organizer.id).await,
            Err(ServerError::Forbidden(_))
        ));
        assert!(matches!(
            service.reject(student(), organizer.id, "nope").await,
            Err(ServerError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn rejection_requires_reason_and_is_terminal() {
        let service = make_service();
        let organizer = service
            .apply(student(), "Chess Society", "chess@campus.edu")
            .await
            .ok()
            .unwrap_or_else(|| panic!("application must succeed"));

        assert!(matches!(
            service.reject(admin(), organizer.id, "   ").await,
            Err(ServerError::InvalidRequest(_))
        ));

        let rejected = service
            .reject(admin(), organizer.id, "missing club charter")
            .await;
        assert!(rejected.is_ok());

        // Terminal: cannot approve afterwards.
        assert!(matches!(
            service.approve(admin(), organizer.id).await,
            Err(ServerError::StateConflict(_))
        ));
    }

    #[tokio::test]
    async fn approval_emits_bus_event() {
        let service = make_service();
        let mut rx = service.event_bus.subscribe();
        let organizer = service
            .apply(student(), "Chess Society", "chess@campus.edu")
            .await
            .ok()
            .unwrap_or_else(|| panic!("application must succeed"));
        let _ = service.approve(admin(), organizer.id).await;

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected event");
        };
        assert_eq!(event.event_type_str(), "organizer_approved");
    }
}
