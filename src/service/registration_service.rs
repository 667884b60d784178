//! Registration intake, payment confirmation, and ticket issuance.
//!
//! The issuance contract: a confirmed registration yields exactly one
//! ticket, with the pass `sold` counter and the event participant counter
//! bumped in the same store unit of work. Free passes confirm immediately;
//! paid passes go through open-order → external payment → signed
//! confirmation callback.

use std::sync::Arc;

use chrono::Utc;

use super::Actor;
use crate::domain::{
    EventBus, Registration, RegistrationId, RegistrationStatus, TeamMember, Ticket, TicketEvent,
};
use crate::error::ServerError;
use crate::payment::{PaymentOrder, PaymentVerifier};
use crate::store::DataStore;

/// Input for a new registration.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    /// Target event.
    pub event_id: crate::domain::EventId,
    /// Pass to purchase.
    pub pass_type_id: crate::domain::PassTypeId,
    /// Team name for team events.
    pub team_name: Option<String>,
    /// Team roster for team events.
    pub team_members: Vec<TeamMember>,
}

/// What the caller gets back from [`RegistrationService::register`].
///
/// `ticket` is present when the pass was free and issuance happened
/// inline; paid passes return `None` until the payment is confirmed.
#[derive(Debug, Clone)]
pub struct RegistrationReceipt {
    /// The stored registration.
    pub registration: Registration,
    /// The issued ticket, for free passes.
    pub ticket: Option<Ticket>,
}

/// Orchestrates the registration → payment → ticket pipeline.
#[derive(Debug, Clone)]
pub struct RegistrationService {
    store: Arc<dyn DataStore>,
    event_bus: EventBus,
    payments: PaymentVerifier,
}

impl RegistrationService {
    /// Creates a new `RegistrationService`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, event_bus: EventBus, payments: PaymentVerifier) -> Self {
        Self {
            store,
            event_bus,
            payments,
        }
    }

    /// Registers the actor for an event.
    ///
    /// Validation happens before any write: the event must be published
    /// and not full, the pass must belong to the event and be purchasable
    /// right now, and team fields must satisfy the event's team rules.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidRequest`] on team or sale-window
    ///   violations, or a pass/event mismatch.
    /// - [`ServerError::SoldOut`] / [`ServerError::EventFull`] on
    ///   capacity.
    /// - [`ServerError::StateConflict`] when the event is not accepting
    ///   registrations.
    pub async fn register(
        &self,
        actor: Actor,
        new: NewRegistration,
    ) -> Result<RegistrationReceipt, ServerError> {
        let event = self.store.event(new.event_id).await?;
        if event.status != crate::domain::EventStatus::Published {
            return Err(ServerError::StateConflict(format!(
                "event is {} and not accepting registrations",
                event.status
            )));
        }
        if event.is_full() {
            return Err(ServerError::EventFull);
        }

        let pass = self.store.pass_type(new.pass_type_id).await?;
        if pass.event_id != event.id {
            return Err(ServerError::InvalidRequest(
                "pass does not belong to this event".to_string(),
            ));
        }
        pass.check_purchasable(Utc::now())?;

        let registration = Registration::create(
            &event,
            pass.id,
            actor.profile_id,
            new.team_name,
            new.team_members,
        )?;
        self.store.insert_registration(registration.clone()).await?;
        tracing::info!(
            registration = %registration.id,
            event = %event.id,
            pass = %pass.id,
            "registration created"
        );

        if pass.is_free() {
            let ticket = self.issue(&registration, None).await?;
            let registration = self.store.registration(registration.id).await?;
            return Ok(RegistrationReceipt {
                registration,
                ticket: Some(ticket),
            });
        }
        Ok(RegistrationReceipt {
            registration,
            ticket: None,
        })
    }

    /// Opens a payment order for a pending paid registration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-owners,
    /// [`ServerError::StateConflict`] when not pending, or
    /// [`ServerError::InvalidRequest`] for free passes.
    pub async fn open_order(
        &self,
        actor: Actor,
        id: RegistrationId,
    ) -> Result<PaymentOrder, ServerError> {
        let registration = self.store.registration(id).await?;
        self.require_registrant(&registration, actor)?;
        if registration.status != RegistrationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "registration is {}",
                registration.status
            )));
        }
        let pass = self.store.pass_type(registration.pass_type_id).await?;
        if pass.is_free() {
            return Err(ServerError::InvalidRequest(
                "free passes do not need a payment order".to_string(),
            ));
        }
        let order = self.payments.open_order(id, pass.price);
        self.store.set_registration_order(id, &order.order_id).await?;
        tracing::info!(registration = %id, order = %order.order_id, "payment order opened");
        Ok(order)
    }

    /// Confirms a payment callback and issues the ticket.
    ///
    /// The signature must be a valid HMAC over `order_id|payment_id`
    /// under the shared secret; a mismatch is a hard rejection and
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// - [`ServerError::SignatureMismatch`] on a bad signature.
    /// - [`ServerError::InvalidRequest`] when the order id does not match
    ///   the one opened for this registration.
    /// - [`ServerError::StateConflict`] when the registration is not
    ///   pending.
    /// - Capacity errors from the issuance unit of work.
    pub async fn confirm_payment(
        &self,
        actor: Actor,
        id: RegistrationId,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<RegistrationReceipt, ServerError> {
        let registration = self.store.registration(id).await?;
        self.require_registrant(&registration, actor)?;
        if registration.status != RegistrationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "registration is {}",
                registration.status
            )));
        }
        if registration.payment_order_id.as_deref() != Some(order_id) {
            return Err(ServerError::InvalidRequest(
                "order does not match this registration".to_string(),
            ));
        }
        self.payments.verify(order_id, payment_id, signature)?;

        let ticket = self
            .issue(&registration, Some(payment_id.to_string()))
            .await?;
        let registration = self.store.registration(id).await?;
        Ok(RegistrationReceipt {
            registration,
            ticket: Some(ticket),
        })
    }

    /// Cancels a pending registration (registrant or admin).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-owners or
    /// [`ServerError::StateConflict`] when not pending.
    pub async fn cancel(
        &self,
        actor: Actor,
        id: RegistrationId,
    ) -> Result<Registration, ServerError> {
        let registration = self.store.registration(id).await?;
        self.require_registrant(&registration, actor)?;
        self.store.cancel_registration(id).await
    }

    /// Fetches a registration (registrant or admin).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-owners.
    pub async fn registration(
        &self,
        actor: Actor,
        id: RegistrationId,
    ) -> Result<Registration, ServerError> {
        let registration = self.store.registration(id).await?;
        self.require_registrant(&registration, actor)?;
        Ok(registration)
    }

    /// Runs the issuance unit of work and emits the follow-up events.
    async fn issue(
        &self,
        registration: &Registration,
        payment_reference: Option<String>,
    ) -> Result<Ticket, ServerError> {
        let ticket = Ticket::issue(registration);
        let ticket = self
            .store
            .confirm_and_issue(registration.id, payment_reference, ticket)
            .await?;

        let now = Utc::now();
        let _ = self.event_bus.publish(TicketEvent::RegistrationConfirmed {
            registration_id: registration.id,
            event_id: registration.event_id,
            user_id: registration.user_id,
            timestamp: now,
        });
        let _ = self.event_bus.publish(TicketEvent::TicketIssued {
            ticket_id: ticket.id,
            event_id: ticket.event_id,
            user_id: ticket.user_id,
            timestamp: now,
        });
        tracing::info!(
            registration = %registration.id,
            ticket = %ticket.id,
            "registration confirmed, ticket issued"
        );
        Ok(ticket)
    }

    fn require_registrant(
        &self,
        registration: &Registration,
        actor: Actor,
    ) -> Result<(), ServerError> {
        if actor.is_admin() || registration.user_id == actor.profile_id {
            Ok(())
        } else {
            Err(ServerError::Forbidden(
                "not your registration".to_string(),
            ))
        }
    }
}
