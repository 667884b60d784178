//! Check-in validation: the scan-time state machine.
//!
//! [`CheckInService::validate_and_check_in`] turns a raw scanned string
//! into exactly one of three outcomes — success, duplicate, or invalid —
//! and never lets an error escape to the scan loop. The order of checks:
//!
//! 1. decode the payload (pure, no store access);
//! 2. reject payloads bound to a different event (cross-event replay);
//! 3. compare-and-swap the ticket to `used`, conditioned on it still
//!    being `active` at write time;
//! 4. classify whatever the CAS found: winner → success, already used →
//!    duplicate with the *original* scan time, cancelled/missing →
//!    invalid.
//!
//! Two scanners racing on one ticket therefore produce exactly one
//! success; the loser observes `duplicate`, never a second success.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Actor;
use crate::domain::{
    EventBus, EventId, QrPayload, Ticket, TicketEvent, TicketId, TicketKind,
};
use crate::error::ServerError;
use crate::store::{CheckInWrite, DataStore};

/// Result of one scan, shaped for the scanning UI.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The scan recorded the authoritative check-in.
    Success {
        /// The updated ticket.
        ticket: Ticket,
        /// Attendee display name (team name for team tickets).
        attendee: String,
        /// The decoded payload, echoed for the UI.
        qr: QrPayload,
    },
    /// The ticket was already used; nothing was written.
    Duplicate {
        /// The ticket as it stands.
        ticket: Ticket,
        /// The original, authoritative scan time.
        scanned_at: DateTime<Utc>,
        /// The decoded payload, echoed for the UI.
        qr: QrPayload,
    },
    /// The payload or ticket is unusable; nothing was written.
    Invalid {
        /// Operator-facing reason.
        reason: String,
    },
}

impl ScanOutcome {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Validates scans and performs at-most-once check-in transitions.
#[derive(Debug, Clone)]
pub struct CheckInService {
    store: Arc<dyn DataStore>,
    event_bus: EventBus,
}

impl CheckInService {
    /// Creates a new `CheckInService`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Validates a scanned payload against the scanning event and, when
    /// valid, records the check-in.
    ///
    /// Infallible by contract: every failure inside the validator —
    /// malformed payload, wrong event, unknown token, non-active ticket,
    /// even a store outage — is folded into a [`ScanOutcome`] so the scan
    /// loop never halts on a single bad read. The operator retries a
    /// transient failure by simply re-scanning.
    pub async fn validate_and_check_in(
        &self,
        raw_payload: &str,
        scanning_event_id: EventId,
        scanner: Actor,
    ) -> ScanOutcome {
        let Some(qr) = QrPayload::decode(raw_payload) else {
            return ScanOutcome::invalid("malformed ticket code");
        };

        if qr.event_id != scanning_event_id {
            return ScanOutcome::invalid("ticket is not for this event");
        }

        let write = self
            .store
            .check_in(qr.ticket_token, scanner.profile_id, Utc::now())
            .await;
        let write = match write {
            Ok(write) => write,
            Err(e) => {
                tracing::error!(error = %e, "check-in store failure");
                return ScanOutcome::invalid("scan failed, please retry");
            }
        };

        match write {
            CheckInWrite::CheckedIn(ticket) => {
                let attendee = self.attendee_name(&ticket).await;
                let (Some(scanned_at), Some(scanned_by)) = (ticket.scanned_at, ticket.scanned_by)
                else {
                    // The CAS winner always carries scan fields; treat a
                    // violation as a store bug, not an operator problem.
                    tracing::error!(ticket = %ticket.id, "checked-in ticket missing scan fields");
                    return ScanOutcome::invalid("scan failed, please retry");
                };
                let _ = self.event_bus.publish(TicketEvent::TicketCheckedIn {
                    ticket_id: ticket.id,
                    event_id: ticket.event_id,
                    scanned_by,
                    scanned_at,
                });
                tracing::info!(
                    ticket = %ticket.id,
                    event = %ticket.event_id,
                    scanner = %scanner.profile_id,
                    "ticket checked in"
                );
                ScanOutcome::Success {
                    ticket,
                    attendee,
                    qr,
                }
            }
            CheckInWrite::AlreadyUsed(ticket) => {
                // Idempotent duplicate path: report the original scan
                // time, mutate nothing.
                let scanned_at = ticket.scanned_at.unwrap_or(ticket.updated_at);
                ScanOutcome::Duplicate {
                    ticket,
                    scanned_at,
                    qr,
                }
            }
            CheckInWrite::NotScannable(ticket) => {
                ScanOutcome::invalid(format!("ticket is {}", ticket.status))
            }
            CheckInWrite::NotFound => ScanOutcome::invalid("ticket not found"),
        }
    }

    /// Produces the QR wire string for a ticket, for the holder or staff.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] when the requester neither holds
    /// the ticket nor has a scanning role, or
    /// [`ServerError::StateConflict`] for non-active tickets.
    pub async fn qr_for_ticket(
        &self,
        actor: Actor,
        ticket_id: TicketId,
    ) -> Result<(QrPayload, String), ServerError> {
        let ticket = self.store.ticket(ticket_id).await?;
        if ticket.user_id != actor.profile_id && !actor.role.can_scan() {
            return Err(ServerError::Forbidden("not your ticket".to_string()));
        }
        if !ticket.is_active() {
            return Err(ServerError::StateConflict(format!(
                "ticket is {}",
                ticket.status
            )));
        }
        let registration = self.store.registration(ticket.registration_id).await?;
        let kind = if registration.is_team() {
            TicketKind::Team
        } else {
            TicketKind::Individual
        };
        let payload = QrPayload::for_ticket(&ticket, kind);
        let encoded = payload.encode();
        Ok((payload, encoded))
    }

    /// Administratively cancels an active ticket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-admins or
    /// [`ServerError::StateConflict`] for non-active tickets (a used
    /// ticket cannot be voided).
    pub async fn cancel_ticket(&self, actor: Actor, id: TicketId) -> Result<Ticket, ServerError> {
        if !actor.is_admin() {
            return Err(ServerError::Forbidden("requires admin role".to_string()));
        }
        let ticket = self.store.cancel_ticket(id).await?;
        let _ = self.event_bus.publish(TicketEvent::TicketCancelled {
            ticket_id: ticket.id,
            event_id: ticket.event_id,
            timestamp: Utc::now(),
        });
        tracing::info!(ticket = %id, "ticket cancelled");
        Ok(ticket)
    }

    /// Lists the actor's own tickets.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PersistenceError`] on backend failure.
    pub async fn my_tickets(&self, actor: Actor) -> Result<Vec<Ticket>, ServerError> {
        self.store.tickets_for_user(actor.profile_id).await
    }

    /// Resolves the display name for a scan result: team name when the
    /// registration is a team, otherwise the holder's profile name. Falls
    /// back to a placeholder rather than failing a successful check-in.
    async fn attendee_name(&self, ticket: &Ticket) -> String {
        match self.store.registration(ticket.registration_id).await {
            Ok(registration) => {
                if let Some(team) = registration.display_team() {
                    return team.to_string();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "attendee lookup: registration missing");
            }
        }
        match self.store.profile(ticket.user_id).await {
            Ok(profile) => profile.name,
            Err(e) => {
                tracing::warn!(error = %e, "attendee lookup: profile missing");
                "Attendee".to_string()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        Event, EventStatus, NewEvent, OrganizerId, PassType, Profile, ProfileId, Registration,
        Role, TicketStatus,
    };
    use crate::store::memory::MemStore;

    struct Fixture {
        service: CheckInService,
        store: Arc<MemStore>,
        event: Event,
        scanner: Actor,
    }

    async fn make_fixture() -> Fixture {
        let store = Arc::new(MemStore::new());
        let service = CheckInService::new(
            Arc::clone(&store) as Arc<dyn DataStore>,
            EventBus::new(100),
        );

        let mut event: Event = NewEvent {
            organizer_id: OrganizerId::new(),
            title: "Annual Meetup".to_string(),
            description: None,
            venue: "Block C".to_string(),
            starts_at: Utc::now(),
            ends_at: None,
            max_participants: None,
            is_team_event: false,
            max_team_size: 1,
        }
        .into();
        event.status = EventStatus::Published;
        let _ = store.insert_event(event.clone()).await;

        Fixture {
            service,
            store,
            event,
            scanner: Actor {
                profile_id: ProfileId::new(),
                role: Role::Volunteer,
            },
        }
    }

    /// Issues a ticket for a fresh attendee and returns it with its
    /// encoded payload.
    async fn issue_ticket(fx: &Fixture) -> (Ticket, String) {
        let holder = Profile::new("Asha Iyer", "asha@campus.edu", Role::Student);
        let holder_id = holder.id;
        let _ = fx.store.insert_profile(holder).await;

        let pass = PassType::new(fx.event.id, "Entry", 0);
        let _ = fx.store.insert_pass_type(pass.clone()).await;

        let registration =
            Registration::create(&fx.event, pass.id, holder_id, None, vec![])
                .ok()
                .unwrap_or_else(|| panic!("registration must validate"));
        let _ = fx.store.insert_registration(registration.clone()).await;

        let ticket = fx
            .store
            .confirm_and_issue(registration.id, None, Ticket::issue(&registration))
            .await
            .ok()
            .unwrap_or_else(|| panic!("issuance must succeed"));
        let payload = QrPayload::for_ticket(&ticket, TicketKind::Individual).encode();
        (ticket, payload)
    }

    #[tokio::test]
    async fn valid_scan_succeeds_and_marks_used() {
        let fx = make_fixture().await;
        let (ticket, payload) = issue_ticket(&fx).await;

        let outcome = fx
            .service
            .validate_and_check_in(&payload, fx.event.id, fx.scanner)
            .await;
        let ScanOutcome::Success { ticket: updated, attendee, .. } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(updated.id, ticket.id);
        assert_eq!(updated.status, TicketStatus::Used);
        assert!(updated.scanned_at.is_some());
        assert_eq!(updated.scanned_by, Some(fx.scanner.profile_id));
        assert_eq!(attendee, "Asha Iyer");
    }

    #[tokio::test]
    async fn rescan_is_duplicate_with_original_time() {
        let fx = make_fixture().await;
        let (_, payload) = issue_ticket(&fx).await;

        let first = fx
            .service
            .validate_and_check_in(&payload, fx.event.id, fx.scanner)
            .await;
        let ScanOutcome::Success { ticket, .. } = first else {
            panic!("first scan must succeed");
        };
        let original = ticket.scanned_at;

        // Re-scan any number of times: always duplicate, always the same
        // authoritative timestamp, never a new success.
        for _ in 0..3 {
            let outcome = fx
                .service
                .validate_and_check_in(&payload, fx.event.id, fx.scanner)
                .await;
            let ScanOutcome::Duplicate { scanned_at, .. } = outcome else {
                panic!("re-scan must be duplicate, got {outcome:?}");
            };
            assert_eq!(Some(scanned_at), original);
        }
    }

    #[tokio::test]
    async fn cross_event_replay_is_invalid_without_lookup() {
        let fx = make_fixture().await;
        let (ticket, payload) = issue_ticket(&fx).await;

        let other_event = EventId::new();
        let outcome = fx
            .service
            .validate_and_check_in(&payload, other_event, fx.scanner)
            .await;
        let ScanOutcome::Invalid { reason } = outcome else {
            panic!("expected invalid, got {outcome:?}");
        };
        assert!(reason.contains("not for this event"));

        // No mutation happened: the ticket is still active.
        let current = fx.store.ticket(ticket.id).await;
        assert!(matches!(
            current.map(|t| t.status),
            Ok(TicketStatus::Active)
        ));
    }

    #[tokio::test]
    async fn malformed_payload_is_invalid() {
        let fx = make_fixture().await;
        for raw in ["", "garbage", "TSR1|broken"] {
            let outcome = fx
                .service
                .validate_and_check_in(raw, fx.event.id, fx.scanner)
                .await;
            assert!(
                matches!(outcome, ScanOutcome::Invalid { ref reason } if reason.contains("malformed")),
                "input: {raw:?}"
            );
        }
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let fx = make_fixture().await;
        let stray = QrPayload {
            ticket_token: crate::domain::TicketToken::new(),
            event_id: fx.event.id,
            user_id: ProfileId::new(),
            kind: TicketKind::Individual,
            issued_at: Utc::now(),
        };
        let outcome = fx
            .service
            .validate_and_check_in(&stray.encode(), fx.event.id, fx.scanner)
            .await;
        assert!(
            matches!(outcome, ScanOutcome::Invalid { ref reason } if reason.contains("not found"))
        );
    }

    #[tokio::test]
    async fn cancelled_ticket_is_invalid() {
        let fx = make_fixture().await;
        let (ticket, payload) = issue_ticket(&fx).await;
        let _ = fx.store.cancel_ticket(ticket.id).await;

        let outcome = fx
            .service
            .validate_and_check_in(&payload, fx.event.id, fx.scanner)
            .await;
        assert!(
            matches!(outcome, ScanOutcome::Invalid { ref reason } if reason.contains("cancelled"))
        );
    }

    #[tokio::test]
    async fn concurrent_scans_one_success_one_duplicate() {
        let fx = make_fixture().await;
        let (_, payload) = issue_ticket(&fx).await;
        let service = fx.service.clone();

        let scanner_a = Actor {
            profile_id: ProfileId::new(),
            role: Role::Volunteer,
        };
        let scanner_b = Actor {
            profile_id: ProfileId::new(),
            role: Role::Volunteer,
        };

        let a = {
            let service = service.clone();
            let payload = payload.clone();
            let event_id = fx.event.id;
            tokio::spawn(async move {
                service.validate_and_check_in(&payload, event_id, scanner_a).await
            })
        };
        let b = {
            let service = service.clone();
            let payload = payload.clone();
            let event_id = fx.event.id;
            tokio::spawn(async move {
                service.validate_and_check_in(&payload, event_id, scanner_b).await
            })
        };

        let mut successes = 0;
        let mut duplicates = 0;
        for joined in [a.await, b.await] {
            let Ok(outcome) = joined else {
                panic!("scan task failed");
            };
            match outcome {
                ScanOutcome::Success { .. } => successes += 1,
                ScanOutcome::Duplicate { .. } => duplicates += 1,
                ScanOutcome::Invalid { reason } => panic!("unexpected invalid: {reason}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(duplicates, 1);
    }

    #[tokio::test]
    async fn team_ticket_scans_to_team_name() {
        let fx = make_fixture().await;

        let mut team_event: Event = NewEvent {
            organizer_id: OrganizerId::new(),
            title: "Robotics League".to_string(),
            description: None,
            venue: "Lab 2".to_string(),
            starts_at: Utc::now(),
            ends_at: None,
            max_participants: None,
            is_team_event: true,
            max_team_size: 3,
        }
        .into();
        team_event.status = EventStatus::Published;
        let _ = fx.store.insert_event(team_event.clone()).await;

        let pass = PassType::new(team_event.id, "Team Entry", 0);
        let _ = fx.store.insert_pass_type(pass.clone()).await;

        let registration = Registration::create(
            &team_event,
            pass.id,
            ProfileId::new(),
            Some("Circuit Breakers".to_string()),
            vec![crate::domain::TeamMember {
                name: "Lead".to_string(),
                email: "lead@campus.edu".to_string(),
                college: "Engineering".to_string(),
                year: "4".to_string(),
            }],
        )
        .ok()
        .unwrap_or_else(|| panic!("team registration must validate"));
        let _ = fx.store.insert_registration(registration.clone()).await;
        let ticket = fx
            .store
            .confirm_and_issue(registration.id, None, Ticket::issue(&registration))
            .await
            .ok()
            .unwrap_or_else(|| panic!("issuance must succeed"));

        let payload = QrPayload::for_ticket(&ticket, TicketKind::Team).encode();
        let outcome = fx
            .service
            .validate_and_check_in(&payload, team_event.id, fx.scanner)
            .await;
        let ScanOutcome::Success { attendee, .. } = outcome else {
            panic!("team scan must succeed, got {outcome:?}");
        };
        assert_eq!(attendee, "Circuit Breakers");
    }

    #[tokio::test]
    async fn qr_for_ticket_respects_ownership_and_state() {
        let fx = make_fixture().await;
        let (ticket, _) = issue_ticket(&fx).await;

        let holder = Actor {
            profile_id: ticket.user_id,
            role: Role::Student,
        };
        let stranger = Actor {
            profile_id: ProfileId::new(),
            role: Role::Student,
        };

        assert!(fx.service.qr_for_ticket(holder, ticket.id).await.is_ok());
        assert!(matches!(
            fx.service.qr_for_ticket(stranger, ticket.id).await,
            Err(ServerError::Forbidden(_))
        ));

        // Staff may render any ticket's code; used tickets may not be
        // re-encoded.
        assert!(fx.service.qr_for_ticket(fx.scanner, ticket.id).await.is_ok());
        let (_, payload) = fx
            .service
            .qr_for_ticket(holder, ticket.id)
            .await
            .ok()
            .unwrap_or_else(|| panic!("encode must succeed"));
        let _ = fx
            .service
            .validate_and_check_in(&payload, fx.event.id, fx.scanner)
            .await;
        assert!(matches!(
            fx.service.qr_for_ticket(holder, ticket.id).await,
            Err(ServerError::StateConflict(_))
        ));
    }

    #[tokio::test]
    async fn checkin_emits_bus_event() {
        let fx = make_fixture().await;
        let (_, payload) = issue_ticket(&fx).await;
        let mut rx = fx.service.event_bus.subscribe();

        let _ = fx
            .service
            .validate_and_check_in(&payload, fx.event.id, fx.scanner)
            .await;
        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected event");
        };
        assert_eq!(event.event_type_str(), "ticket_checked_in");
    }
}
