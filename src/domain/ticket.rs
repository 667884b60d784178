//! Tickets and their check-in state machine.
//!
//! A ticket's only legal transitions are `active → used` (check-in) and
//! `active → cancelled` (administrative). `used` is terminal: there is no
//! un-scanning, and a second scan must observe the original `scanned_at`
//! rather than produce a new one. Ticket rows are never physically deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, PassTypeId, ProfileId, Registration, TicketId, TicketToken};

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Issued and not yet scanned.
    Active,
    /// Scanned at the venue; terminal.
    Used,
    /// Administratively voided; terminal.
    Cancelled,
}

impl TicketStatus {
    /// Returns the canonical lowercase string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issued ticket bound to exactly one (registration, pass type) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// System key. Never embedded in QR payloads.
    pub id: TicketId,
    /// Opaque scan token, generated separately from [`Ticket::id`].
    pub ticket_token: TicketToken,
    /// Event the ticket admits to.
    pub event_id: EventId,
    /// Ticket holder.
    pub user_id: ProfileId,
    /// Source registration.
    pub registration_id: super::RegistrationId,
    /// Pass type the ticket was issued against.
    pub pass_type_id: PassTypeId,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// Timestamp of the authoritative check-in, if any.
    pub scanned_at: Option<DateTime<Utc>>,
    /// Staff identity that performed the check-in, if any.
    pub scanned_by: Option<ProfileId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Issues a fresh `active` ticket for a registration, minting a new
    /// random [`TicketToken`].
    ///
    /// UUID v4 collision space makes generation-time checking unnecessary;
    /// the store still enforces token uniqueness as a backstop.
    #[must_use]
    pub fn issue(registration: &Registration) -> Self {
        let now = Utc::now();
        Self {
            id: TicketId::new(),
            ticket_token: TicketToken::new(),
            event_id: registration.event_id,
            user_id: registration.user_id,
            registration_id: registration.id,
            pass_type_id: registration.pass_type_id,
            status: TicketStatus::Active,
            scanned_at: None,
            scanned_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the ticket can still be checked in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TicketStatus::Active
    }

    /// Applies the check-in transition in place.
    ///
    /// Callers must have established `active` status first (the stores do
    /// this under a lock or a conditional UPDATE); this method is the
    /// single place the fields are mutated together.
    pub fn mark_used(&mut self, scanner: ProfileId, at: DateTime<Utc>) {
        self.status = TicketStatus::Used;
        self.scanned_at = Some(at);
        self.scanned_by = Some(scanner);
        self.updated_at = at;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventStatus, NewEvent, OrganizerId, RegistrationStatus};

    fn make_registration() -> Registration {
        let mut event: crate::domain::Event = NewEvent {
            organizer_id: OrganizerId::new(),
            title: "Demo Day".to_string(),
            description: None,
            venue: "Hall B".to_string(),
            starts_at: Utc::now(),
            ends_at: None,
            max_participants: None,
            is_team_event: false,
            max_team_size: 1,
        }
        .into();
        event.status = EventStatus::Published;
        let reg = Registration::create(&event, PassTypeId::new(), ProfileId::new(), None, vec![]);
        let Ok(reg) = reg else {
            panic!("registration should be valid");
        };
        reg
    }

    #[test]
    fn issued_ticket_is_active_and_unscanned() {
        let reg = make_registration();
        let ticket = Ticket::issue(&reg);
        assert!(ticket.is_active());
        assert!(ticket.scanned_at.is_none());
        assert!(ticket.scanned_by.is_none());
        assert_eq!(ticket.registration_id, reg.id);
        assert_eq!(ticket.pass_type_id, reg.pass_type_id);
    }

    #[test]
    fn token_differs_from_id() {
        let ticket = Ticket::issue(&make_registration());
        assert_ne!(ticket.id.as_uuid(), ticket.ticket_token.as_uuid());
    }

    #[test]
    fn mark_used_sets_all_scan_fields() {
        let mut ticket = Ticket::issue(&make_registration());
        let scanner = ProfileId::new();
        let at = Utc::now();
        ticket.mark_used(scanner, at);
        assert_eq!(ticket.status, TicketStatus::Used);
        assert_eq!(ticket.scanned_at, Some(at));
        assert_eq!(ticket.scanned_by, Some(scanner));
        assert!(!ticket.is_active());
    }

    #[test]
    fn registration_status_is_independent_of_ticket() {
        // The registration confirms before the ticket exists; the ticket
        // state machine starts at active regardless.
        let mut reg = make_registration();
        reg.status = RegistrationStatus::Confirmed;
        let ticket = Ticket::issue(&reg);
        assert_eq!(ticket.status, TicketStatus::Active);
    }
}
