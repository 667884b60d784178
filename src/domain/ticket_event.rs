//! Domain events reflecting ticketing state mutations.
//!
//! Every state change emits a [`TicketEvent`] through the
//! [`super::EventBus`]. Events feed WebSocket subscribers (live attendance
//! dashboards) and double as the notification hook for registration
//! confirmations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EventId, OrganizerId, ProfileId, RegistrationId, TicketId};

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TicketEvent {
    /// A registration was confirmed (payment verified or free pass).
    RegistrationConfirmed {
        /// Registration that confirmed.
        registration_id: RegistrationId,
        /// Event registered for.
        event_id: EventId,
        /// Registrant.
        user_id: ProfileId,
        /// Confirmation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A ticket was issued for a confirmed registration.
    TicketIssued {
        /// New ticket.
        ticket_id: TicketId,
        /// Event it admits to.
        event_id: EventId,
        /// Holder.
        user_id: ProfileId,
        /// Issuance timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A ticket was checked in at the venue.
    TicketCheckedIn {
        /// Checked-in ticket.
        ticket_id: TicketId,
        /// Event scanned at.
        event_id: EventId,
        /// Staff identity that scanned.
        scanned_by: ProfileId,
        /// Authoritative scan timestamp.
        scanned_at: DateTime<Utc>,
    },

    /// A ticket was administratively cancelled.
    TicketCancelled {
        /// Cancelled ticket.
        ticket_id: TicketId,
        /// Event it admitted to.
        event_id: EventId,
        /// Cancellation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An event went live in the public catalog.
    EventPublished {
        /// Published event.
        event_id: EventId,
        /// Publication timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An event was cancelled.
    EventCancelled {
        /// Cancelled event.
        event_id: EventId,
        /// Cancellation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An organizer passed verification.
    OrganizerApproved {
        /// Approved organizer.
        organizer_id: OrganizerId,
        /// Approval timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An organizer failed verification.
    OrganizerRejected {
        /// Rejected organizer.
        organizer_id: OrganizerId,
        /// Reason given by the admin.
        reason: String,
        /// Rejection timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl TicketEvent {
    /// Returns the event-catalog ID this event concerns, when it has one.
    ///
    /// Organizer-verification events have no event scope and only reach
    /// wildcard subscribers.
    #[must_use]
    pub const fn event_id(&self) -> Option<EventId> {
        match self {
            Self::RegistrationConfirmed { event_id, .. }
            | Self::TicketIssued { event_id, .. }
            | Self::TicketCheckedIn { event_id, .. }
            | Self::TicketCancelled { event_id, .. }
            | Self::EventPublished { event_id, .. }
            | Self::EventCancelled { event_id, .. } => Some(*event_id),
            Self::OrganizerApproved { .. } | Self::OrganizerRejected { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::RegistrationConfirmed { .. } => "registration_confirmed",
            Self::TicketIssued { .. } => "ticket_issued",
            Self::TicketCheckedIn { .. } => "ticket_checked_in",
            Self::TicketCancelled { .. } => "ticket_cancelled",
            Self::EventPublished { .. } => "event_published",
            Self::EventCancelled { .. } => "event_cancelled",
            Self::OrganizerApproved { .. } => "organizer_approved",
            Self::OrganizerRejected { .. } => "organizer_rejected",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn checked_in_event_carries_its_event_id() {
        let event_id = EventId::new();
        let event = TicketEvent::TicketCheckedIn {
            ticket_id: TicketId::new(),
            event_id,
            scanned_by: ProfileId::new(),
            scanned_at: Utc::now(),
        };
        assert_eq!(event.event_id(), Some(event_id));
        assert_eq!(event.event_type_str(), "ticket_checked_in");
    }

    #[test]
    fn organizer_events_have_no_event_scope() {
        let event = TicketEvent::OrganizerApproved {
            organizer_id: OrganizerId::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_id(), None);
    }

    #[test]
    fn serializes_with_snake_case_tag() {
        let event = TicketEvent::TicketIssued {
            ticket_id: TicketId::new(),
            event_id: EventId::new(),
            user_id: ProfileId::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"event_type\":\"ticket_issued\""));
    }
}
