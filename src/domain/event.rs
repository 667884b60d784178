//! Event catalog entries and their publication lifecycle.
//!
//! Events move through `draft → pending → approved → published`, with
//! `cancelled` reachable from any non-terminal state. The `published`
//! transition is additionally gated on the owning organizer being verified;
//! the gate itself is enforced by the event service, which is the only
//! caller with access to the organizer record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, OrganizerId};
use crate::error::ServerError;

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Being edited by the organizer; not visible to anyone else.
    Draft,
    /// Submitted for admin review.
    Pending,
    /// Approved by an admin; organizer may publish.
    Approved,
    /// Live in the public catalog; registrations accepted.
    Published,
    /// Cancelled; terminal.
    Cancelled,
}

impl EventStatus {
    /// Returns the canonical lowercase string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog event owned by one organizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Owning organizer.
    pub organizer_id: OrganizerId,
    /// Event title.
    pub title: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Venue string.
    pub venue: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end, if known.
    pub ends_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Hard cap on confirmed participants. `None` means unlimited.
    pub max_participants: Option<u32>,
    /// Whether registrations form teams.
    pub is_team_event: bool,
    /// Largest allowed team, counting listed members. Ignored for
    /// individual events.
    pub max_team_size: u32,
    /// Denormalized count of confirmed registrations.
    pub current_participants: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Returns `true` if the event has reached its participant cap.
    #[must_use]
    pub fn is_full(&self) -> bool {
        match self.max_participants {
            Some(max) => self.current_participants >= max,
            None => false,
        }
    }

    /// Returns `true` if new registrations are currently accepted.
    #[must_use]
    pub fn accepts_registrations(&self) -> bool {
        self.status == EventStatus::Published && !self.is_full()
    }

    /// Validates a status transition without applying it.
    ///
    /// The organizer-verification gate on `published` is checked by the
    /// caller; this method only encodes the transition graph.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::StateConflict`] when the transition is not in
    /// the lifecycle graph.
    pub fn check_transition(&self, to: EventStatus) -> Result<(), ServerError> {
        use EventStatus::{Approved, Cancelled, Draft, Pending, Published};
        let ok = matches!(
            (self.status, to),
            (Draft, Pending)
                | (Pending, Approved)
                | (Approved, Published)
                | (Draft | Pending | Approved | Published, Cancelled)
        );
        if ok {
            Ok(())
        } else {
            Err(ServerError::StateConflict(format!(
                "event cannot move from {} to {}",
                self.status, to
            )))
        }
    }
}

/// Builder-style constructor input for a new event.
///
/// Kept as a plain struct so the service layer can validate before the
/// entity exists.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Owning organizer.
    pub organizer_id: OrganizerId,
    /// Event title.
    pub title: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Venue string.
    pub venue: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end.
    pub ends_at: Option<DateTime<Utc>>,
    /// Participant cap.
    pub max_participants: Option<u32>,
    /// Team event flag.
    pub is_team_event: bool,
    /// Max team size (only meaningful for team events).
    pub max_team_size: u32,
}

impl From<NewEvent> for Event {
    fn from(new: NewEvent) -> Self {
        let now = Utc::now();
        Self {
            id: EventId::new(),
            organizer_id: new.organizer_id,
            title: new.title,
            description: new.description,
            venue: new.venue,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            status: EventStatus::Draft,
            max_participants: new.max_participants,
            is_team_event: new.is_team_event,
            max_team_size: new.max_team_size,
            current_participants: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
