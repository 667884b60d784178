//! Event and pass DTOs for catalog endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common_dto::PaginationMeta;
use crate::domain::{Event, PassType};
use crate::store::AttendanceSummary;

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Event title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Venue string.
    pub venue: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Participant cap; omit for unlimited.
    #[serde(default)]
    pub max_participants: Option<u32>,
    /// Whether registrations form teams.
    #[serde(default)]
    pub is_team_event: bool,
    /// Largest allowed team. Defaults to 1.
    #[serde(default = "default_team_size")]
    pub max_team_size: u32,
}

fn default_team_size() -> u32 {
    1
}

/// Full event representation returned by catalog endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    /// Event identifier.
    pub id: Uuid,
    /// Owning organizer.
    pub organizer_id: Uuid,
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
    /// Lifecycle status.
    pub status: String,
    /// Participant cap.
    pub max_participants: Option<u32>,
    /// Whether registrations form teams.
    pub is_team_event: bool,
    /// Largest allowed team.
    pub max_team_size: u32,
    /// Confirmed participant count.
    pub current_participants: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.into(),
            organizer_id: event.organizer_id.into(),
            title: event.title,
            description: event.description,
            venue: event.venue,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            status: event.status.to_string(),
            max_participants: event.max_participants,
            is_team_event: event.is_team_event,
            max_team_size: event.max_team_size,
            current_participants: event.current_participants,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Paginated list response for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events on this page.
    pub data: Vec<EventResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `POST /events/{id}/passes`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePassRequest {
    /// Display name, e.g. `"Early Bird"`.
    pub name: String,
    /// Price in minor units; `0` = free.
    pub price: u32,
    /// Sellable quantity; omit for unlimited.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Optional sale-window start.
    #[serde(default)]
    pub sale_start: Option<DateTime<Utc>>,
    /// Optional sale-window end.
    #[serde(default)]
    pub sale_end: Option<DateTime<Utc>>,
}

/// Pass type representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct PassTypeResponse {
    /// Pass identifier.
    pub id: Uuid,
    /// Owning event.
    pub event_id: Uuid,
    /// Display name.
    pub name: String,
    /// Price in minor units.
    pub price: u32,
    /// Sellable quantity; `null` = unlimited.
    pub quantity: Option<u32>,
    /// Confirmed sales so far.
    pub sold: u32,
    /// Whether the pass accepts registrations.
    pub is_active: bool,
    /// Sale-window start.
    pub sale_start: Option<DateTime<Utc>>,
    /// Sale-window end.
    pub sale_end: Option<DateTime<Utc>>,
}

impl From<PassType> for PassTypeResponse {
    fn from(pass: PassType) -> Self {
        Self {
            id: pass.id.into(),
            event_id: pass.event_id.into(),
            name: pass.name,
            price: pass.price,
            quantity: pass.quantity,
            sold: pass.sold,
            is_active: pass.is_active,
            sale_start: pass.sale_start,
            sale_end: pass.sale_end,
        }
    }
}

/// Attendance dashboard numbers for `GET /events/{id}/attendance`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceResponse {
    /// Event identifier.
    pub event_id: Uuid,
    /// Event title.
    pub title: String,
    /// Tickets issued (any status).
    pub issued: u32,
    /// Tickets checked in.
    pub checked_in: u32,
    /// Tickets cancelled.
    pub cancelled: u32,
    /// Tickets still awaiting check-in.
    pub outstanding: u32,
    /// Confirmed participants.
    pub current_participants: u32,
    /// Participant cap.
    pub max_participants: Option<u32>,
}

impl AttendanceResponse {
    /// Builds the dashboard payload from an event and its ticket counts.
    #[must_use]
    pub fn build(event: &Event, summary: AttendanceSummary) -> Self {
        Self {
            event_id: event.id.into(),
            title: event.title.clone(),
            issued: summary.issued,
            checked_in: summary.checked_in,
            cancelled: summary.cancelled,
            outstanding: summary
                .issued
                .saturating_sub(summary.checked_in)
                .saturating_sub(summary.cancelled),
            current_participants: event.current_participants,
            max_participants: event.max_participants,
        }
    }
}
