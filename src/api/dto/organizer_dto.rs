//! Organizer verification DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Organizer;

/// Request body for `POST /organizers`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyOrganizerRequest {
    /// Organization or club name.
    pub name: String,
    /// Contact email for attendees.
    pub contact_email: String,
}

/// Request body for `POST /organizers/{id}/reject`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectOrganizerRequest {
    /// Reason shown to the applicant.
    pub reason: String,
}

/// Organizer representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizerResponse {
    /// Organizer identifier.
    pub id: Uuid,
    /// Owning profile.
    pub profile_id: Uuid,
    /// Organization name.
    pub name: String,
    /// Contact email.
    pub contact_email: String,
    /// Verification status.
    pub status: String,
    /// Rejection reason, when rejected.
    pub rejection_reason: Option<String>,
    /// Application timestamp.
    pub created_at: DateTime<Utc>,
    /// Last decision timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Organizer> for OrganizerResponse {
    fn from(organizer: Organizer) -> Self {
        Self {
            id: organizer.id.into(),
            profile_id: organizer.profile_id.into(),
            name: organizer.name,
            contact_email: organizer.contact_email,
            status: organizer.status.to_string(),
            rejection_reason: organizer.rejection_reason,
            created_at: organizer.created_at,
            updated_at: organizer.updated_at,
        }
    }
}
