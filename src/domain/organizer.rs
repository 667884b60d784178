//! Organizer records and the verification gate.
//!
//! Verification is a two-state, admin-driven machine:
//! `pending → approved` or `pending → rejected`. Both outcomes are terminal
//! and there are no automatic transitions or timeouts. Only an `approved`
//! organizer's events may be published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrganizerId, ProfileId};
use crate::error::ServerError;

/// Verification status of an organizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Awaiting admin review.
    Pending,
    /// Approved; events may be published.
    Approved,
    /// Rejected; terminal. The reason lives on the organizer record.
    Rejected,
}

impl VerificationStatus {
    /// Returns the canonical lowercase string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An organizer applying to host events on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organizer {
    /// Organizer identifier.
    pub id: OrganizerId,
    /// Profile that owns this organizer record.
    pub profile_id: ProfileId,
    /// Organization or club name.
    pub name: String,
    /// Contact email for attendees.
    pub contact_email: String,
    /// Current verification status.
    pub status: VerificationStatus,
    /// Reason supplied by the admin on rejection.
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status-change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Organizer {
    /// Creates a new organizer application in `pending` state.
    #[must_use]
    pub fn apply(
        profile_id: ProfileId,
        name: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrganizerId::new(),
            profile_id,
            name: name.into(),
            contact_email: contact_email.into(),
            status: VerificationStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the organizer approved.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::StateConflict`] unless the organizer is
    /// currently `pending`.
    pub fn approve(&mut self) -> Result<(), ServerError> {
        if self.status != VerificationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "organizer is already {}",
                self.status
            )));
        }
        self.status = VerificationStatus::Approved;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the organizer rejected with the given reason.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::StateConflict`] unless the organizer is
    /// currently `pending`.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), ServerError> {
        if self.status != VerificationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "organizer is already {}",
                self.status
            )));
        }
        self.status = VerificationStatus::Rejected;
        self.rejection_reason = Some(reason.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns `true` if events owned by this organizer may be published.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Approved
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_organizer() -> Organizer {
        Organizer::apply(ProfileId::new(), "Robotics Club", "robotics@campus.edu")
    }

    #[test]
    fn new_application_is_pending() {
        let org = make_organizer();
        assert_eq!(org.status, VerificationStatus::Pending);
        assert!(!org.is_verified());
    }

    #[test]
    fn approve_from_pending() {
        let mut org = make_organizer();
        assert!(org.approve().is_ok());
        assert!(org.is_verified());
    }

    #[test]
    fn reject_records_reason() {
        let mut org = make_organizer();
        assert!(org.reject("incomplete documentation").is_ok());
        assert_eq!(org.status, VerificationStatus::Rejected);
        assert_eq!(
            org.rejection_reason.as_deref(),
            Some("incomplete documentation")
        );
    }

    #[test]
    fn approval_is_terminal() {
        let mut org = make_organizer();
        let _ = org.approve();
        assert!(org.approve().is_err());
        assert!(org.reject("too late").is_err());
    }

    #[test]
    fn rejection_is_terminal() {
        let mut org = make_organizer();
        let _ = org.reject("no");
        assert!(org.approve().is_err());
    }
}
