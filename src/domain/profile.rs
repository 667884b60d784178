//! User profiles and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProfileId;

/// Role attached to a profile, controlling which operations it may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular attendee: browses events, registers, holds tickets.
    Student,
    /// Event owner: creates and manages events once verified.
    Organizer,
    /// Check-in staff: may scan tickets at the venue.
    Volunteer,
    /// Platform administrator: verification and approval authority.
    Admin,
}

impl Role {
    /// Returns the canonical lowercase string for this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Organizer => "organizer",
            Self::Volunteer => "volunteer",
            Self::Admin => "admin",
        }
    }

    /// Returns `true` if this role may operate a check-in scanner.
    #[must_use]
    pub const fn can_scan(&self) -> bool {
        matches!(self, Self::Volunteer | Self::Organizer | Self::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "organizer" => Ok(Self::Organizer),
            "volunteer" => Ok(Self::Volunteer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Profile identifier.
    pub id: ProfileId,
    /// Display name shown on tickets and scan results.
    pub name: String,
    /// Login email, unique per profile.
    pub email: String,
    /// Role of this profile.
    pub role: Role,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Creates a new profile with the given name, email, and role.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: ProfileId::new(),
            name: name.into(),
            email: email.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Student, Role::Organizer, Role::Volunteer, Role::Admin] {
            let parsed: Result<Role, _> = role.as_str().parse();
            assert_eq!(parsed.ok(), Some(role));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let parsed: Result<Role, _> = "superuser".parse();
        assert!(parsed.is_err());
    }

    #[test]
    fn scan_permission_excludes_students() {
        assert!(!Role::Student.can_scan());
        assert!(Role::Volunteer.can_scan());
        assert!(Role::Organizer.can_scan());
        assert!(Role::Admin.can_scan());
    }
}
