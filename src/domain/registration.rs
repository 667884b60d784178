//! Registrations: purchase intents that become tickets on confirmation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Event, EventId, PassTypeId, ProfileId, RegistrationId};
use crate::error::ServerError;

/// Lifecycle status of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Created; awaiting payment confirmation (or free-pass issuance).
    Pending,
    /// Payment verified (or free); a ticket exists for it.
    Confirmed,
    /// Cancelled before confirmation, or administratively.
    Cancelled,
}

impl RegistrationStatus {
    /// Returns the canonical lowercase string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown registration status: {other}")),
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of a team registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Member name.
    pub name: String,
    /// Member email.
    pub email: String,
    /// College or institution.
    pub college: String,
    /// Year of study.
    pub year: String,
}

/// A sign-up for one pass of one event by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    /// Registration identifier.
    pub id: RegistrationId,
    /// Target event.
    pub event_id: EventId,
    /// Purchased pass type.
    pub pass_type_id: PassTypeId,
    /// Registering user.
    pub user_id: ProfileId,
    /// Lifecycle status.
    pub status: RegistrationStatus,
    /// Team name when the event is a team event.
    pub team_name: Option<String>,
    /// Ordered team roster. Empty for individual registrations.
    pub team_members: Vec<TeamMember>,
    /// Payment order id assigned when an order is opened.
    pub payment_order_id: Option<String>,
    /// Payment evidence (payment id / UTR) recorded at confirmation.
    pub payment_reference: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Creates a pending registration after validating team rules against
    /// the event.
    ///
    /// Team fields must be supplied together (a name plus at least one
    /// member) or not at all, and only for team events; the roster may not
    /// exceed the event's `max_team_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRequest`] on any team-rule violation.
    pub fn create(
        event: &Event,
        pass_type_id: PassTypeId,
        user_id: ProfileId,
        team_name: Option<String>,
        team_members: Vec<TeamMember>,
    ) -> Result<Self, ServerError> {
        validate_team_fields(event, team_name.as_deref(), &team_members)?;
        let now = Utc::now();
        Ok(Self {
            id: RegistrationId::new(),
            event_id: event.id,
            pass_type_id,
            user_id,
            status: RegistrationStatus::Pending,
            team_name,
            team_members,
            payment_order_id: None,
            payment_reference: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the display name for scan results: the team name for team
    /// registrations, `None` for individual ones (caller falls back to the
    /// profile name).
    #[must_use]
    pub fn display_team(&self) -> Option<&str> {
        self.team_name.as_deref()
    }

    /// Returns `true` if this registration carries a team roster.
    #[must_use]
    pub fn is_team(&self) -> bool {
        self.team_name.is_some()
    }
}

/// Validates the team-field invariants for a prospective registration.
///
/// # Errors
///
/// Returns [`ServerError::InvalidRequest`] when team fields are partially
/// supplied, supplied for an individual event, or exceed the event's
/// maximum team size.
pub fn validate_team_fields(
    event: &Event,
    team_name: Option<&str>,
    team_members: &[TeamMember],
) -> Result<(), ServerError> {
    match (team_name, team_members.is_empty()) {
        (None, true) => {
            if event.is_team_event {
                return Err(ServerError::InvalidRequest(
                    "this event requires a team name and at least one member".to_string(),
                ));
            }
            Ok(())
        }
        (Some(name), false) => {
            if !event.is_team_event {
                return Err(ServerError::InvalidRequest(
                    "this event does not accept team registrations".to_string(),
                ));
            }
            if name.trim().is_empty() {
                return Err(ServerError::InvalidRequest(
                    "team name must not be blank".to_string(),
                ));
            }
            let max = event.max_team_size as usize;
            if team_members.len() > max {
                return Err(ServerError::InvalidRequest(format!(
                    "team has {} members but the limit is {max}",
                    team_members.len()
                )));
            }
            Ok(())
        }
        // Name without members, or members without a name.
        _ => Err(ServerError::InvalidRequest(
            "team name and team members must be provided together".to_string(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventStatus, NewEvent, OrganizerId};

    fn make_event(is_team: bool, max_team_size: u32) -> Event {
        let mut event: Event = NewEvent {
            organizer_id: OrganizerId::new(),
            title: "Hackathon".to_string(),
            description: None,
            venue: "Lab 3".to_string(),
            starts_at: Utc::now(),
            ends_at: None,
            max_participants: None,
            is_team_event: is_team,
            max_team_size,
        }
        .into();
        event.status = EventStatus::Published;
        event
    }

    fn member(n: usize) -> TeamMember {
        TeamMember {
            name: format!("Member {n}"),
            email: format!("m{n}@campus.edu"),
            college: "Engineering".to_string(),
            year: "3".to_string(),
        }
    }

    #[test]
    fn individual_registration_without_team_fields() {
        let event = make_event(false, 1);
        let reg = Registration::create(&event, PassTypeId::new(), ProfileId::new(), None, vec![]);
        let Ok(reg) = reg else {
            panic!("individual registration should be accepted");
        };
        assert_eq!(reg.status, RegistrationStatus::Pending);
        assert!(!reg.is_team());
    }

    #[test]
    fn team_event_requires_team_fields() {
        let event = make_event(true, 4);
        let reg = Registration::create(&event, PassTypeId::new(), ProfileId::new(), None, vec![]);
        assert!(reg.is_err());
    }

    #[test]
    fn team_fields_on_individual_event_rejected() {
        let event = make_event(false, 1);
        let reg = Registration::create(
            &event,
            PassTypeId::new(),
            ProfileId::new(),
            Some("Rustaceans".to_string()),
            vec![member(1)],
        );
        assert!(reg.is_err());
    }

    #[test]
    fn oversized_team_rejected() {
        let event = make_event(true, 2);
        let reg = Registration::create(
            &event,
            PassTypeId::new(),
            ProfileId::new(),
            Some("Rustaceans".to_string()),
            vec![member(1), member(2), member(3)],
        );
        assert!(reg.is_err());
    }

    #[test]
    fn team_at_limit_accepted() {
        let event = make_event(true, 2);
        let reg = Registration::create(
            &event,
            PassTypeId::new(),
            ProfileId::new(),
            Some("Rustaceans".to_string()),
            vec![member(1), member(2)],
        );
        assert!(reg.is_ok());
    }

    #[test]
    fn partial_team_fields_rejected() {
        let event = make_event(true, 4);
        let name_only = Registration::create(
            &event,
            PassTypeId::new(),
            ProfileId::new(),
            Some("Rustaceans".to_string()),
            vec![],
        );
        assert!(name_only.is_err());

        let members_only =
            Registration::create(&event, PassTypeId::new(), ProfileId::new(), None, vec![
                member(1),
            ]);
        assert!(members_only.is_err());
    }

    #[test]
    fn blank_team_name_rejected() {
        let event = make_event(true, 4);
        let reg = Registration::create(
            &event,
            PassTypeId::new(),
            ProfileId::new(),
            Some("   ".to_string()),
            vec![member(1)],
        );
        assert!(reg.is_err());
    }
}
