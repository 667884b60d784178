//! Type-safe entity identifiers.
//!
//! Every entity gets its own newtype wrapper around [`uuid::Uuid`] (v4) so
//! that, for example, a ticket identifier can never be passed where an event
//! identifier is expected. [`TicketToken`] is deliberately a separate type
//! from [`TicketId`]: the token is the opaque value embedded in QR payloads
//! and must never double as the primary key.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<uuid::Uuid>().map(Self)
            }
        }
    };
}

entity_id! {
    /// Unique identifier for a user profile.
    ProfileId
}

entity_id! {
    /// Unique identifier for an organizer record.
    OrganizerId
}

entity_id! {
    /// Unique identifier for an event.
    EventId
}

entity_id! {
    /// Unique identifier for a pass type (ticket tier) within an event.
    PassTypeId
}

entity_id! {
    /// Unique identifier for a registration.
    RegistrationId
}

entity_id! {
    /// Unique identifier for a ticket row.
    ///
    /// This is the system key. It never appears inside QR payloads —
    /// see [`TicketToken`].
    TicketId
}

entity_id! {
    /// Opaque scan token carried in QR payloads.
    ///
    /// Generated independently of [`TicketId`] so that scannable codes leak
    /// nothing about row identity or issuance order. Tickets are looked up
    /// by token only on the check-in path.
    TicketToken
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = TicketId::new();
        let b = TicketId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_uuid_format() {
        let id = EventId::new();
        let s = format!("{id}");
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn serde_round_trip() {
        let id = TicketToken::new();
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let deserialized: TicketToken = serde_json::from_str(&json).ok().unwrap_or_else(|| {
            panic!("deserialization failed");
        });
        assert_eq!(id, deserialized);
    }

    #[test]
    fn from_str_round_trip() {
        let id = RegistrationId::new();
        let parsed: Result<RegistrationId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
    }

    #[test]
    fn token_and_id_are_distinct_types() {
        // Compile-time property; the runtime assertion just exercises both.
        let id = TicketId::new();
        let token = TicketToken::new();
        assert_ne!(id.as_uuid(), token.as_uuid());
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = PassTypeId::new();
        let mut map = HashMap::new();
        map.insert(id, "test");
        assert_eq!(map.get(&id), Some(&"test"));
    }
}
