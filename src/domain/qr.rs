//! QR payload encoding and decoding.
//!
//! The payload is a versioned, `|`-delimited string:
//!
//! ```text
//! TSR1|<ticket_token>|<event_id>|<user_id>|<kind>|<issued_at RFC-3339>
//! ```
//!
//! Encoding embeds everything a scanner needs without a store round-trip.
//! Decoding is pure, performs no store access, and returns [`None`] for any
//! malformed input so the scan loop can render "invalid ticket" instead of
//! branching on an error type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, ProfileId, Ticket, TicketToken};

/// Version tag prefixing every payload this build emits.
const QR_VERSION: &str = "TSR1";

/// Number of `|`-separated fields, version tag included.
const QR_FIELDS: usize = 6;

/// Whether a ticket admits an individual or a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    /// Single attendee.
    Individual,
    /// Team registration; the scan result shows the team name.
    Team,
}

impl TicketKind {
    /// Returns the canonical lowercase string for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Team => "team",
        }
    }
}

/// Decoded contents of a scanned QR code.
///
/// Transient: never persisted, reconstructed from the wire string on every
/// scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Opaque scan token identifying the ticket.
    pub ticket_token: TicketToken,
    /// Event the payload claims to admit to.
    pub event_id: EventId,
    /// Ticket holder.
    pub user_id: ProfileId,
    /// Individual or team admission.
    pub kind: TicketKind,
    /// When the payload was generated.
    pub issued_at: DateTime<Utc>,
}

impl QrPayload {
    /// Builds a payload for a ticket, stamping `issued_at` with the current
    /// time.
    #[must_use]
    pub fn for_ticket(ticket: &Ticket, kind: TicketKind) -> Self {
        Self {
            ticket_token: ticket.ticket_token,
            event_id: ticket.event_id,
            user_id: ticket.user_id,
            kind,
            issued_at: Utc::now(),
        }
    }

    /// Serializes the payload to its wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{QR_VERSION}|{}|{}|{}|{}|{}",
            self.ticket_token,
            self.event_id,
            self.user_id,
            self.kind.as_str(),
            self.issued_at.to_rfc3339(),
        )
    }

    /// Parses a scanned string back into a payload.
    ///
    /// Returns [`None`] on any malformation: wrong version tag, wrong field
    /// count, unparseable UUIDs, unknown kind, or a bad timestamp. Never
    /// panics.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let mut fields = raw.split('|');
        if fields.next() != Some(QR_VERSION) {
            return None;
        }
        let ticket_token: TicketToken = fields.next()?.parse().ok()?;
        let event_id: EventId = fields.next()?.parse().ok()?;
        let user_id: ProfileId = fields.next()?.parse().ok()?;
        let kind = match fields.next()? {
            "individual" => TicketKind::Individual,
            "team" => TicketKind::Team,
            _ => return None,
        };
        let issued_at = DateTime::parse_from_rfc3339(fields.next()?)
            .ok()?
            .with_timezone(&Utc);
        if fields.next().is_some() {
            // Trailing garbage beyond the expected field count.
            return None;
        }
        debug_assert_eq!(raw.split('|').count(), QR_FIELDS);
        Some(Self {
            ticket_token,
            event_id,
            user_id,
            kind,
            issued_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_payload() -> QrPayload {
        QrPayload {
            ticket_token: TicketToken::new(),
            event_id: EventId::new(),
            user_id: ProfileId::new(),
            kind: TicketKind::Individual,
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let payload = make_payload();
        let encoded = payload.encode();
        let Some(decoded) = QrPayload::decode(&encoded) else {
            panic!("freshly encoded payload must decode");
        };
        assert_eq!(decoded.ticket_token, payload.ticket_token);
        assert_eq!(decoded.event_id, payload.event_id);
        assert_eq!(decoded.user_id, payload.user_id);
        assert_eq!(decoded.kind, payload.kind);
        // RFC-3339 keeps sub-second precision, so timestamps survive.
        assert_eq!(decoded.issued_at, payload.issued_at);
    }

    #[test]
    fn team_kind_round_trips() {
        let mut payload = make_payload();
        payload.kind = TicketKind::Team;
        let decoded = QrPayload::decode(&payload.encode());
        assert_eq!(decoded.map(|p| p.kind), Some(TicketKind::Team));
    }

    #[test]
    fn empty_and_garbage_inputs_decode_to_none() {
        for raw in ["", "garbage", "||||", "not|a|ticket|at|all|x", "TSR1"] {
            assert_eq!(QrPayload::decode(raw), None, "input: {raw:?}");
        }
    }

    #[test]
    fn wrong_version_tag_is_rejected() {
        let payload = make_payload();
        let encoded = payload.encode().replacen("TSR1", "TSR2", 1);
        assert_eq!(QrPayload::decode(&encoded), None);
    }

    #[test]
    fn corrupt_uuid_is_rejected() {
        let payload = make_payload();
        let encoded = payload
            .encode()
            .replace(&payload.ticket_token.to_string(), "zzzz-not-a-uuid");
        assert_eq!(QrPayload::decode(&encoded), None);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let payload = make_payload();
        let encoded = payload.encode().replace("|individual|", "|vip|");
        assert_eq!(QrPayload::decode(&encoded), None);
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let payload = make_payload();
        let rfc = payload.issued_at.to_rfc3339();
        let encoded = payload.encode().replace(&rfc, "yesterday");
        assert_eq!(QrPayload::decode(&encoded), None);
    }

    #[test]
    fn trailing_fields_are_rejected() {
        let payload = make_payload();
        let encoded = format!("{}|extra", payload.encode());
        assert_eq!(QrPayload::decode(&encoded), None);
    }

    #[test]
    fn decode_never_touches_a_store() {
        // Purity is structural (no store handle in scope); this pins the
        // signature so a future refactor cannot quietly add I/O.
        let _: fn(&str) -> Option<QrPayload> = QrPayload::decode;
    }
}
