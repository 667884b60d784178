//! Ticket, QR, and scan-result DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{QrPayload, Ticket};
use crate::service::ScanOutcome;

/// Ticket representation.
///
/// The scan token is deliberately absent: it only ever travels inside the
/// QR payload returned by the dedicated QR endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct TicketResponse {
    /// Ticket identifier.
    pub id: Uuid,
    /// Event it admits to.
    pub event_id: Uuid,
    /// Holder.
    pub user_id: Uuid,
    /// Source registration.
    pub registration_id: Uuid,
    /// Pass type purchased.
    pub pass_type_id: Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Authoritative scan time, if checked in.
    pub scanned_at: Option<DateTime<Utc>>,
    /// Staff identity that scanned, if checked in.
    pub scanned_by: Option<Uuid>,
    /// Issuance timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id.into(),
            event_id: ticket.event_id.into(),
            user_id: ticket.user_id.into(),
            registration_id: ticket.registration_id.into(),
            pass_type_id: ticket.pass_type_id.into(),
            status: ticket.status.to_string(),
            scanned_at: ticket.scanned_at,
            scanned_by: ticket.scanned_by.map(Into::into),
            created_at: ticket.created_at,
        }
    }
}

/// Decoded QR payload, echoed back to the scanning UI.
#[derive(Debug, Serialize, ToSchema)]
pub struct QrPayloadDto {
    /// Opaque scan token.
    pub ticket_token: Uuid,
    /// Event the payload admits to.
    pub event_id: Uuid,
    /// Holder.
    pub user_id: Uuid,
    /// `individual` or `team`.
    pub kind: String,
    /// Payload generation time.
    pub issued_at: DateTime<Utc>,
}

impl From<QrPayload> for QrPayloadDto {
    fn from(payload: QrPayload) -> Self {
        Self {
            ticket_token: payload.ticket_token.into(),
            event_id: payload.event_id.into(),
            user_id: payload.user_id.into(),
            kind: payload.kind.as_str().to_string(),
            issued_at: payload.issued_at,
        }
    }
}

/// Response body for `GET /tickets/{id}/qr`.
#[derive(Debug, Serialize, ToSchema)]
pub struct QrResponse {
    /// Ticket identifier.
    pub ticket_id: Uuid,
    /// The wire string to render as a QR code.
    pub payload: String,
    /// Decoded payload fields.
    pub qr: QrPayloadDto,
}

/// Request body for `POST /events/{id}/checkin`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckInRequest {
    /// Raw string read from the scanned QR code.
    pub code: String,
}

/// Scan verdict discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanResultKind {
    /// Authoritative check-in recorded.
    Success,
    /// Ticket already used; nothing written.
    Duplicate,
    /// Payload or ticket unusable; nothing written.
    Invalid,
}

/// Response body for `POST /events/{id}/checkin`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResultResponse {
    /// Verdict.
    pub result: ScanResultKind,
    /// Operator-facing message.
    pub message: String,
    /// The ticket, for success and duplicate verdicts.
    pub ticket: Option<TicketResponse>,
    /// The decoded payload, when it decoded at all.
    pub qr: Option<QrPayloadDto>,
}

impl From<ScanOutcome> for ScanResultResponse {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Success {
                ticket,
                attendee,
                qr,
            } => Self {
                result: ScanResultKind::Success,
                message: format!("checked in: {attendee}"),
                ticket: Some(ticket.into()),
                qr: Some(qr.into()),
            },
            ScanOutcome::Duplicate {
                ticket,
                scanned_at,
                qr,
            } => Self {
                result: ScanResultKind::Duplicate,
                message: format!("already checked in at {}", scanned_at.to_rfc3339()),
                ticket: Some(ticket.into()),
                qr: Some(qr.into()),
            },
            ScanOutcome::Invalid { reason } => Self {
                result: ScanResultKind::Invalid,
                message: reason,
                ticket: None,
                qr: None,
            },
        }
    }
}
