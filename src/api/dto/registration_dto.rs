//! Registration and payment DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::checkin_dto::TicketResponse;
use crate::domain::{Registration, TeamMember};
use crate::payment::PaymentOrder;
use crate::service::RegistrationReceipt;

/// One team member in a registration request or response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamMemberDto {
    /// Member name.
    pub name: String,
    /// Member email.
    pub email: String,
    /// College or institution.
    pub college: String,
    /// Year of study.
    pub year: String,
}

impl From<TeamMemberDto> for TeamMember {
    fn from(dto: TeamMemberDto) -> Self {
        Self {
            name: dto.name,
            email: dto.email,
            college: dto.college,
            year: dto.year,
        }
    }
}

impl From<TeamMember> for TeamMemberDto {
    fn from(member: TeamMember) -> Self {
        Self {
            name: member.name,
            email: member.email,
            college: member.college,
            year: member.year,
        }
    }
}

/// Request body for `POST /registrations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRegistrationRequest {
    /// Target event.
    pub event_id: Uuid,
    /// Pass to purchase.
    pub pass_type_id: Uuid,
    /// Team name; required together with `team_members` for team events.
    #[serde(default)]
    pub team_name: Option<String>,
    /// Team roster.
    #[serde(default)]
    pub team_members: Vec<TeamMemberDto>,
}

/// Registration representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationResponse {
    /// Registration identifier.
    pub id: Uuid,
    /// Target event.
    pub event_id: Uuid,
    /// Purchased pass type.
    pub pass_type_id: Uuid,
    /// Registering user.
    pub user_id: Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Team name, if any.
    pub team_name: Option<String>,
    /// Team roster.
    pub team_members: Vec<TeamMemberDto>,
    /// Open payment order id, if any.
    pub payment_order_id: Option<String>,
    /// Payment evidence recorded at confirmation.
    pub payment_reference: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationResponse {
    fn from(registration: Registration) -> Self {
        Self {
            id: registration.id.into(),
            event_id: registration.event_id.into(),
            pass_type_id: registration.pass_type_id.into(),
            user_id: registration.user_id.into(),
            status: registration.status.to_string(),
            team_name: registration.team_name,
            team_members: registration
                .team_members
                .into_iter()
                .map(TeamMemberDto::from)
                .collect(),
            payment_order_id: registration.payment_order_id,
            payment_reference: registration.payment_reference,
            created_at: registration.created_at,
        }
    }
}

/// Response body for `POST /registrations` and the payment confirmation.
///
/// `ticket` is populated when issuance happened (free pass, or payment
/// just confirmed).
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationReceiptResponse {
    /// The stored registration.
    pub registration: RegistrationResponse,
    /// The issued ticket, when issuance happened.
    pub ticket: Option<TicketResponse>,
}

impl From<RegistrationReceipt> for RegistrationReceiptResponse {
    fn from(receipt: RegistrationReceipt) -> Self {
        Self {
            registration: receipt.registration.into(),
            ticket: receipt.ticket.map(TicketResponse::from),
        }
    }
}

/// Response body for `POST /registrations/{id}/order`.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    /// Collaborator-facing order identifier.
    pub order_id: String,
    /// Registration the order pays for.
    pub registration_id: Uuid,
    /// Amount owed, in minor units.
    pub amount: u32,
    /// Currency code.
    pub currency: String,
    /// Order creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<PaymentOrder> for OrderResponse {
    fn from(order: PaymentOrder) -> Self {
        Self {
            order_id: order.order_id,
            registration_id: order.registration_id.into(),
            amount: order.amount,
            currency: order.currency.to_string(),
            created_at: order.created_at,
        }
    }
}

/// Request body for `POST /registrations/{id}/confirm`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    /// Order id previously opened for this registration.
    pub order_id: String,
    /// Payment id / UTR from the collaborator.
    pub payment_id: String,
    /// HMAC-SHA256 signature over `order_id|payment_id`, base64url.
    pub signature: String,
}
