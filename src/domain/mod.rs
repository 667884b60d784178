//! Domain layer: entities, identifiers, state machines, and the event bus.
//!
//! Everything here is store-agnostic. Entities own their transition rules
//! (ticket check-in, event lifecycle, organizer verification); the stores
//! only decide *atomicity*, never legality.

pub mod event;
pub mod event_bus;
pub mod ids;
pub mod organizer;
pub mod pass_type;
pub mod profile;
pub mod qr;
pub mod registration;
pub mod ticket;
pub mod ticket_event;

pub use event::{Event, EventStatus, NewEvent};
pub use event_bus::EventBus;
pub use ids::{
    EventId, OrganizerId, PassTypeId, ProfileId, RegistrationId, TicketId, TicketToken,
};
pub use organizer::{Organizer, VerificationStatus};
pub use pass_type::PassType;
pub use profile::{Profile, Role};
pub use qr::{QrPayload, TicketKind};
pub use registration::{Registration, RegistrationStatus, TeamMember, validate_team_fields};
pub use ticket::{Ticket, TicketStatus};
pub use ticket_event::TicketEvent;
