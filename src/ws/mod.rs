//! WebSocket layer: live ticket-event feed for dashboards.
//!
//! The endpoint at `/ws` streams [`crate::domain::TicketEvent`]s to
//! subscribed clients — an organizer dashboard watching check-ins arrive
//! subscribes to its event's ID and renders the feed as it lands.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
