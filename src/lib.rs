//! # tessera-server
//!
//! REST API and WebSocket backend for student-event ticketing: event
//! catalog with organizer verification, registration with optional team
//! formation, HMAC-verified payment confirmation, QR ticket issuance, and
//! at-most-once scan check-in.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Feed (ws/)
//!     │
//!     ├── EventService / OrganizerService (service/)
//!     ├── RegistrationService / CheckInService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Domain entities + state machines (domain/)
//!     │
//!     └── DataStore (store/): PostgreSQL or in-memory fixture
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod payment;
pub mod service;
pub mod store;
pub mod ws;
