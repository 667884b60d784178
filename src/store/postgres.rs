//! PostgreSQL implementation of the data store.
//!
//! Queries use the unchecked `sqlx::query_as` tuple form so the crate
//! builds without a live database. Status columns are TEXT and round-trip
//! through the domain enums' `FromStr`/`as_str`; the team roster is JSONB.
//!
//! Atomicity notes:
//! - [`DataStore::confirm_and_issue`] runs in a transaction with
//!   `SELECT ... FOR UPDATE` row locks on the registration, pass type, and
//!   event, so the capacity guards and counter bumps cannot interleave.
//! - [`DataStore::check_in`] is a single conditional UPDATE
//!   (`... WHERE ticket_token = $1 AND status = 'active'`); the scanner
//!   whose UPDATE matches zero rows re-reads the row and reports what it
//!   found.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AttendanceSummary, CheckInWrite, DataStore};
use crate::domain::{
    Event, EventId, EventStatus, Organizer, OrganizerId, PassType, PassTypeId, Profile, ProfileId,
    Registration, RegistrationId, RegistrationStatus, Ticket, TicketId, TicketStatus, TicketToken,
    VerificationStatus,
};
use crate::error::ServerError;

/// PostgreSQL-backed [`DataStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

type ProfileRow = (Uuid, String, String, String, DateTime<Utc>);

type OrganizerRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type EventRow = (
    Uuid,
    Uuid,
    String,
    Option<String>,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    String,
    Option<i32>,
    bool,
    i32,
    i32,
    DateTime<Utc>,
    DateTime<Utc>,
);

type PassTypeRow = (
    Uuid,
    Uuid,
    String,
    i32,
    Option<i32>,
    i32,
    bool,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

type RegistrationRow = (
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    String,
    Option<String>,
    serde_json::Value,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type TicketRow = (
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    String,
    Option<DateTime<Utc>>,
    Option<Uuid>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const EVENT_COLS: &str = "id, organizer_id, title, description, venue, starts_at, ends_at, \
     status, max_participants, is_team_event, max_team_size, current_participants, \
     created_at, updated_at";

const PASS_COLS: &str =
    "id, event_id, name, price, quantity, sold, is_active, sale_start, sale_end, created_at";

const REGISTRATION_COLS: &str = "id, event_id, pass_type_id, user_id, status, team_name, \
     team_members, payment_order_id, payment_reference, created_at, updated_at";

const TICKET_COLS: &str = "id, ticket_token, event_id, user_id, registration_id, pass_type_id, \
     status, scanned_at, scanned_by, created_at, updated_at";

impl PgStore {
    /// Creates a new store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn pg_err(e: sqlx::Error) -> ServerError {
    ServerError::PersistenceError(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|d| d.is_unique_violation())
}

/// Parses a TEXT status column into its domain enum; a mismatch means the
/// row was written by something other than this crate.
fn parse_column<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T, ServerError> {
    raw.parse()
        .map_err(|e: String| ServerError::PersistenceError(format!("corrupt column: {e}")))
}

fn count_u32(n: i32) -> u32 {
    u32::try_from(n).unwrap_or(0)
}

fn int4(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn profile_from_row(row: ProfileRow) -> Result<Profile, ServerError> {
    let (id, name, email, role, created_at) = row;
    Ok(Profile {
        id: ProfileId::from_uuid(id),
        name,
        email,
        role: parse_column(&role)?,
        created_at,
    })
}

fn organizer_from_row(row: OrganizerRow) -> Result<Organizer, ServerError> {
    let (id, profile_id, name, contact_email, status, rejection_reason, created_at, updated_at) =
        row;
    Ok(Organizer {
        id: OrganizerId::from_uuid(id),
        profile_id: ProfileId::from_uuid(profile_id),
        name,
        contact_email,
        status: parse_column(&status)?,
        rejection_reason,
        created_at,
        updated_at,
    })
}

fn event_from_row(row: EventRow) -> Result<Event, ServerError> {
    let (
        id,
        organizer_id,
        title,
        description,
        venue,
        starts_at,
        ends_at,
        status,
        max_participants,
        is_team_event,
        max_team_size,
        current_participants,
        created_at,
        updated_at,
    ) = row;
    Ok(Event {
        id: EventId::from_uuid(id),
        organizer_id: OrganizerId::from_uuid(organizer_id),
        title,
        description,
        venue,
        starts_at,
        ends_at,
        status: parse_column(&status)?,
        max_participants: max_participants.map(count_u32),
        is_team_event,
        max_team_size: count_u32(max_team_size),
        current_participants: count_u32(current_participants),
        created_at,
        updated_at,
    })
}

fn pass_from_row(row: PassTypeRow) -> PassType {
    let (id, event_id, name, price, quantity, sold, is_active, sale_start, sale_end, created_at) =
        row;
    PassType {
        id: PassTypeId::from_uuid(id),
        event_id: EventId::from_uuid(event_id),
        name,
        price: count_u32(price),
        quantity: quantity.map(count_u32),
        sold: count_u32(sold),
        is_active,
        sale_start,
        sale_end,
        created_at,
    }
}

fn registration_from_row(row: RegistrationRow) -> Result<Registration, ServerError> {
    let (
        id,
        event_id,
        pass_type_id,
        user_id,
        status,
        team_name,
        team_members,
        payment_order_id,
        payment_reference,
        created_at,
        updated_at,
    ) = row;
    let team_members = serde_json::from_value(team_members)
        .map_err(|e| ServerError::PersistenceError(format!("corrupt team roster: {e}")))?;
    Ok(Registration {
        id: RegistrationId::from_uuid(id),
        event_id: EventId::from_uuid(event_id),
        pass_type_id: PassTypeId::from_uuid(pass_type_id),
        user_id: ProfileId::from_uuid(user_id),
        status: parse_column(&status)?,
        team_name,
        team_members,
        payment_order_id,
        payment_reference,
        created_at,
        updated_at,
    })
}

fn ticket_from_row(row: TicketRow) -> Result<Ticket, ServerError> {
    let (
        id,
        ticket_token,
        event_id,
        user_id,
        registration_id,
        pass_type_id,
        status,
        scanned_at,
        scanned_by,
        created_at,
        updated_at,
    ) = row;
    Ok(Ticket {
        id: TicketId::from_uuid(id),
        ticket_token: TicketToken::from_uuid(ticket_token),
        event_id: EventId::from_uuid(event_id),
        user_id: ProfileId::from_uuid(user_id),
        registration_id: RegistrationId::from_uuid(registration_id),
        pass_type_id: PassTypeId::from_uuid(pass_type_id),
        status: parse_column(&status)?,
        scanned_at,
        scanned_by: scanned_by.map(ProfileId::from_uuid),
        created_at,
        updated_at,
    })
}

#[async_trait]
impl DataStore for PgStore {
    async fn insert_profile(&self, profile: Profile) -> Result<(), ServerError> {
        sqlx::query(
            "INSERT INTO profiles (id, name, email, role, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(profile.id.as_uuid())
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServerError::StateConflict(format!(
                    "email {} is already registered",
                    profile.email
                ))
            } else {
                pg_err(e)
            }
        })?;
        Ok(())
    }

    async fn profile(&self, id: ProfileId) -> Result<Profile, ServerError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, name, email, role, created_at FROM profiles WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?
        .ok_or(ServerError::ProfileNotFound(id))?;
        profile_from_row(row)
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, ServerError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, name, email, role, created_at FROM profiles WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?;
        row.map(profile_from_row).transpose()
    }

    async fn insert_organizer(&self, organizer: Organizer) -> Result<(), ServerError> {
        sqlx::query(
            "INSERT INTO organizers (id, profile_id, name, contact_email, status, \
             rejection_reason, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(organizer.id.as_uuid())
        .bind(organizer.profile_id.as_uuid())
        .bind(&organizer.name)
        .bind(&organizer.contact_email)
        .bind(organizer.status.as_str())
        .bind(&organizer.rejection_reason)
        .bind(organizer.created_at)
        .bind(organizer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn organizer(&self, id: OrganizerId) -> Result<Organizer, ServerError> {
        let row = sqlx::query_as::<_, OrganizerRow>(
            "SELECT id, profile_id, name, contact_email, status, rejection_reason, created_at, \
             updated_at FROM organizers WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?
        .ok_or(ServerError::OrganizerNotFound(id))?;
        organizer_from_row(row)
    }

    async fn organizer_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Organizer>, ServerError> {
        let row = sqlx::query_as::<_, OrganizerRow>(
            "SELECT id, profile_id, name, contact_email, status, rejection_reason, created_at, \
             updated_at FROM organizers WHERE profile_id = $1",
        )
        .bind(profile_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?;
        row.map(organizer_from_row).transpose()
    }

    async fn pending_organizers(&self) -> Result<Vec<Organizer>, ServerError> {
        let rows = sqlx::query_as::<_, OrganizerRow>(
            "SELECT id, profile_id, name, contact_email, status, rejection_reason, created_at, \
             updated_at FROM organizers WHERE status = 'pending' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.into_iter().map(organizer_from_row).collect()
    }

    async fn set_organizer_verification(
        &self,
        id: OrganizerId,
        status: VerificationStatus,
        rejection_reason: Option<String>,
    ) -> Result<Organizer, ServerError> {
        let row = sqlx::query_as::<_, OrganizerRow>(
            "UPDATE organizers SET status = $2, rejection_reason = $3, updated_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING id, profile_id, name, contact_email, status, rejection_reason, \
             created_at, updated_at",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(&rejection_reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?;
        match row {
            Some(row) => organizer_from_row(row),
            // Distinguish missing from already-decided.
            None => {
                let current = self.organizer(id).await?;
                Err(ServerError::StateConflict(format!(
                    "organizer is already {}",
                    current.status
                )))
            }
        }
    }

    async fn insert_event(&self, event: Event) -> Result<(), ServerError> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, venue, starts_at, \
             ends_at, status, max_participants, is_team_event, max_team_size, \
             current_participants, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.status.as_str())
        .bind(event.max_participants.map(int4))
        .bind(event.is_team_event)
        .bind(int4(event.max_team_size))
        .bind(int4(event.current_participants))
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn event(&self, id: EventId) -> Result<Event, ServerError> {
        let query = format!("SELECT {EVENT_COLS} FROM events WHERE id = $1");
        let row = sqlx::query_as::<_, EventRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(ServerError::EventNotFound(id))?;
        event_from_row(row)
    }

    async fn events_by_status(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, ServerError> {
        let rows = if let Some(status) = status {
            let query =
                format!("SELECT {EVENT_COLS} FROM events WHERE status = $1 ORDER BY starts_at ASC");
            sqlx::query_as::<_, EventRow>(&query)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
        } else {
            let query = format!("SELECT {EVENT_COLS} FROM events ORDER BY starts_at ASC");
            sqlx::query_as::<_, EventRow>(&query).fetch_all(&self.pool).await
        }
        .map_err(pg_err)?;
        rows.into_iter().map(event_from_row).collect()
    }

    async fn events_by_organizer(&self, id: OrganizerId) -> Result<Vec<Event>, ServerError> {
        let query =
            format!("SELECT {EVENT_COLS} FROM events WHERE organizer_id = $1 ORDER BY created_at ASC");
        let rows = sqlx::query_as::<_, EventRow>(&query)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(pg_err)?;
        rows.into_iter().map(event_from_row).collect()
    }

    async fn set_event_status(
        &self,
        id: EventId,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<Event, ServerError> {
        let query = format!(
            "UPDATE events SET status = $3, updated_at = now() \
             WHERE id = $1 AND status = $2 RETURNING {EVENT_COLS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&query)
            .bind(id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        match row {
            Some(row) => event_from_row(row),
            None => {
                let current = self.event(id).await?;
                Err(ServerError::StateConflict(format!(
                    "event is {} (expected {from})",
                    current.status
                )))
            }
        }
    }

    async fn insert_pass_type(&self, pass: PassType) -> Result<(), ServerError> {
        sqlx::query(
            "INSERT INTO pass_types (id, event_id, name, price, quantity, sold, is_active, \
             sale_start, sale_end, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(pass.id.as_uuid())
        .bind(pass.event_id.as_uuid())
        .bind(&pass.name)
        .bind(int4(pass.price))
        .bind(pass.quantity.map(int4))
        .bind(int4(pass.sold))
        .bind(pass.is_active)
        .bind(pass.sale_start)
        .bind(pass.sale_end)
        .bind(pass.created_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn pass_type(&self, id: PassTypeId) -> Result<PassType, ServerError> {
        let query = format!("SELECT {PASS_COLS} FROM pass_types WHERE id = $1");
        let row = sqlx::query_as::<_, PassTypeRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(ServerError::PassTypeNotFound(id))?;
        Ok(pass_from_row(row))
    }

    async fn pass_types_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<PassType>, ServerError> {
        let query =
            format!("SELECT {PASS_COLS} FROM pass_types WHERE event_id = $1 ORDER BY created_at ASC");
        let rows = sqlx::query_as::<_, PassTypeRow>(&query)
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(rows.into_iter().map(pass_from_row).collect())
    }

    async fn insert_registration(&self, registration: Registration) -> Result<(), ServerError> {
        let roster = serde_json::to_value(&registration.team_members)
            .map_err(|e| ServerError::Internal(format!("roster serialization: {e}")))?;
        sqlx::query(
            "INSERT INTO registrations (id, event_id, pass_type_id, user_id, status, team_name, \
             team_members, payment_order_id, payment_reference, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(registration.id.as_uuid())
        .bind(registration.event_id.as_uuid())
        .bind(registration.pass_type_id.as_uuid())
        .bind(registration.user_id.as_uuid())
        .bind(registration.status.as_str())
        .bind(&registration.team_name)
        .bind(roster)
        .bind(&registration.payment_order_id)
        .bind(&registration.payment_reference)
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn registration(&self, id: RegistrationId) -> Result<Registration, ServerError> {
        let query = format!("SELECT {REGISTRATION_COLS} FROM registrations WHERE id = $1");
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(ServerError::RegistrationNotFound(id))?;
        registration_from_row(row)
    }

    async fn set_registration_order(
        &self,
        id: RegistrationId,
        order_id: &str,
    ) -> Result<Registration, ServerError> {
        let query = format!(
            "UPDATE registrations SET payment_order_id = $2, updated_at = now() \
             WHERE id = $1 AND status = 'pending' RETURNING {REGISTRATION_COLS}"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(id.as_uuid())
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        match row {
            Some(row) => registration_from_row(row),
            None => {
                let current = self.registration(id).await?;
                Err(ServerError::StateConflict(format!(
                    "registration is {}",
                    current.status
                )))
            }
        }
    }

    async fn cancel_registration(&self, id: RegistrationId) -> Result<Registration, ServerError> {
        let query = format!(
            "UPDATE registrations SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status = 'pending' RETURNING {REGISTRATION_COLS}"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        match row {
            Some(row) => registration_from_row(row),
            None => {
                let current = self.registration(id).await?;
                Err(ServerError::StateConflict(format!(
                    "registration is {}",
                    current.status
                )))
            }
        }
    }

    async fn confirm_and_issue(
        &self,
        registration_id: RegistrationId,
        payment_reference: Option<String>,
        ticket: Ticket,
    ) -> Result<Ticket, ServerError> {
        let mut tx = self.pool.begin().await.map_err(pg_err)?;

        let query =
            format!("SELECT {REGISTRATION_COLS} FROM registrations WHERE id = $1 FOR UPDATE");
        let registration = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(registration_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(pg_err)?
            .ok_or(ServerError::RegistrationNotFound(registration_id))
            .and_then(registration_from_row)?;
        if registration.status != RegistrationStatus::Pending {
            return Err(ServerError::StateConflict(format!(
                "registration is {}",
                registration.status
            )));
        }

        let query = format!("SELECT {PASS_COLS} FROM pass_types WHERE id = $1 FOR UPDATE");
        let pass = sqlx::query_as::<_, PassTypeRow>(&query)
            .bind(registration.pass_type_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(pg_err)?
            .map(pass_from_row)
            .ok_or(ServerError::PassTypeNotFound(registration.pass_type_id))?;
        if pass.is_sold_out() {
            return Err(ServerError::SoldOut);
        }

        let query = format!("SELECT {EVENT_COLS} FROM events WHERE id = $1 FOR UPDATE");
        let event = sqlx::query_as::<_, EventRow>(&query)
            .bind(registration.event_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(pg_err)?
            .ok_or(ServerError::EventNotFound(registration.event_id))
            .and_then(event_from_row)?;
        if event.is_full() {
            return Err(ServerError::EventFull);
        }

        sqlx::query("UPDATE pass_types SET sold = sold + 1 WHERE id = $1")
            .bind(pass.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(pg_err)?;
        sqlx::query(
            "UPDATE events SET current_participants = current_participants + 1, \
             updated_at = now() WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(pg_err)?;
        sqlx::query(
            "UPDATE registrations SET status = 'confirmed', payment_reference = $2, \
             updated_at = now() WHERE id = $1",
        )
        .bind(registration_id.as_uuid())
        .bind(&payment_reference)
        .execute(&mut *tx)
        .await
        .map_err(pg_err)?;

        // The unique index on (registration_id, pass_type_id) is the final
        // backstop for the one-ticket invariant.
        sqlx::query(
            "INSERT INTO tickets (id, ticket_token, event_id, user_id, registration_id, \
             pass_type_id, status, scanned_at, scanned_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(ticket.id.as_uuid())
        .bind(ticket.ticket_token.as_uuid())
        .bind(ticket.event_id.as_uuid())
        .bind(ticket.user_id.as_uuid())
        .bind(ticket.registration_id.as_uuid())
        .bind(ticket.pass_type_id.as_uuid())
        .bind(ticket.status.as_str())
        .bind(ticket.scanned_at)
        .bind(ticket.scanned_by.map(|id| *id.as_uuid()))
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServerError::StateConflict(
                    "a ticket already exists for this registration".to_string(),
                )
            } else {
                pg_err(e)
            }
        })?;

        tx.commit().await.map_err(pg_err)?;
        Ok(ticket)
    }

    async fn ticket(&self, id: TicketId) -> Result<Ticket, ServerError> {
        let query = format!("SELECT {TICKET_COLS} FROM tickets WHERE id = $1");
        let row = sqlx::query_as::<_, TicketRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(ServerError::TicketNotFound(id))?;
        ticket_from_row(row)
    }

    async fn tickets_for_user(&self, user_id: ProfileId) -> Result<Vec<Ticket>, ServerError> {
        let query =
            format!("SELECT {TICKET_COLS} FROM tickets WHERE user_id = $1 ORDER BY created_at ASC");
        let rows = sqlx::query_as::<_, TicketRow>(&query)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(pg_err)?;
        rows.into_iter().map(ticket_from_row).collect()
    }

    async fn check_in(
        &self,
        token: TicketToken,
        scanner: ProfileId,
        at: DateTime<Utc>,
    ) -> Result<CheckInWrite, ServerError> {
        let query = format!(
            "UPDATE tickets SET status = 'used', scanned_at = $2, scanned_by = $3, \
             updated_at = $2 WHERE ticket_token = $1 AND status = 'active' \
             RETURNING {TICKET_COLS}"
        );
        let won = sqlx::query_as::<_, TicketRow>(&query)
            .bind(token.as_uuid())
            .bind(at)
            .bind(scanner.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        if let Some(row) = won {
            return Ok(CheckInWrite::CheckedIn(ticket_from_row(row)?));
        }

        // CAS missed: either the token is unknown or another scanner (or a
        // cancellation) got there first. Re-read and report.
        let query = format!("SELECT {TICKET_COLS} FROM tickets WHERE ticket_token = $1");
        let row = sqlx::query_as::<_, TicketRow>(&query)
            .bind(token.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        match row {
            None => Ok(CheckInWrite::NotFound),
            Some(row) => {
                let ticket = ticket_from_row(row)?;
                match ticket.status {
                    TicketStatus::Used => Ok(CheckInWrite::AlreadyUsed(ticket)),
                    _ => Ok(CheckInWrite::NotScannable(ticket)),
                }
            }
        }
    }

    async fn cancel_ticket(&self, id: TicketId) -> Result<Ticket, ServerError> {
        let query = format!(
            "UPDATE tickets SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status = 'active' RETURNING {TICKET_COLS}"
        );
        let row = sqlx::query_as::<_, TicketRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        match row {
            Some(row) => ticket_from_row(row),
            None => {
                let current = self.ticket(id).await?;
                Err(ServerError::StateConflict(format!(
                    "ticket is {}",
                    current.status
                )))
            }
        }
    }

    async fn attendance(&self, event_id: EventId) -> Result<AttendanceSummary, ServerError> {
        let row = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*), \
             COUNT(*) FILTER (WHERE status = 'used'), \
             COUNT(*) FILTER (WHERE status = 'cancelled') \
             FROM tickets WHERE event_id = $1",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;
        let (issued, checked_in, cancelled) = row;
        Ok(AttendanceSummary {
            issued: u32::try_from(issued).unwrap_or(0),
            checked_in: u32::try_from(checked_in).unwrap_or(0),
            cancelled: u32::try_from(cancelled).unwrap_or(0),
        })
    }
}
