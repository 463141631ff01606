//! Data models for ticket storage.
//!
//! All timestamps are unix milliseconds. Platform identifiers (guild,
//! channel, user, role) are opaque snowflake strings.

use serde::{Deserialize, Serialize};

/// Ticket row status values.
pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";

/// Alert row status values.
pub const ALERT_PENDING: &str = "pending";
pub const ALERT_EXECUTED: &str = "executed";
pub const ALERT_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: i64,
    /// Per-guild monotonic number; survives closure, never reused.
    pub ticket_number: i64,
    /// NULL until the platform channel has been created.
    pub channel_id: Option<String>,
    pub guild_id: String,
    pub user_id: String,
    pub category_id: String,
    pub status: String,
    pub claimed_by: Option<String>,
    pub created_at: i64,
    pub closed_at: Option<i64>,
    pub closed_by: Option<String>,
    pub close_reason: Option<String>,
    pub last_message_at: i64,
}

impl Ticket {
    pub fn is_open(&self) -> bool {
        self.status == STATUS_OPEN
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketMember {
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: String,
    pub added_by: String,
    pub added_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketResponse {
    pub id: i64,
    pub ticket_id: i64,
    pub question: String,
    pub answer: String,
}

/// An intake answer as submitted, before it has a row.
#[derive(Debug, Clone)]
pub struct TicketAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketRating {
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketAlert {
    pub id: i64,
    pub ticket_id: i64,
    pub alerted_by: String,
    pub reason: Option<String>,
    pub duration_minutes: i64,
    pub expires_at: i64,
    pub status: String,
    pub created_at: i64,
}

/// A pending alert past its deadline, joined with its (still open) ticket.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExpiredAlert {
    pub id: i64,
    pub ticket_id: i64,
    pub alerted_by: String,
    pub reason: Option<String>,
    pub duration_minutes: i64,
    pub expires_at: i64,
    pub created_at: i64,
    pub channel_id: Option<String>,
    pub guild_id: String,
    pub owner_id: String,
    pub ticket_number: i64,
}

/// Outcome of inserting a ticket member.
#[derive(Debug, Clone)]
pub enum MemberInsert {
    Added(TicketMember),
    AlreadyMember,
}

/// Outcome of saving a ticket rating.
#[derive(Debug, Clone)]
pub enum RatingInsert {
    Saved(TicketRating),
    AlreadyRated,
}

/// Aggregate rating figures across all tickets.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub total: i64,
}
