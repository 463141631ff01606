//! Ticket operation errors.
//!
//! Splits user-facing rejections (business rules, validation) from
//! infrastructure failures. The router logs internal errors with full detail
//! and shows the user a generic reply; rejections map to the configured
//! message templates via [`TicketError::user_message`].

use ticketd_core::ConfigProvider;
use ticketd_core::db::DatabaseError;

use crate::platform::PlatformError;

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Cooldown active, {remaining_ms}ms remaining")]
    CooldownActive { remaining_ms: i64 },

    #[error("Open ticket limit reached ({limit})")]
    MemberLimitReached { limit: u32 },

    #[error("Category is full ({limit})")]
    CategoryFull { limit: u32 },

    #[error("Channel is not a ticket")]
    NotATicket,

    #[error("Ticket is already closed")]
    AlreadyClosed,

    #[error("Ticket is already claimed by {by}")]
    AlreadyClaimed { by: String },

    #[error("Ticket is not claimed")]
    NotClaimed,

    #[error("Ticket is claimed by {by}")]
    ClaimedByOther { by: String },

    #[error("User is already a member")]
    AlreadyMember,

    #[error("User is not a member")]
    NotAMember,

    #[error("The ticket owner cannot be removed")]
    OwnerNotRemovable,

    #[error("An alert is already pending, {remaining_minutes}min remaining")]
    AlertPending { remaining_minutes: i64 },

    #[error("Ticket has already been rated")]
    AlreadyRated,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("Missing permission for {0}")]
    PermissionDenied(&'static str),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("Database error: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl TicketError {
    /// Infrastructure failures get logged and answered generically; the
    /// rest are shown to the user as-is.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Platform(_))
    }

    /// Resolve the configured user-facing text for this error.
    pub fn user_message(&self, config: &ConfigProvider) -> String {
        match self {
            Self::UnknownCategory(id) => {
                config.message("errors", "unknownCategory", &[("category", id)])
            }
            Self::CooldownActive { remaining_ms } => config.message(
                "errors",
                "cooldownActive",
                &[("time", &human_duration(*remaining_ms))],
            ),
            Self::MemberLimitReached { limit } => config.message(
                "errors",
                "memberLimit",
                &[("limit", &limit.to_string())],
            ),
            Self::CategoryFull { limit } => {
                config.message("errors", "categoryFull", &[("limit", &limit.to_string())])
            }
            Self::NotATicket => config.message("errors", "notATicket", &[]),
            Self::AlreadyClosed => config.message("errors", "alreadyClosed", &[]),
            Self::AlreadyClaimed { by } => {
                config.message("errors", "alreadyClaimed", &[("user", by)])
            }
            Self::NotClaimed => config.message("errors", "notClaimed", &[]),
            Self::ClaimedByOther { by } => {
                config.message("errors", "claimedByOther", &[("user", by)])
            }
            Self::AlreadyMember => config.message("errors", "alreadyMember", &[]),
            Self::NotAMember => config.message("errors", "notAMember", &[]),
            Self::OwnerNotRemovable => config.message("errors", "ownerNotRemovable", &[]),
            Self::AlertPending { remaining_minutes } => config.message(
                "errors",
                "alertPending",
                &[("time", &format!("{remaining_minutes}min"))],
            ),
            Self::AlreadyRated => config.message("errors", "alreadyRated", &[]),
            Self::InvalidRating => config.message("errors", "invalidRating", &[]),
            Self::PermissionDenied(_) => config.message("errors", "permissionDenied", &[]),
            Self::NotImplemented(_) => config.message("errors", "notImplemented", &[]),
            Self::Persistence(_) | Self::Platform(_) => {
                config.message("errors", "internal", &[])
            }
        }
    }
}

/// Render a millisecond duration as `2h 5m`, `45s`, etc.
pub fn human_duration(ms: i64) -> String {
    let total_seconds = (ms.max(0) + 999) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
