//! SQLite storage for the ticket service.
//!
//! Persists tickets, members, intake responses, cooldowns, ratings, and
//! inactivity alerts.

mod db;
mod models;
mod queries;


pub use db::TicketDatabase;
pub use models::*;

pub use ticketd_core::db::DatabaseError;
