//! `ticketd` Core Library
//!
//! Shared functionality for `ticketd` components:
//! - Configuration document, validation and pure lookups
//! - Business-hours evaluation
//! - `SQLite` pool helpers and common database error type
//! - Tracing initialisation

pub mod config;
pub mod db;
pub mod error;
pub mod hours;
pub mod tracing_init;

pub use config::{BotConfig, ConfigProvider};
pub use error::{Error, Result};
pub use hours::BusinessHours;
