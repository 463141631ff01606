//! Ticketd Bot Library
//!
//! Core functionality for the ticket bot:
//! - Ticket lifecycle (create, claim, close, membership, ratings)
//! - SQLite storage for tickets, responses, cooldowns, ratings, and alerts
//! - Interaction routing for buttons, select menus, modals, and commands
//! - Inactivity alert sweeper and panel refresher background tasks
//! - Chat platform abstraction with an in-memory fake for tests

pub mod activity;
pub mod alerts;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod panels;
pub mod platform;
pub mod router;
pub mod service;
pub mod storage;

pub use error::TicketError;
pub use lifecycle::TicketManager;
pub use router::InteractionRouter;
pub use service::BotService;
