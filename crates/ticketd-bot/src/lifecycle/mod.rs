//! Ticket lifecycle: state machine, manager operations, and message views.

mod manager;
mod state;
pub mod views;


pub use manager::TicketManager;
pub use state::TicketState;
