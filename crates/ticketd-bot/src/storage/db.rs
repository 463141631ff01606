//! SQLite database handle for the ticket service.

ticketd_core::define_database!(TicketDatabase, "Ticket database migrations complete");
