//! Message-activity observer.
//!
//! Bumps the ticket's activity timestamp on every human message in a ticket
//! channel, and cancels a pending inactivity alert when the ticket owner
//! responds.

use std::time::Duration;

use tracing::{debug, info, warn};

use ticketd_core::config::parse_color;

use crate::lifecycle::TicketManager;
use crate::platform::{Embed, OutboundMessage, UserRef};

/// How long the alert-cancelled confirmation stays up.
const CONFIRM_TTL: Duration = Duration::from_secs(10);

/// A guild message as far as activity tracking cares.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub guild_id: String,
    pub channel_id: String,
    pub author: UserRef,
}

#[derive(Clone)]
pub struct ActivityObserver {
    manager: TicketManager,
}

impl ActivityObserver {
    pub const fn new(manager: TicketManager) -> Self {
        Self { manager }
    }

    /// Handle one message. Never fails the gateway: problems are logged.
    pub async fn on_message(&self, event: &MessageEvent) {
        if event.author.is_bot {
            return;
        }

        let ticket = match self.manager.db().get_ticket_by_channel(&event.channel_id).await {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return,
            Err(e) => {
                warn!(channel = %event.channel_id, error = %e, "Activity lookup failed");
                return;
            }
        };

        if let Err(e) = self.manager.db().update_last_message(&event.channel_id).await {
            warn!(ticket = ticket.ticket_number, error = %e, "Activity bump failed");
        }

        if event.author.id != ticket.user_id {
            return;
        }

        match self.manager.db().cancel_alert_on_response(ticket.id).await {
            Ok(0) => {}
            Ok(_) => {
                info!(ticket = ticket.ticket_number, "Alert cancelled by owner response");
                self.post_cancellation_notice(&event.channel_id).await;
            }
            Err(e) => {
                warn!(ticket = ticket.ticket_number, error = %e, "Alert cancellation failed");
            }
        }
    }

    /// Transient confirmation that removes itself after a few seconds.
    async fn post_cancellation_notice(&self, channel_id: &str) {
        let config = self.manager.config();
        let notice = OutboundMessage::embed(Embed {
            description: Some(config.message("alert", "cancelled", &[])),
            color: Some(parse_color(&config.colors().success)),
            ..Embed::default()
        });

        let message_id = match self.manager.platform().send_message(channel_id, notice).await {
            Ok(id) => id,
            Err(e) => {
                debug!(channel = channel_id, error = %e, "Cancellation notice not sent");
                return;
            }
        };

        let platform = std::sync::Arc::clone(self.manager.platform());
        let channel_id = channel_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(CONFIRM_TTL).await;
            if let Err(e) = platform.delete_message(&channel_id, &message_id).await {
                debug!(error = %e, "Cancellation notice not removed");
            }
        });
    }
}
