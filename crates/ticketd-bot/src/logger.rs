//! Guild event log.
//!
//! Posts per-event embeds to the configured log channel. Every event is
//! also emitted as a structured tracing record regardless of the guild
//! logging toggles; that stream feeds the external dashboard.

use std::sync::Arc;

use tracing::{info, warn};

use ticketd_core::ConfigProvider;
use ticketd_core::config::parse_color;

use crate::platform::{Embed, OutboundMessage, Platform};

pub const EVENT_TICKET_CREATE: &str = "ticket_create";
pub const EVENT_TICKET_CLOSE: &str = "ticket_close";
pub const EVENT_TICKET_CLAIM: &str = "ticket_claim";
pub const EVENT_TICKET_UNCLAIM: &str = "ticket_unclaim";
pub const EVENT_USER_ADD: &str = "user_add";
pub const EVENT_USER_REMOVE: &str = "user_remove";
pub const EVENT_TICKET_RENAME: &str = "ticket_rename";

#[derive(Clone)]
pub struct EventLogger {
    config: Arc<ConfigProvider>,
    platform: Arc<dyn Platform>,
}

impl EventLogger {
    pub fn new(config: Arc<ConfigProvider>, platform: Arc<dyn Platform>) -> Self {
        Self { config, platform }
    }

    /// Record an event: structured log always, guild embed when enabled.
    ///
    /// Delivery failures are swallowed; the event log must never break the
    /// operation that produced the event.
    pub async fn log(&self, event: &str, ticket_number: i64, actor: &str, detail: &str) {
        info!(event, ticket = ticket_number, actor, detail, "Ticket event");

        let logging = self.config.logging();
        if !logging.enabled {
            return;
        }
        if !logging.events.get(event).copied().unwrap_or(true) {
            return;
        }
        let Some(channel_id) = logging.channel_id else {
            return;
        };

        let embed = Embed {
            title: Some(self.config.message("log", event, &[])),
            description: Some(format!(
                "Ticket **#{ticket_number:04}** — <@{actor}>\n{detail}"
            )),
            color: Some(parse_color(&self.config.colors().info)),
            footer: self.config.footer(),
            ..Embed::default()
        };

        if let Err(e) = self
            .platform
            .send_message(&channel_id, OutboundMessage::embed(embed))
            .await
        {
            warn!(event, error = %e, "Failed to deliver event log message");
        }
    }
}
