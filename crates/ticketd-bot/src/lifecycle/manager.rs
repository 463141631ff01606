//! Ticket lifecycle operations.

use std::sync::Arc;

use tracing::{info, warn};

use ticketd_core::ConfigProvider;
use ticketd_core::config::{CategoryConfig, parse_color};
use ticketd_core::db::now_ms;

use crate::error::TicketError;
use crate::logger::{
    EVENT_TICKET_CLAIM, EVENT_TICKET_CLOSE, EVENT_TICKET_CREATE, EVENT_TICKET_RENAME,
    EVENT_TICKET_UNCLAIM, EVENT_USER_ADD, EVENT_USER_REMOVE, EventLogger,
};
use crate::platform::{
    CreateChannelRequest, Embed, OutboundMessage, OverwriteTarget, Permission,
    PermissionOverwrite, Platform, PlatformError, TranscriptSink, UserRef,
};
use crate::storage::{MemberInsert, Ticket, TicketAnswer, TicketDatabase};

use super::state::TicketState;
use super::views;

/// Permissions granted to ticket participants.
const PARTICIPANT_PERMS: [Permission; 5] = [
    Permission::ViewChannel,
    Permission::SendMessages,
    Permission::ReadMessageHistory,
    Permission::AttachFiles,
    Permission::EmbedLinks,
];

#[derive(Clone)]
pub struct TicketManager {
    db: TicketDatabase,
    config: Arc<ConfigProvider>,
    platform: Arc<dyn Platform>,
    logger: EventLogger,
    transcripts: Option<Arc<dyn TranscriptSink>>,
}

impl TicketManager {
    pub fn new(
        db: TicketDatabase,
        config: Arc<ConfigProvider>,
        platform: Arc<dyn Platform>,
        transcripts: Option<Arc<dyn TranscriptSink>>,
    ) -> Self {
        let logger = EventLogger::new(Arc::clone(&config), Arc::clone(&platform));
        Self {
            db,
            config,
            platform,
            logger,
            transcripts,
        }
    }

    pub const fn db(&self) -> &TicketDatabase {
        &self.db
    }

    pub fn config(&self) -> &ConfigProvider {
        &self.config
    }

    pub fn config_handle(&self) -> Arc<ConfigProvider> {
        Arc::clone(&self.config)
    }

    pub const fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Resolve the ticket behind a channel, or reject.
    pub async fn ticket_for_channel(&self, channel_id: &str) -> Result<Ticket, TicketError> {
        self.db
            .get_ticket_by_channel(channel_id)
            .await?
            .ok_or(TicketError::NotATicket)
    }

    /// Open a ticket: validate, persist, create the channel, post the
    /// opening message.
    ///
    /// When the platform channel cannot be created the fresh row is removed
    /// again, so no ticket ever points at a channel that does not exist.
    pub async fn create(
        &self,
        guild_id: &str,
        user: &UserRef,
        category_id: &str,
        answers: Vec<TicketAnswer>,
    ) -> Result<Ticket, TicketError> {
        let category = self
            .config
            .category(category_id)
            .ok_or_else(|| TicketError::UnknownCategory(category_id.to_string()))?;

        let remaining_ms = self.db.check_cooldown(&user.id, category_id).await?;
        if remaining_ms > 0 {
            return Err(TicketError::CooldownActive { remaining_ms });
        }

        let open = self.db.get_user_open_tickets(&user.id, category_id).await?;
        if open.len() >= category.member_limit as usize {
            return Err(TicketError::MemberLimitReached {
                limit: category.member_limit,
            });
        }

        let total = self.db.get_category_open_tickets(category_id).await?;
        if total.len() >= category.total_limit as usize {
            return Err(TicketError::CategoryFull {
                limit: category.total_limit,
            });
        }

        let ticket = self.db.create_ticket(guild_id, &user.id, category_id).await?;

        let channel_id = match self
            .create_ticket_channel(guild_id, &category, &ticket, user)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Roll the row back so the number sequence is all that remains.
                if let Err(del) = self.db.delete_ticket(ticket.id).await {
                    warn!(ticket = ticket.id, error = %del, "Rollback after channel failure failed");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.db.set_ticket_channel(ticket.id, &channel_id).await {
            if let Err(del) = self.db.delete_ticket(ticket.id).await {
                warn!(ticket = ticket.id, error = %del, "Rollback after channel failure failed");
            }
            let _ = self.platform.delete_channel(&channel_id).await;
            return Err(e.into());
        }

        if !answers.is_empty() {
            self.db.save_ticket_responses(ticket.id, &answers).await?;
        }

        let ticket = self
            .db
            .get_ticket_by_id(ticket.id)
            .await?
            .ok_or(TicketError::NotATicket)?;

        let opening = views::opening_message(&self.config, &category, &ticket, user, &answers);
        if let Err(e) = self.platform.send_message(&channel_id, opening).await {
            warn!(ticket = ticket.id, error = %e, "Failed to post opening message");
        }

        let hours = self.config.check_business_hours();
        if !hours.is_open
            && let Some(notice) = views::outside_hours_notice(&self.config, &hours, user)
            && let Err(e) = self.platform.send_message(&channel_id, notice).await
        {
            warn!(ticket = ticket.id, error = %e, "Failed to post business-hours notice");
        }

        if let Some(cooldown_ms) = category.cooldown {
            self.db.set_cooldown(&user.id, category_id, cooldown_ms).await?;
        }

        info!(
            ticket = ticket.ticket_number,
            guild = guild_id,
            category = category_id,
            user = %user.id,
            "Ticket created"
        );
        self.logger
            .log(EVENT_TICKET_CREATE, ticket.ticket_number, &user.id, &category.name)
            .await;

        Ok(ticket)
    }

    async fn create_ticket_channel(
        &self,
        guild_id: &str,
        category: &CategoryConfig,
        ticket: &Ticket,
        user: &UserRef,
    ) -> Result<String, PlatformError> {
        // The guild's default role shares the guild's id.
        let mut overwrites = vec![
            PermissionOverwrite {
                target: OverwriteTarget::Role(guild_id.to_string()),
                allow: Vec::new(),
                deny: vec![Permission::ViewChannel],
            },
            PermissionOverwrite {
                target: OverwriteTarget::Member(user.id.clone()),
                allow: PARTICIPANT_PERMS.to_vec(),
                deny: Vec::new(),
            },
            PermissionOverwrite {
                target: OverwriteTarget::Member(self.platform.bot_user_id()),
                allow: vec![
                    Permission::ViewChannel,
                    Permission::SendMessages,
                    Permission::ReadMessageHistory,
                    Permission::ManageChannels,
                    Permission::ManageMessages,
                ],
                deny: Vec::new(),
            },
        ];
        for role in &category.staff_roles {
            overwrites.push(PermissionOverwrite {
                target: OverwriteTarget::Role(role.clone()),
                allow: PARTICIPANT_PERMS.to_vec(),
                deny: Vec::new(),
            });
        }

        self.platform
            .create_channel(CreateChannelRequest {
                guild_id: guild_id.to_string(),
                name: views::channel_name(category, ticket.ticket_number, user),
                parent_id: category.discord_category.clone(),
                topic: Some(format!("Ticket #{:04} | <@{}>", ticket.ticket_number, user.id)),
                overwrites,
            })
            .await
    }

    /// Close a ticket. The channel is deleted last; everything that needs
    /// the channel (transcript) runs first.
    pub async fn close(
        &self,
        channel_id: &str,
        closer: &UserRef,
        reason: Option<String>,
    ) -> Result<Ticket, TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        TicketState::of(&ticket).check_close()?;

        if self.config.transcripts().enabled
            && let Some(sink) = &self.transcripts
            && let Err(e) = sink.deliver(channel_id, ticket.ticket_number).await
        {
            warn!(ticket = ticket.ticket_number, error = %e, "Transcript delivery failed");
        }

        // Racing closers serialize here.
        if !self
            .db
            .close_ticket(channel_id, &closer.id, reason.as_deref())
            .await?
        {
            return Err(TicketError::AlreadyClosed);
        }

        info!(
            ticket = ticket.ticket_number,
            closer = %closer.id,
            reason = reason.as_deref().unwrap_or("-"),
            "Ticket closed"
        );
        self.logger
            .log(
                EVENT_TICKET_CLOSE,
                ticket.ticket_number,
                &closer.id,
                reason.as_deref().unwrap_or(""),
            )
            .await;

        if self.config.ratings().enabled {
            self.send_rating_request(&ticket).await;
        }

        match self.platform.delete_channel(channel_id).await {
            Ok(()) => {}
            Err(PlatformError::NotFound(_)) => {}
            Err(e) => {
                warn!(ticket = ticket.ticket_number, error = %e, "Failed to delete ticket channel");
            }
        }

        self.db
            .get_ticket_by_id(ticket.id)
            .await?
            .ok_or(TicketError::NotATicket)
    }

    async fn send_rating_request(&self, ticket: &Ticket) {
        let category_name = self
            .config
            .category(&ticket.category_id)
            .map_or_else(|| ticket.category_id.clone(), |c| c.name);
        let request = views::rating_request(&self.config, ticket, &category_name);
        if let Err(e) = self.platform.send_dm(&ticket.user_id, request).await {
            warn!(ticket = ticket.ticket_number, error = %e, "Failed to send rating request");
        }
    }

    pub async fn claim(&self, channel_id: &str, staff: &UserRef) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        TicketState::of(&ticket).check_claim()?;

        if !self.db.claim_ticket(channel_id, &staff.id).await? {
            // Lost the race; report whoever won.
            let current = self.ticket_for_channel(channel_id).await?;
            return Err(TicketError::AlreadyClaimed {
                by: current.claimed_by.unwrap_or_default(),
            });
        }

        self.refresh_controls(channel_id, true).await;
        self.logger
            .log(EVENT_TICKET_CLAIM, ticket.ticket_number, &staff.id, "")
            .await;
        Ok(())
    }

    pub async fn unclaim(
        &self,
        channel_id: &str,
        staff: &UserRef,
        is_admin: bool,
    ) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        TicketState::of(&ticket).check_unclaim(&staff.id, is_admin)?;

        if !self.db.unclaim_ticket(channel_id).await? {
            return Err(TicketError::NotClaimed);
        }

        self.refresh_controls(channel_id, false).await;
        self.logger
            .log(EVENT_TICKET_UNCLAIM, ticket.ticket_number, &staff.id, "")
            .await;
        Ok(())
    }

    /// Swap the claim/release button on the control message, best-effort.
    async fn refresh_controls(&self, channel_id: &str, claimed: bool) {
        let bot_id = self.platform.bot_user_id();
        let messages = match self.platform.fetch_recent_messages(channel_id, 10).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(channel = channel_id, error = %e, "Failed to fetch control message");
                return;
            }
        };
        let Some(control) = messages
            .iter()
            .find(|m| m.author_id == bot_id && m.has_components)
        else {
            return;
        };
        if let Err(e) = self
            .platform
            .edit_message_components(channel_id, &control.id, views::control_rows(claimed))
            .await
        {
            warn!(channel = channel_id, error = %e, "Failed to refresh control buttons");
        }
    }

    pub async fn add_user(
        &self,
        channel_id: &str,
        user_id: &str,
        added_by: &UserRef,
    ) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        TicketState::of(&ticket).ensure_open()?;

        if self.db.is_ticket_member(ticket.id, user_id).await? {
            return Err(TicketError::AlreadyMember);
        }

        self.platform
            .grant_channel_access(channel_id, user_id, PARTICIPANT_PERMS.to_vec())
            .await?;

        if let MemberInsert::AlreadyMember = self
            .db
            .add_ticket_member(ticket.id, user_id, &added_by.id)
            .await?
        {
            return Err(TicketError::AlreadyMember);
        }

        self.logger
            .log(EVENT_USER_ADD, ticket.ticket_number, &added_by.id, user_id)
            .await;
        Ok(())
    }

    pub async fn remove_user(
        &self,
        channel_id: &str,
        user_id: &str,
        removed_by: &UserRef,
    ) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        TicketState::of(&ticket).ensure_open()?;

        if user_id == ticket.user_id {
            return Err(TicketError::OwnerNotRemovable);
        }
        if !self.db.is_ticket_member(ticket.id, user_id).await? {
            return Err(TicketError::NotAMember);
        }

        self.platform
            .revoke_channel_access(channel_id, user_id)
            .await?;
        self.db.remove_ticket_member(ticket.id, user_id).await?;

        self.logger
            .log(EVENT_USER_REMOVE, ticket.ticket_number, &removed_by.id, user_id)
            .await;
        Ok(())
    }

    pub async fn rename(
        &self,
        channel_id: &str,
        new_name: &str,
        renamed_by: &UserRef,
    ) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;

        self.platform.rename_channel(channel_id, new_name).await?;

        self.logger
            .log(EVENT_TICKET_RENAME, ticket.ticket_number, &renamed_by.id, new_name)
            .await;
        Ok(())
    }

    /// Arm an inactivity alert and post the warning embed.
    pub async fn alert(
        &self,
        channel_id: &str,
        raised_by: &UserRef,
        duration_minutes: Option<i64>,
        reason: Option<String>,
    ) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        TicketState::of(&ticket).ensure_open()?;

        if let Some(pending) = self.db.get_ticket_alert(ticket.id).await? {
            let remaining_minutes = ((pending.expires_at - now_ms()) / 60_000).max(0);
            return Err(TicketError::AlertPending { remaining_minutes });
        }

        let alerts = self.config.alerts();
        let minutes = duration_minutes.unwrap_or(alerts.default_time);
        self.db
            .set_ticket_alert(ticket.id, &raised_by.id, minutes, reason.as_deref())
            .await?;

        let text = alerts
            .alert_message
            .unwrap_or_else(|| self.config.message("alert", "warning", &[]))
            .replace("{user}", &format!("<@{}>", ticket.user_id))
            .replace("{time}", &format!("{minutes}min"));
        let notice = OutboundMessage {
            content: Some(format!("<@{}>", ticket.user_id)),
            embeds: vec![Embed {
                description: Some(text),
                color: Some(parse_color(&self.config.colors().warning)),
                ..Embed::default()
            }],
            ..OutboundMessage::default()
        };
        if let Err(e) = self.platform.send_message(channel_id, notice).await {
            warn!(ticket = ticket.ticket_number, error = %e, "Failed to post alert notice");
        }

        Ok(())
    }

    /// Deliver a transcript on demand (the transcript button).
    pub async fn transcript(&self, channel_id: &str) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        if !self.config.transcripts().enabled {
            return Err(TicketError::NotImplemented("transcripts"));
        }
        let Some(sink) = &self.transcripts else {
            return Err(TicketError::NotImplemented("transcripts"));
        };
        sink.deliver(channel_id, ticket.ticket_number).await?;
        Ok(())
    }

    /// Reopening closed tickets is not supported.
    pub async fn reopen(&self, channel_id: &str) -> Result<(), TicketError> {
        let ticket = self.ticket_for_channel(channel_id).await?;
        TicketState::of(&ticket).check_reopen()
    }
}
