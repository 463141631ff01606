//! Interaction routing.
//!
//! Stateless dispatch from normalized interactions (buttons, select menus,
//! modal submissions, slash commands) to lifecycle operations. The error
//! boundary lives here: internal failures are logged and answered with the
//! generic template, rejections become ephemeral error embeds, and nothing
//! is sent when the interaction was already acknowledged and no
//! acknowledgement path remains.

mod custom_id;


pub use custom_id::CustomId;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use ticketd_core::ConfigProvider;
use ticketd_core::config::{CategoryConfig, parse_color};

use crate::error::TicketError;
use crate::lifecycle::{TicketManager, views};
use crate::platform::{
    Command, Embed, Interaction, InteractionResponder, OutboundMessage, Payload, Platform,
};
use crate::storage::{RatingInsert, TicketAnswer};

/// How long the cancelled-close notice stays up.
const CANCEL_NOTICE_TTL: Duration = Duration::from_secs(3);

pub struct InteractionRouter {
    manager: TicketManager,
    platform: Arc<dyn Platform>,
}

impl InteractionRouter {
    pub fn new(manager: TicketManager, platform: Arc<dyn Platform>) -> Self {
        Self { manager, platform }
    }

    fn config(&self) -> &ConfigProvider {
        self.manager.config()
    }

    /// Entry point: route and convert any failure into a user reply.
    pub async fn dispatch(&self, interaction: &Interaction, responder: &dyn InteractionResponder) {
        if let Err(e) = self.route(interaction, responder).await {
            self.report_error(&e, responder).await;
        }
    }

    async fn report_error(&self, e: &TicketError, responder: &dyn InteractionResponder) {
        if e.is_internal() {
            error!(error = %e, "Interaction handler failed");
        } else {
            debug!(error = %e, "Interaction rejected");
        }

        let reply = views::error_reply(self.config(), &e.user_message(self.config()));
        let result = if responder.acknowledged() {
            // Already acknowledged (deferred or updated): edit what we can.
            responder.edit_reply(reply).await
        } else {
            responder.reply(reply, true).await
        };
        if let Err(send) = result {
            warn!(error = %send, "Failed to deliver error reply");
        }
    }

    async fn route(
        &self,
        interaction: &Interaction,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        match &interaction.payload {
            Payload::Button { custom_id } => {
                let Some(id) = CustomId::parse(custom_id) else {
                    debug!(custom_id, "Ignoring unknown component");
                    return Ok(());
                };
                self.route_component(id, interaction, responder).await
            }
            Payload::SelectMenu { custom_id, values } => {
                match CustomId::parse(custom_id) {
                    Some(CustomId::CategorySelect) => {
                        let Some(category_id) = values.first() else {
                            return Ok(());
                        };
                        self.begin_create(category_id, interaction, responder).await
                    }
                    _ => {
                        debug!(custom_id, "Ignoring unknown select menu");
                        Ok(())
                    }
                }
            }
            Payload::ModalSubmit { custom_id, values } => match CustomId::parse(custom_id) {
                Some(CustomId::IntakeModal { category_id }) => {
                    self.finish_create(&category_id, values, interaction, responder)
                        .await
                }
                Some(CustomId::RatingCommentModal { ticket_id, score }) => {
                    self.save_rating(ticket_id, score, values, interaction, responder)
                        .await
                }
                _ => {
                    debug!(custom_id, "Ignoring unknown modal");
                    Ok(())
                }
            },
            Payload::Command(command) => self.route_command(command, interaction, responder).await,
        }
    }

    async fn route_component(
        &self,
        id: CustomId,
        interaction: &Interaction,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        match id {
            CustomId::Create { category_id } => {
                self.begin_create(&category_id, interaction, responder).await
            }
            CustomId::Close => {
                // Confirmation step; the actual close happens on confirm.
                self.manager.ticket_for_channel(&interaction.channel_id).await?;
                responder
                    .reply(views::close_confirm_prompt(self.config()), false)
                    .await?;
                Ok(())
            }
            CustomId::CloseConfirm => {
                responder
                    .update_message(OutboundMessage::embed(Embed {
                        description: Some(self.config().message("ticket", "closing", &[])),
                        color: Some(parse_color(&self.config().colors().info)),
                        ..Embed::default()
                    }))
                    .await?;
                self.manager
                    .close(&interaction.channel_id, &interaction.user, None)
                    .await?;
                Ok(())
            }
            CustomId::CloseCancel => {
                responder
                    .update_message(views::close_cancelled(self.config()))
                    .await?;
                self.schedule_prompt_removal(interaction);
                Ok(())
            }
            CustomId::Claim => {
                self.manager
                    .claim(&interaction.channel_id, &interaction.user)
                    .await?;
                let text = self.config().message(
                    "ticket",
                    "claimed",
                    &[("user", &format!("<@{}>", interaction.user.id))],
                );
                responder.reply(OutboundMessage::text(text), false).await?;
                Ok(())
            }
            CustomId::Unclaim => {
                self.manager
                    .unclaim(&interaction.channel_id, &interaction.user, interaction.is_admin)
                    .await?;
                let text = self.config().message(
                    "ticket",
                    "unclaimed",
                    &[("user", &format!("<@{}>", interaction.user.id))],
                );
                responder.reply(OutboundMessage::text(text), false).await?;
                Ok(())
            }
            CustomId::Transcript => {
                responder.defer(true).await?;
                self.manager.transcript(&interaction.channel_id).await?;
                responder
                    .edit_reply(OutboundMessage::text(
                        self.config().message("ticket", "transcriptSent", &[]),
                    ))
                    .await?;
                Ok(())
            }
            CustomId::Reopen => self.manager.reopen(&interaction.channel_id).await,
            CustomId::Rating { score, ticket_id } => {
                self.begin_rating(ticket_id, score, responder).await
            }
            CustomId::CategorySelect
            | CustomId::IntakeModal { .. }
            | CustomId::RatingCommentModal { .. } => Ok(()),
        }
    }

    /// Panel entry: open the intake modal when the category has questions,
    /// otherwise create right away behind a deferred ephemeral reply.
    async fn begin_create(
        &self,
        category_id: &str,
        interaction: &Interaction,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        let category = self
            .config()
            .category(category_id)
            .ok_or_else(|| TicketError::UnknownCategory(category_id.to_string()))?;

        if !category.questions.is_empty() {
            responder.open_modal(views::intake_modal(&category)).await?;
            return Ok(());
        }

        responder.defer(true).await?;
        let ticket = self
            .manager
            .create(&interaction.guild_id, &interaction.user, category_id, Vec::new())
            .await?;
        self.confirm_created(&ticket.channel_id.unwrap_or_default(), responder)
            .await
    }

    /// Intake modal submission: pair answers with the configured questions
    /// and create the ticket.
    async fn finish_create(
        &self,
        category_id: &str,
        values: &[(String, String)],
        interaction: &Interaction,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        let category = self
            .config()
            .category(category_id)
            .ok_or_else(|| TicketError::UnknownCategory(category_id.to_string()))?;

        responder.defer(true).await?;

        let answers = pair_answers(&category, values);
        let ticket = self
            .manager
            .create(&interaction.guild_id, &interaction.user, category_id, answers)
            .await?;
        self.confirm_created(&ticket.channel_id.unwrap_or_default(), responder)
            .await
    }

    async fn confirm_created(
        &self,
        channel_id: &str,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        let text = self.config().message(
            "ticket",
            "created",
            &[("channel", &format!("<#{channel_id}>"))],
        );
        responder.edit_reply(OutboundMessage::text(text)).await?;
        Ok(())
    }

    /// Rating button: validate, then ask for the optional comment.
    async fn begin_rating(
        &self,
        ticket_id: i64,
        score: i64,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        if !(1..=5).contains(&score) {
            return Err(TicketError::InvalidRating);
        }
        self.manager
            .db()
            .get_ticket_by_id(ticket_id)
            .await?
            .ok_or(TicketError::NotATicket)?;
        if self.manager.db().get_ticket_rating(ticket_id).await?.is_some() {
            return Err(TicketError::AlreadyRated);
        }

        responder
            .open_modal(views::comment_modal(self.config(), ticket_id, score))
            .await?;
        Ok(())
    }

    /// Comment modal submission: the write, the thank-you, the button
    /// disable, and the mirror to the ratings channel.
    async fn save_rating(
        &self,
        ticket_id: i64,
        score: i64,
        values: &[(String, String)],
        interaction: &Interaction,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        if !(1..=5).contains(&score) {
            return Err(TicketError::InvalidRating);
        }
        let ticket = self
            .manager
            .db()
            .get_ticket_by_id(ticket_id)
            .await?
            .ok_or(TicketError::NotATicket)?;

        let comment = values
            .iter()
            .find(|(id, _)| id == "comment")
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty());

        match self
            .manager
            .db()
            .save_ticket_rating(ticket_id, &interaction.user.id, score, comment)
            .await?
        {
            RatingInsert::Saved(_) => {}
            RatingInsert::AlreadyRated => return Err(TicketError::AlreadyRated),
        }

        let thanks = self
            .config()
            .ratings()
            .thank_you_message
            .unwrap_or_else(|| self.config().message("rating", "thanks", &[]));
        responder.reply(OutboundMessage::text(thanks), true).await?;

        // Disable the stars on the DM message.
        if let Some(message_id) = &interaction.message_id
            && let Err(e) = self
                .platform
                .edit_message_components(
                    &interaction.channel_id,
                    message_id,
                    views::rating_rows_disabled(ticket_id),
                )
                .await
        {
            warn!(ticket = ticket_id, error = %e, "Failed to disable rating buttons");
        }

        if let Some(ratings_channel) = self.config().ratings().channel_id {
            let embed = Embed {
                title: Some(format!("Rating — Ticket #{:04}", ticket.ticket_number)),
                description: Some(format!(
                    "{} {}\n{}",
                    "⭐".repeat(score.unsigned_abs() as usize),
                    score,
                    comment.unwrap_or_default()
                )),
                color: Some(parse_color(&self.config().colors().success)),
                footer: self.config().footer(),
                ..Embed::default()
            };
            if let Err(e) = self
                .platform
                .send_message(&ratings_channel, OutboundMessage::embed(embed))
                .await
            {
                warn!(ticket = ticket_id, error = %e, "Failed to mirror rating");
            }
        }

        Ok(())
    }

    async fn route_command(
        &self,
        command: &Command,
        interaction: &Interaction,
        responder: &dyn InteractionResponder,
    ) -> Result<(), TicketError> {
        let ticket = self.manager.ticket_for_channel(&interaction.channel_id).await?;
        let category = self.config().category(&ticket.category_id);

        match command {
            Command::Alert {
                duration_minutes,
                reason,
            } => {
                self.require_staff(interaction, category.as_ref(), true, "alert")?;
                self.manager
                    .alert(
                        &interaction.channel_id,
                        &interaction.user,
                        *duration_minutes,
                        reason.clone(),
                    )
                    .await?;
                responder
                    .reply(
                        OutboundMessage::text(self.config().message("command", "alertSet", &[])),
                        true,
                    )
                    .await?;
            }
            Command::Rename { new_name } => {
                self.require_staff(interaction, category.as_ref(), false, "rename")?;
                self.manager
                    .rename(&interaction.channel_id, new_name, &interaction.user)
                    .await?;
                responder
                    .reply(
                        OutboundMessage::text(self.config().message(
                            "command",
                            "renamed",
                            &[("name", new_name)],
                        )),
                        true,
                    )
                    .await?;
            }
            Command::Add { user_id } => {
                self.require_staff(interaction, category.as_ref(), false, "add")?;
                self.manager
                    .add_user(&interaction.channel_id, user_id, &interaction.user)
                    .await?;
                responder
                    .reply(
                        OutboundMessage::text(self.config().message(
                            "command",
                            "userAdded",
                            &[("user", &format!("<@{user_id}>"))],
                        )),
                        false,
                    )
                    .await?;
            }
            Command::Remove { user_id } => {
                self.require_staff(interaction, category.as_ref(), false, "remove")?;
                self.manager
                    .remove_user(&interaction.channel_id, user_id, &interaction.user)
                    .await?;
                responder
                    .reply(
                        OutboundMessage::text(self.config().message(
                            "command",
                            "userRemoved",
                            &[("user", &format!("<@{user_id}>"))],
                        )),
                        false,
                    )
                    .await?;
            }
            Command::Close { reason } => {
                // The owner may close their own ticket; staff may close any.
                if interaction.user.id != ticket.user_id {
                    self.require_staff(interaction, category.as_ref(), false, "close")?;
                }
                // Reply before the channel disappears.
                responder
                    .reply(
                        OutboundMessage::text(self.config().message("ticket", "closing", &[])),
                        false,
                    )
                    .await?;
                self.manager
                    .close(&interaction.channel_id, &interaction.user, reason.clone())
                    .await?;
            }
        }
        Ok(())
    }

    /// Administrator, a category staff role, or (optionally) an alerts
    /// admin role.
    fn require_staff(
        &self,
        interaction: &Interaction,
        category: Option<&CategoryConfig>,
        include_alert_admins: bool,
        action: &'static str,
    ) -> Result<(), TicketError> {
        if interaction.is_admin {
            return Ok(());
        }
        if let Some(category) = category
            && interaction
                .member_roles
                .iter()
                .any(|role| category.staff_roles.contains(role))
        {
            return Ok(());
        }
        if include_alert_admins
            && interaction
                .member_roles
                .iter()
                .any(|role| self.config().alerts().admin_roles.contains(role))
        {
            return Ok(());
        }
        Err(TicketError::PermissionDenied(action))
    }

    /// Remove the cancelled-close prompt after a short delay, best-effort.
    fn schedule_prompt_removal(&self, interaction: &Interaction) {
        let Some(message_id) = interaction.message_id.clone() else {
            return;
        };
        let platform = Arc::clone(&self.platform);
        let channel_id = interaction.channel_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(CANCEL_NOTICE_TTL).await;
            if let Err(e) = platform.delete_message(&channel_id, &message_id).await {
                debug!(error = %e, "Failed to remove cancelled close prompt");
            }
        });
    }
}

/// Pair modal values (`question_<i>`) with the category's question labels.
fn pair_answers(category: &CategoryConfig, values: &[(String, String)]) -> Vec<TicketAnswer> {
    values
        .iter()
        .filter_map(|(id, value)| {
            let index: usize = id.strip_prefix("question_")?.parse().ok()?;
            let question = category.questions.get(index)?;
            if value.trim().is_empty() {
                return None;
            }
            Some(TicketAnswer {
                question: question.label.clone(),
                answer: value.clone(),
            })
        })
        .collect()
}
