//! Message, embed, modal, and panel builders.
//!
//! Pure functions from config + storage rows to outbound payloads; nothing
//! here touches the platform.

use ticketd_core::ConfigProvider;
use ticketd_core::config::{
    CategoryConfig, PanelConfig, PanelKind, QuestionStyle, parse_color,
};
use ticketd_core::hours::BusinessHours;

use crate::platform::{
    ActionRow, Button, ButtonStyle, Component, Embed, EmbedField, Modal, OutboundMessage,
    SelectMenu, SelectOption, TextInput, TextInputStyle, UserRef,
};
use crate::router::CustomId;
use crate::storage::{Ticket, TicketAnswer};

/// Discord caps embed field values at 1024 characters.
const FIELD_VALUE_MAX: usize = 1024;
/// Modal labels are capped at 45 characters.
const LABEL_MAX: usize = 45;
/// At most 5 buttons fit in one action row.
const ROW_MAX: usize = 5;
/// At most 5 inputs fit in one modal.
const MODAL_MAX: usize = 5;

/// Channel name from the category template; `{number}` is zero-padded to 4.
pub fn channel_name(category: &CategoryConfig, number: i64, user: &UserRef) -> String {
    let template = category
        .channel_name
        .as_deref()
        .unwrap_or("ticket-{number}");
    template
        .replace("{number}", &format!("{number:04}"))
        .replace("{username}", &user.username)
        .replace("{userid}", &user.id)
        .replace("{category}", &category.id)
}

/// Close / claim-or-unclaim / transcript control buttons.
pub fn control_rows(claimed: bool) -> Vec<ActionRow> {
    let claim_button = if claimed {
        Button {
            custom_id: CustomId::Unclaim.to_string(),
            label: "Release".to_string(),
            style: ButtonStyle::Secondary,
            emoji: Some("🔓".to_string()),
            disabled: false,
        }
    } else {
        Button {
            custom_id: CustomId::Claim.to_string(),
            label: "Claim".to_string(),
            style: ButtonStyle::Primary,
            emoji: Some("🙋".to_string()),
            disabled: false,
        }
    };

    vec![ActionRow {
        components: vec![
            Component::Button(Button {
                custom_id: CustomId::Close.to_string(),
                label: "Close".to_string(),
                style: ButtonStyle::Danger,
                emoji: Some("🔒".to_string()),
                disabled: false,
            }),
            Component::Button(claim_button),
            Component::Button(Button {
                custom_id: CustomId::Transcript.to_string(),
                label: "Transcript".to_string(),
                style: ButtonStyle::Secondary,
                emoji: Some("📄".to_string()),
                disabled: false,
            }),
        ],
    }]
}

/// The first message posted in a fresh ticket channel.
pub fn opening_message(
    config: &ConfigProvider,
    category: &CategoryConfig,
    ticket: &Ticket,
    user: &UserRef,
    answers: &[TicketAnswer],
) -> OutboundMessage {
    let mut mentions: Vec<String> = category
        .ping_roles
        .iter()
        .map(|role| format!("<@&{role}>"))
        .collect();
    mentions.push(format!("<@{}>", user.id));

    let description = category
        .opening_message
        .clone()
        .unwrap_or_else(|| config.message("ticket", "opening", &[]))
        .replace("{user}", &format!("<@{}>", user.id))
        .replace("{category}", &category.name);

    let fields = answers
        .iter()
        .map(|answer| EmbedField {
            name: answer.question.clone(),
            value: truncate(&answer.answer, FIELD_VALUE_MAX),
            inline: false,
        })
        .collect();

    OutboundMessage {
        content: Some(mentions.join(" ")),
        embeds: vec![Embed {
            title: Some(format!(
                "Ticket #{:04} — {}",
                ticket.ticket_number, category.name
            )),
            description: Some(description),
            color: Some(parse_color(&config.colors().primary)),
            fields,
            footer: config.footer(),
            ..Embed::default()
        }],
        components: control_rows(false),
    }
}

/// Notice posted when a ticket is opened outside the configured window.
pub fn outside_hours_notice(
    config: &ConfigProvider,
    hours: &BusinessHours,
    user: &UserRef,
) -> Option<OutboundMessage> {
    let text = hours
        .message
        .clone()?
        .replace("{user}", &format!("<@{}>", user.id));
    Some(OutboundMessage::embed(Embed {
        description: Some(text),
        color: Some(parse_color(&config.colors().warning)),
        ..Embed::default()
    }))
}

/// Confirm/cancel prompt shown when someone presses the close button.
pub fn close_confirm_prompt(config: &ConfigProvider) -> OutboundMessage {
    OutboundMessage {
        embeds: vec![Embed {
            description: Some(config.message("ticket", "closeConfirm", &[])),
            color: Some(parse_color(&config.colors().warning)),
            ..Embed::default()
        }],
        components: vec![ActionRow {
            components: vec![
                Component::Button(Button {
                    custom_id: CustomId::CloseConfirm.to_string(),
                    label: "Confirm".to_string(),
                    style: ButtonStyle::Danger,
                    emoji: None,
                    disabled: false,
                }),
                Component::Button(Button {
                    custom_id: CustomId::CloseCancel.to_string(),
                    label: "Cancel".to_string(),
                    style: ButtonStyle::Secondary,
                    emoji: None,
                    disabled: false,
                }),
            ],
        }],
        ..OutboundMessage::default()
    }
}

/// Replacement for the prompt once the close was cancelled.
pub fn close_cancelled(config: &ConfigProvider) -> OutboundMessage {
    OutboundMessage {
        embeds: vec![Embed {
            description: Some(config.message("ticket", "closeCancelled", &[])),
            color: Some(parse_color(&config.colors().info)),
            ..Embed::default()
        }],
        components: Vec::new(),
        ..OutboundMessage::default()
    }
}

/// Star buttons, one per score.
fn rating_rows(ticket_id: i64, disabled: bool) -> Vec<ActionRow> {
    let buttons = (1..=5)
        .map(|score| {
            Component::Button(Button {
                custom_id: CustomId::Rating { score, ticket_id }.to_string(),
                label: score.to_string(),
                style: ButtonStyle::Secondary,
                emoji: Some("⭐".to_string()),
                disabled,
            })
        })
        .collect();
    vec![ActionRow {
        components: buttons,
    }]
}

/// Rating request DM sent to the owner after closure.
pub fn rating_request(config: &ConfigProvider, ticket: &Ticket, category_name: &str) -> OutboundMessage {
    let description = config
        .ratings()
        .request_message
        .unwrap_or_else(|| config.message("rating", "request", &[]))
        .replace("{ticket}", &format!("#{:04}", ticket.ticket_number))
        .replace("{category}", category_name)
        .replace("{user}", &format!("<@{}>", ticket.user_id));

    OutboundMessage {
        embeds: vec![Embed {
            title: Some(config.message("rating", "title", &[])),
            description: Some(description),
            color: Some(parse_color(&config.colors().primary)),
            footer: config.footer(),
            ..Embed::default()
        }],
        components: rating_rows(ticket.id, false),
        ..OutboundMessage::default()
    }
}

/// The same star row with every button disabled, for after submission.
pub fn rating_rows_disabled(ticket_id: i64) -> Vec<ActionRow> {
    rating_rows(ticket_id, true)
}

/// Intake modal built from the category's questions (at most 5).
pub fn intake_modal(category: &CategoryConfig) -> Modal {
    let inputs = category
        .questions
        .iter()
        .take(MODAL_MAX)
        .enumerate()
        .map(|(index, question)| TextInput {
            custom_id: format!("question_{index}"),
            label: truncate(&question.label, LABEL_MAX),
            style: match question.style {
                QuestionStyle::Short => TextInputStyle::Short,
                QuestionStyle::Paragraph => TextInputStyle::Paragraph,
            },
            required: question.required,
            placeholder: question.placeholder.clone(),
            min_length: question.min_length,
            max_length: question.max_length,
        })
        .collect();

    Modal {
        custom_id: CustomId::IntakeModal {
            category_id: category.id.clone(),
        }
        .to_string(),
        title: truncate(&category.name, LABEL_MAX),
        inputs,
    }
}

/// Optional-comment modal opened by a rating button.
pub fn comment_modal(config: &ConfigProvider, ticket_id: i64, score: i64) -> Modal {
    Modal {
        custom_id: CustomId::RatingCommentModal { ticket_id, score }.to_string(),
        title: truncate(&config.message("rating", "commentTitle", &[]), LABEL_MAX),
        inputs: vec![TextInput {
            custom_id: "comment".to_string(),
            label: truncate(&config.message("rating", "commentLabel", &[]), LABEL_MAX),
            style: TextInputStyle::Paragraph,
            required: false,
            placeholder: None,
            min_length: None,
            max_length: Some(1000),
        }],
    }
}

/// Render a panel: embed plus either category buttons or a select menu.
pub fn panel_message(config: &ConfigProvider, panel: &PanelConfig) -> OutboundMessage {
    let categories: Vec<CategoryConfig> = panel
        .categories
        .iter()
        .filter_map(|id| config.category(id))
        .collect();

    let description = panel
        .description
        .clone()
        .map(|text| text.replace("{hours}", panel.hours.as_deref().unwrap_or_default()));

    let color = panel
        .color
        .as_deref()
        .map_or_else(|| parse_color(&config.colors().primary), parse_color);

    let components = match panel.kind {
        PanelKind::Buttons => categories
            .chunks(ROW_MAX)
            .map(|chunk| ActionRow {
                components: chunk
                    .iter()
                    .map(|category| {
                        Component::Button(Button {
                            custom_id: CustomId::Create {
                                category_id: category.id.clone(),
                            }
                            .to_string(),
                            label: category.name.clone(),
                            style: ButtonStyle::Primary,
                            emoji: category.emoji.clone(),
                            disabled: false,
                        })
                    })
                    .collect(),
            })
            .collect(),
        PanelKind::SelectMenu => vec![ActionRow {
            components: vec![Component::Select(SelectMenu {
                custom_id: CustomId::CategorySelect.to_string(),
                placeholder: Some(config.message("panel", "selectPlaceholder", &[])),
                options: categories
                    .iter()
                    .map(|category| SelectOption {
                        label: category.name.clone(),
                        value: category.id.clone(),
                        description: category.description.clone(),
                        emoji: category.emoji.clone(),
                    })
                    .collect(),
            })],
        }],
    };

    OutboundMessage {
        embeds: vec![Embed {
            title: panel.title.clone(),
            description,
            color: Some(color),
            image: panel.image.clone(),
            thumbnail: panel.thumbnail.clone(),
            footer: config.footer(),
            ..Embed::default()
        }],
        components,
        ..OutboundMessage::default()
    }
}

/// Ephemeral error embed shown for rejected interactions.
pub fn error_reply(config: &ConfigProvider, text: &str) -> OutboundMessage {
    OutboundMessage::embed(Embed {
        description: Some(text.to_string()),
        color: Some(parse_color(&config.colors().error)),
        ..Embed::default()
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, name: &str) -> CategoryConfig {
        CategoryConfig {
            id: id.to_string(),
            name: name.to_string(),
            ..CategoryConfig::default()
        }
    }

    #[test]
    fn channel_name_substitution() {
        let user = UserRef {
            id: "123".to_string(),
            username: "alice".to_string(),
            is_bot: false,
        };
        let mut cat = category("suporte", "Suporte");
        assert_eq!(channel_name(&cat, 7, &user), "ticket-0007");

        cat.channel_name = Some("{category}-{number}-{username}".to_string());
        assert_eq!(channel_name(&cat, 123, &user), "suporte-0123-alice");
    }

    #[test]
    fn outside_hours_notice_mentions_the_opener() {
        let provider = ConfigProvider::from_config(ticketd_core::config::BotConfig::default());
        let user = UserRef {
            id: "123".to_string(),
            username: "alice".to_string(),
            is_bot: false,
        };
        let hours = BusinessHours {
            is_open: false,
            message: Some("{user}, we are back at 09:00.".to_string()),
            allow_outside: true,
        };

        let notice = outside_hours_notice(&provider, &hours, &user).unwrap();
        assert_eq!(
            notice.embeds[0].description.as_deref(),
            Some("<@123>, we are back at 09:00.")
        );

        // No configured message, no notice.
        let silent = BusinessHours {
            message: None,
            ..hours
        };
        assert!(outside_hours_notice(&provider, &silent, &user).is_none());
    }

    #[test]
    fn panel_buttons_wrap_at_five_per_row() {
        let mut config = ticketd_core::config::BotConfig::default();
        for i in 0..7 {
            config.categories.push(category(&format!("c{i}"), &format!("C{i}")));
        }
        config.panels.push(PanelConfig {
            id: "main".to_string(),
            channel_id: "1".to_string(),
            categories: (0..7).map(|i| format!("c{i}")).collect(),
            ..PanelConfig::default()
        });
        let provider = ConfigProvider::from_config(config);
        let panel = provider.panel("main").unwrap_or_default();

        let message = panel_message(&provider, &panel);
        assert_eq!(message.components.len(), 2);
        assert_eq!(message.components[0].components.len(), 5);
        assert_eq!(message.components[1].components.len(), 2);
    }

    #[test]
    fn select_panel_is_a_single_menu() {
        let mut config = ticketd_core::config::BotConfig::default();
        config.categories.push(category("suporte", "Suporte"));
        config.panels.push(PanelConfig {
            id: "main".to_string(),
            channel_id: "1".to_string(),
            categories: vec!["suporte".to_string(), "ghost".to_string()],
            kind: PanelKind::SelectMenu,
            ..PanelConfig::default()
        });
        let provider = ConfigProvider::from_config(config);
        let panel = provider.panel("main").unwrap_or_default();

        let message = panel_message(&provider, &panel);
        assert_eq!(message.components.len(), 1);
        match &message.components[0].components[0] {
            Component::Select(menu) => {
                // Unknown category ids are skipped.
                assert_eq!(menu.options.len(), 1);
                assert_eq!(menu.options[0].value, "suporte");
            }
            Component::Button(_) => panic!("expected a select menu"),
        }
    }

    #[test]
    fn intake_modal_caps_at_five_questions() {
        let mut cat = category("suporte", "Suporte");
        for i in 0..7 {
            cat.questions.push(ticketd_core::config::QuestionConfig {
                label: format!("Question {i}"),
                style: QuestionStyle::Short,
                required: true,
                placeholder: None,
                min_length: None,
                max_length: None,
            });
        }
        let modal = intake_modal(&cat);
        assert_eq!(modal.inputs.len(), 5);
        assert_eq!(modal.custom_id, "ticket_modal_suporte");
        assert_eq!(modal.inputs[0].custom_id, "question_0");
    }

    #[test]
    fn long_answers_are_truncated_in_fields() {
        let provider = ConfigProvider::from_config(ticketd_core::config::BotConfig::default());
        let cat = category("suporte", "Suporte");
        let user = UserRef {
            id: "1".to_string(),
            username: "alice".to_string(),
            is_bot: false,
        };
        let ticket = Ticket {
            id: 1,
            ticket_number: 1,
            channel_id: Some("c1".to_string()),
            guild_id: "g1".to_string(),
            user_id: "1".to_string(),
            category_id: "suporte".to_string(),
            status: crate::storage::STATUS_OPEN.to_string(),
            claimed_by: None,
            created_at: 0,
            closed_at: None,
            closed_by: None,
            close_reason: None,
            last_message_at: 0,
        };
        let answers = vec![TicketAnswer {
            question: "Detalhes".to_string(),
            answer: "x".repeat(3000),
        }];

        let message = opening_message(&provider, &cat, &ticket, &user, &answers);
        assert_eq!(message.embeds[0].fields.len(), 1);
        assert!(message.embeds[0].fields[0].value.chars().count() <= 1024);
    }
}
