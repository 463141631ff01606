//! Component custom-id encoding.
//!
//! Every button, select menu, and modal carries its routing information in
//! its custom id string; `CustomId` is the typed form used on both ends.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomId {
    /// Panel button for one category.
    Create { category_id: String },
    /// Panel select menu; the chosen category travels in the values.
    CategorySelect,
    Close,
    CloseConfirm,
    CloseCancel,
    Claim,
    Unclaim,
    Transcript,
    Reopen,
    /// Intake modal for one category.
    IntakeModal { category_id: String },
    /// Rating button in the closure DM.
    Rating { score: i64, ticket_id: i64 },
    /// Optional-comment modal opened by a rating button.
    RatingCommentModal { ticket_id: i64, score: i64 },
}

impl CustomId {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ticket_category_select" => return Some(Self::CategorySelect),
            "ticket_close" => return Some(Self::Close),
            "ticket_close_confirm" => return Some(Self::CloseConfirm),
            "ticket_close_cancel" => return Some(Self::CloseCancel),
            "ticket_claim" => return Some(Self::Claim),
            "ticket_unclaim" => return Some(Self::Unclaim),
            "ticket_transcript" => return Some(Self::Transcript),
            "ticket_reopen" => return Some(Self::Reopen),
            _ => {}
        }

        if let Some(rest) = raw.strip_prefix("rating_comment_modal_") {
            let (ticket_id, score) = rest.split_once('_')?;
            return Some(Self::RatingCommentModal {
                ticket_id: ticket_id.parse().ok()?,
                score: score.parse().ok()?,
            });
        }
        if let Some(rest) = raw.strip_prefix("rating_") {
            let (score, ticket_id) = rest.split_once('_')?;
            return Some(Self::Rating {
                score: score.parse().ok()?,
                ticket_id: ticket_id.parse().ok()?,
            });
        }
        if let Some(category_id) = raw.strip_prefix("ticket_create_") {
            return Some(Self::Create {
                category_id: category_id.to_string(),
            });
        }
        if let Some(category_id) = raw.strip_prefix("ticket_modal_") {
            return Some(Self::IntakeModal {
                category_id: category_id.to_string(),
            });
        }

        None
    }
}

impl fmt::Display for CustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { category_id } => write!(f, "ticket_create_{category_id}"),
            Self::CategorySelect => write!(f, "ticket_category_select"),
            Self::Close => write!(f, "ticket_close"),
            Self::CloseConfirm => write!(f, "ticket_close_confirm"),
            Self::CloseCancel => write!(f, "ticket_close_cancel"),
            Self::Claim => write!(f, "ticket_claim"),
            Self::Unclaim => write!(f, "ticket_unclaim"),
            Self::Transcript => write!(f, "ticket_transcript"),
            Self::Reopen => write!(f, "ticket_reopen"),
            Self::IntakeModal { category_id } => write!(f, "ticket_modal_{category_id}"),
            Self::Rating { score, ticket_id } => write!(f, "rating_{score}_{ticket_id}"),
            Self::RatingCommentModal { ticket_id, score } => {
                write!(f, "rating_comment_modal_{ticket_id}_{score}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let ids = [
            CustomId::Create {
                category_id: "suporte".to_string(),
            },
            CustomId::CategorySelect,
            CustomId::Close,
            CustomId::CloseConfirm,
            CustomId::CloseCancel,
            CustomId::Claim,
            CustomId::Unclaim,
            CustomId::Transcript,
            CustomId::Reopen,
            CustomId::IntakeModal {
                category_id: "vendas".to_string(),
            },
            CustomId::Rating {
                score: 5,
                ticket_id: 42,
            },
            CustomId::RatingCommentModal {
                ticket_id: 42,
                score: 5,
            },
        ];
        for id in ids {
            assert_eq!(CustomId::parse(&id.to_string()), Some(id));
        }
    }

    #[test]
    fn close_variants_do_not_shadow_each_other() {
        assert_eq!(CustomId::parse("ticket_close"), Some(CustomId::Close));
        assert_eq!(
            CustomId::parse("ticket_close_confirm"),
            Some(CustomId::CloseConfirm)
        );
        assert_eq!(
            CustomId::parse("ticket_close_cancel"),
            Some(CustomId::CloseCancel)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(CustomId::parse("unrelated"), None);
        assert_eq!(CustomId::parse("rating_five_42"), None);
        assert_eq!(CustomId::parse("rating_comment_modal_42"), None);
        assert_eq!(CustomId::parse("rating_5"), None);
    }
}
