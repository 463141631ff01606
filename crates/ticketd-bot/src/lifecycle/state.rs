//! Ticket state machine.
//!
//! Every transition check lives here so the manager never reasons about raw
//! status strings. The state is derived from the stored row; the actual
//! mutation happens in the storage layer, whose guarded UPDATEs serialize
//! races (the state check gives the friendly error, the UPDATE is the
//! authority).

use crate::error::TicketError;
use crate::storage::Ticket;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketState {
    Open {
        claimed_by: Option<String>,
    },
    Closed {
        by: Option<String>,
        reason: Option<String>,
        at: Option<i64>,
    },
}

impl TicketState {
    pub fn of(ticket: &Ticket) -> Self {
        if ticket.is_open() {
            Self::Open {
                claimed_by: ticket.claimed_by.clone(),
            }
        } else {
            Self::Closed {
                by: ticket.closed_by.clone(),
                reason: ticket.close_reason.clone(),
                at: ticket.closed_at,
            }
        }
    }

    /// May this ticket still be acted on at all?
    pub fn ensure_open(&self) -> Result<(), TicketError> {
        match self {
            Self::Open { .. } => Ok(()),
            Self::Closed { .. } => Err(TicketError::AlreadyClosed),
        }
    }

    pub fn check_claim(&self) -> Result<(), TicketError> {
        match self {
            Self::Open { claimed_by: None } => Ok(()),
            Self::Open {
                claimed_by: Some(by),
            } => Err(TicketError::AlreadyClaimed { by: by.clone() }),
            Self::Closed { .. } => Err(TicketError::AlreadyClosed),
        }
    }

    /// Only the claimer (or an admin) may release a claim.
    pub fn check_unclaim(&self, user_id: &str, is_admin: bool) -> Result<(), TicketError> {
        match self {
            Self::Open { claimed_by: None } => Err(TicketError::NotClaimed),
            Self::Open {
                claimed_by: Some(by),
            } => {
                if by == user_id || is_admin {
                    Ok(())
                } else {
                    Err(TicketError::ClaimedByOther { by: by.clone() })
                }
            }
            Self::Closed { .. } => Err(TicketError::AlreadyClosed),
        }
    }

    pub fn check_close(&self) -> Result<(), TicketError> {
        self.ensure_open()
    }

    pub fn check_reopen(&self) -> Result<(), TicketError> {
        Err(TicketError::NotImplemented("reopen"))
    }
}
