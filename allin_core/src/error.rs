use crate::state::SeatIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request itself is illegal for the current state of the hand.
    Validation,
    /// The operation does not apply to the current phase of the table.
    State,
    /// The table has no room for the request.
    Capacity,
}

/// Every error the core can return.
///
/// All of them are recoverable: the rejected operation has not touched the
/// table, so the caller only needs to relay the error to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PokerError {
    #[error("it is not seat {seat}'s turn")]
    NotYourTurn { seat: SeatIndex, current: Option<SeatIndex> },
    #[error("seat {0} cannot act in this hand")]
    CannotAct(SeatIndex),
    #[error("cannot check, {to_call} to call")]
    CannotCheck { to_call: u32 },
    #[error("raise to {amount} is below the minimum of {minimum}")]
    RaiseTooSmall { amount: u32, minimum: u32 },
    #[error("wager of {amount} exceeds the {available} available")]
    InsufficientChips { amount: u32, available: u32 },
    #[error("seat index {0} is out of range")]
    InvalidSeat(SeatIndex),
    #[error("card index {0} is out of range")]
    InvalidCardIndex(usize),
    #[error("cannot evaluate {0} cards, need 5 to 7")]
    InvalidCardCount(usize),
    #[error("cannot parse card {0:?}")]
    InvalidCard(String),
    #[error("invalid table settings: {0}")]
    InvalidSettings(String),
    #[error("stack of {stack} exceeds the limit of {max}")]
    StackTooLarge { stack: u32, max: u32 },

    #[error("no hand is in progress")]
    NoHandInProgress,
    #[error("a hand is already in progress")]
    HandInProgress,
    #[error("at least 2 players with chips are needed")]
    NotEnoughPlayers,
    #[error("cannot move seats while playing a hand")]
    CannotMoveDuringHand,
    #[error("cards can only be shown at showdown")]
    NotAtShowdown,
    #[error("seat {0} has no cards to show")]
    NothingToShow(SeatIndex),
    #[error("seat {0} did not reach showdown")]
    CannotShow(SeatIndex),
    #[error("seat {0} is empty")]
    EmptySeat(SeatIndex),
    #[error("deck holds {available} cards, {needed} needed")]
    DeckTooSmall { needed: usize, available: usize },

    #[error("seat {0} is taken")]
    SeatOccupied(SeatIndex),
    #[error("table is full")]
    TableFull,
    #[error("player is already seated at seat {0}")]
    AlreadySeated(SeatIndex),
}

impl PokerError {
    pub fn kind(&self) -> ErrorKind {
        use PokerError::*;
        match self {
            NotYourTurn { .. }
            | CannotAct(_)
            | CannotCheck { .. }
            | RaiseTooSmall { .. }
            | InsufficientChips { .. }
            | InvalidSeat(_)
            | InvalidCardIndex(_)
            | InvalidCardCount(_)
            | InvalidCard(_)
            | InvalidSettings(_)
            | StackTooLarge { .. } => ErrorKind::Validation,
            NoHandInProgress
            | HandInProgress
            | NotEnoughPlayers
            | CannotMoveDuringHand
            | NotAtShowdown
            | NothingToShow(_)
            | CannotShow(_)
            | EmptySeat(_)
            | DeckTooSmall { .. } => ErrorKind::State,
            SeatOccupied(_) | TableFull | AlreadySeated(_) => ErrorKind::Capacity,
        }
    }

    /// Stable machine-readable code, relayed to clients next to the message.
    pub fn code(&self) -> &'static str {
        use PokerError::*;
        match self {
            NotYourTurn { .. } => "not_your_turn",
            CannotAct(_) => "cannot_act",
            CannotCheck { .. } => "cannot_check",
            RaiseTooSmall { .. } => "raise_too_small",
            InsufficientChips { .. } => "insufficient_chips",
            InvalidSeat(_) => "invalid_seat",
            InvalidCardIndex(_) => "invalid_card_index",
            InvalidCardCount(_) => "invalid_card_count",
            InvalidCard(_) => "invalid_card",
            InvalidSettings(_) => "invalid_settings",
            StackTooLarge { .. } => "stack_too_large",
            NoHandInProgress => "no_hand_in_progress",
            HandInProgress => "hand_in_progress",
            NotEnoughPlayers => "not_enough_players",
            CannotMoveDuringHand => "cannot_move_during_hand",
            NotAtShowdown => "not_at_showdown",
            NothingToShow(_) => "nothing_to_show",
            CannotShow(_) => "cannot_show",
            EmptySeat(_) => "empty_seat",
            DeckTooSmall { .. } => "deck_too_small",
            SeatOccupied(_) => "seat_occupied",
            TableFull => "table_full",
            AlreadySeated(_) => "already_seated",
        }
    }
}

pub type PokerResult<T> = Result<T, PokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(PokerError::RaiseTooSmall { amount: 30, minimum: 40 }.kind(), ErrorKind::Validation);
        assert_eq!(PokerError::NoHandInProgress.kind(), ErrorKind::State);
        assert_eq!(PokerError::TableFull.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn test_message_and_code() {
        let err = PokerError::CannotCheck { to_call: 20 };
        assert_eq!(err.to_string(), "cannot check, 20 to call");
        assert_eq!(err.code(), "cannot_check");
    }
}
