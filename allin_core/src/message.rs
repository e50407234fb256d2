use crate::card::Card;
use crate::error::{ErrorKind, PokerError};
use crate::state::{ActionOption, HandSummary, Phase, PlayerAction, PlayerId, SeatIndex, TableCode, TableSummary};
use crate::view::TableView;
use serde::{Deserialize, Serialize};

// --- client -> server ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Lobby listing of public tables.
    ListTables,
    /// Opens a table and sits the creator at seat 0 as host.
    CreateTable {
        name: String,
        max_seats: usize,
        small_blind: u32,
        big_blind: u32,
        buy_in: u32,
        is_private: bool,
    },
    /// Joins by code (any case) and takes the first free seat.
    JoinTable { code: TableCode, name: String, buy_in: Option<u32> },
    /// Sits down as a spectator, or moves an already seated player.
    TakeSeat { seat: SeatIndex, buy_in: Option<u32>, name: Option<String> },
    /// Stands up but keeps watching.
    LeaveSeat,
    LeaveTable,
    SitIn,
    /// Host only.
    StartGame,
    Action(PlayerAction),
    RevealCard { card_index: usize, revealed: bool },
    ShowCards,
}

// --- server -> client ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    TableList(Vec<TableSummary>),
    TableCreated { code: TableCode, your_id: PlayerId, seat: SeatIndex, is_private: bool },
    JoinedTable { code: TableCode, your_id: PlayerId, seat: SeatIndex, sitting_out: bool, is_private: bool },
    SeatTaken { seat: SeatIndex },
    LeftSeat,
    /// Snapshot personalized for the recipient.
    TableUpdate(TableView),

    HandStarted { hand_number: u64, dealer: SeatIndex, small_blind: SeatIndex, big_blind: SeatIndex },
    ActionMade {
        seat: SeatIndex,
        name: String,
        action: PlayerAction,
        /// Street bet after the action.
        street_bet: u32,
        stack: u32,
        pot: u32,
    },
    NextToAct { seat: SeatIndex, name: String, options: Vec<ActionOption> },
    PhaseChange { phase: Phase, community: Vec<Card> },
    HandComplete(HandSummary),
    GameOver { winner: Option<String> },

    PlayerJoined { name: String, seat: SeatIndex },
    PlayerLeft { name: String, seat: SeatIndex },
    PlayerMoved { name: String, from: SeatIndex, to: SeatIndex },
    PlayerSatIn { name: String, seat: SeatIndex },
    CardRevealed { name: String, seat: SeatIndex, card_index: usize, card: Card },
    PlayerShowedCards { name: String, seat: SeatIndex, cards: Vec<Card> },

    Error { kind: Option<ErrorKind>, code: String, message: String },
}

impl ServerMessage {
    /// An error that did not come from the table, such as an unknown code.
    pub fn error(code: &str, message: impl Into<String>) -> ServerMessage {
        ServerMessage::Error { kind: None, code: code.to_string(), message: message.into() }
    }
}

impl From<PokerError> for ServerMessage {
    fn from(err: PokerError) -> Self {
        ServerMessage::Error {
            kind: Some(err.kind()),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<PlayerAction> for ClientMessage {
    fn from(action: PlayerAction) -> Self {
        ClientMessage::Action(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_json_shape() {
        let msg: ClientMessage = PlayerAction::Raise(120).into();
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({ "Action": { "Raise": 120 } }));
        let parsed: ClientMessage = serde_json::from_str(r#""ShowCards""#).unwrap();
        assert_eq!(parsed, ClientMessage::ShowCards);
        let join: ClientMessage =
            serde_json::from_str(r#"{"JoinTable":{"code":"abc234","name":"ann","buy_in":null}}"#).unwrap();
        assert_eq!(join, ClientMessage::JoinTable { code: "abc234".into(), name: "ann".into(), buy_in: None });
    }

    #[test]
    fn test_negative_amounts_are_rejected_at_the_wire() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"Action":{"Raise":-5}}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"TakeSeat":{"seat":-1,"buy_in":null,"name":null}}"#).is_err());
    }

    #[test]
    fn test_error_from_poker_error() {
        let msg = ServerMessage::from(PokerError::TableFull);
        assert_eq!(
            msg,
            ServerMessage::Error {
                kind: Some(ErrorKind::Capacity),
                code: "table_full".to_string(),
                message: "table is full".to_string(),
            }
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["Error"]["kind"], json!("Capacity"));
    }
}
