use crate::card::{Card, Deck};
use crate::error::{PokerError, PokerResult};
use crate::hand::HandValue;
use crate::pot::Pot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;
pub type SeatIndex = usize;
pub type TableCode = String;

pub const MIN_SEATS: usize = 2;
/// Keeps a hand's draws well inside one deck: 2 * 10 hole cards, 5 board cards, 3 burns.
pub const MAX_SEATS: usize = 10;
/// Largest stack a player may bring to a table, and the cap on blinds and buy-ins.
pub const MAX_STACK: u32 = 100_000_000;
/// Cap on every chip at one table, stacks and pot together. Any sum the
/// engine takes, including a bet level plus a raise, stays inside `u32`.
pub const MAX_TABLE_CHIPS: u32 = u32::MAX / 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub stack: u32,  // chips behind, not counting the current hand's bets
    pub cards: Vec<Card>,  // hole cards, empty or two
    pub folded: bool,
    pub all_in: bool,
    pub sitting_out: bool,
    pub went_to_showdown: bool,
    /// Won a contested pot, so the cards are face up.
    pub must_show: bool,
    pub voluntary_show: bool,
    /// Hole cards turned face up one at a time during the hand.
    pub revealed: [bool; 2],
    pub hands_won: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, stack: u32) -> Player {
        Player {
            id,
            name: name.into(),
            stack,
            cards: Vec::new(),
            folded: false,
            all_in: false,
            sitting_out: false,
            went_to_showdown: false,
            must_show: false,
            voluntary_show: false,
            revealed: [false; 2],
            hands_won: 0,
        }
    }

    /// Can be dealt into the next hand.
    pub fn is_eligible(&self) -> bool {
        !self.sitting_out && self.stack > 0
    }

    pub(crate) fn reset_for_hand(&mut self) {
        self.cards.clear();
        self.folded = false;
        self.all_in = false;
        self.went_to_showdown = false;
        self.must_show = false;
        self.voluntary_show = false;
        self.revealed = [false; 2];
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TablePhase {
    Waiting,
    Playing,
}

/// Street of the current hand. Only ever moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    /// Raise so the street bet totals this amount.
    Raise(u32),
    AllIn,
}

/// What the acting seat may do right now.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionOption {
    Fold,
    Check,
    /// Chips needed to call, capped by the stack.
    Call(u32),
    /// Range of legal street-bet totals for a raise.
    Raise { min: u32, max: u32 },
    /// Street-bet total after going all in.
    AllIn(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub max_seats: usize,
    pub small_blind: u32,
    pub big_blind: u32,
    /// Default stack for players who sit down without naming one.
    pub buy_in: u32,
    pub is_private: bool,
}

impl TableConfig {
    pub fn validate(&self) -> PokerResult<()> {
        if !(MIN_SEATS..=MAX_SEATS).contains(&self.max_seats) {
            return Err(PokerError::InvalidSettings(format!(
                "seats must be between {} and {}", MIN_SEATS, MAX_SEATS
            )));
        }
        if self.small_blind == 0 {
            return Err(PokerError::InvalidSettings("small blind must be positive".to_string()));
        }
        if self.big_blind < self.small_blind {
            return Err(PokerError::InvalidSettings("big blind is below the small blind".to_string()));
        }
        if self.buy_in == 0 {
            return Err(PokerError::InvalidSettings("buy-in must be positive".to_string()));
        }
        if self.buy_in > MAX_STACK || self.big_blind > MAX_STACK {
            return Err(PokerError::InvalidSettings(format!("blinds and buy-in are capped at {}", MAX_STACK)));
        }
        Ok(())
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig { max_seats: 6, small_blind: 10, big_blind: 20, buy_in: 1000, is_private: false }
    }
}

/// Everything about the hand being played. Players are referred to by seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandState {
    pub number: u64,
    pub(crate) deck: Deck,
    pub community: Vec<Card>,
    /// Chips collected from finished streets.
    pub pot: u32,
    pub current_bet: u32,
    pub min_raise: u32,
    /// Chips each seat has put in on this street.
    pub bets: Vec<u32>,
    /// Chips each seat has put in over the whole hand, street bets included.
    pub contributions: Vec<u32>,
    pub acted: Vec<bool>,
    /// Who was dealt in at each seat. A seat is in the hand only while this
    /// player still sits there.
    pub dealt: Vec<Option<PlayerId>>,
    /// Players who left mid-hand, kept until the pot is settled.
    pub departed: Vec<(SeatIndex, Player)>,
    pub phase: Phase,
    pub dealer_idx: SeatIndex,
    pub sb_idx: SeatIndex,
    pub bb_idx: SeatIndex,
    pub current_idx: Option<SeatIndex>,
    pub side_pots: Vec<Pot>,
    /// Set when everyone else folded.
    pub uncontested_winner: Option<SeatIndex>,
    pub settled: bool,
}

impl HandState {
    pub(crate) fn new(number: u64, deck: Deck, seats: usize, min_raise: u32) -> HandState {
        HandState {
            number,
            deck,
            community: Vec::with_capacity(5),
            pot: 0,
            current_bet: 0,
            min_raise,
            bets: vec![0; seats],
            contributions: vec![0; seats],
            acted: vec![false; seats],
            dealt: vec![None; seats],
            departed: Vec::new(),
            phase: Phase::PreFlop,
            dealer_idx: 0,
            sb_idx: 0,
            bb_idx: 0,
            current_idx: None,
            side_pots: Vec::new(),
            uncontested_winner: None,
            settled: false,
        }
    }

    /// Pot plus everything still in front of the players.
    pub fn total_pot(&self) -> u32 {
        self.pot + self.bets.iter().sum::<u32>()
    }

    /// Moves the street bets into the pot.
    pub(crate) fn collect_bets(&mut self) -> u32 {
        let collected: u32 = self.bets.iter().sum();
        self.bets.iter_mut().for_each(|bet| *bet = 0);
        self.pot += collected;
        collected
    }
}

// --- results handed back to the caller ---

/// Issued when a hand settles and another should follow after a pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextHandTicket {
    pub table_code: TableCode,
    pub after_hand: u64,
}

/// The table's decision once a hand is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfterHand {
    NextHand(NextHandTicket),
    /// Fewer than two players have chips; the table went back to waiting.
    GameOver { winner: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub name: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotResult {
    pub amount: u32,
    pub winners: Vec<SeatIndex>,
    /// Winning hand, absent when the pot was not contested at showdown.
    pub hand: Option<HandValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShownHand {
    pub seat: SeatIndex,
    pub name: String,
    pub cards: Vec<Card>,
    pub hand: HandValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandSummary {
    pub hand_number: u64,
    /// Everyone else folded; nobody had to show.
    pub uncontested: bool,
    pub winners: Vec<Winner>,
    pub pots: Vec<PotResult>,
    /// Hands turned face up because they won a contested pot.
    pub shown: Vec<ShownHand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Same street, `current_idx` moved on.
    Continue,
    StreetDealt { phase: Phase, community: Vec<Card> },
    HandComplete { summary: HandSummary, next: AfterHand },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub seat: SeatIndex,
    pub action: PlayerAction,
    /// Chips moved from the stack by this action.
    pub committed: u32,
    pub street_bet: u32,
    pub stack: u32,
    /// Pot plus street bets right after the action, before any settlement.
    pub pot: u32,
    pub round: RoundOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandStart {
    pub hand_number: u64,
    pub dealer: SeatIndex,
    pub small_blind: SeatIndex,
    pub big_blind: SeatIndex,
    /// Present when nobody could act after the blinds and the board was run out.
    pub outcome: Option<RoundOutcome>,
}

/// Result of firing a [`NextHandTicket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledStart {
    Started(HandStart),
    GameOver { winner: Option<String> },
}

/// Player removed by [`crate::Table::vacate_seat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vacated {
    pub player: Player,
    /// Set when the forced fold moved the hand along.
    pub outcome: Option<RoundOutcome>,
}

/// One row of the lobby listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub code: TableCode,
    pub host_name: String,
    pub player_count: usize,
    pub max_seats: usize,
    pub small_blind: u32,
    pub big_blind: u32,
    pub buy_in: u32,
    pub in_progress: bool,
    pub is_private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(TableConfig::default().validate().is_ok());
        let bad_seats = TableConfig { max_seats: 11, ..TableConfig::default() };
        assert!(matches!(bad_seats.validate(), Err(PokerError::InvalidSettings(_))));
        let one_seat = TableConfig { max_seats: 1, ..TableConfig::default() };
        assert!(one_seat.validate().is_err());
        let inverted = TableConfig { small_blind: 50, big_blind: 20, ..TableConfig::default() };
        assert!(inverted.validate().is_err());
        let free = TableConfig { small_blind: 0, ..TableConfig::default() };
        assert!(free.validate().is_err());
        let broke = TableConfig { buy_in: 0, ..TableConfig::default() };
        assert!(broke.validate().is_err());
    }

    #[test]
    fn test_config_caps_chip_amounts() {
        let rich = TableConfig { buy_in: MAX_STACK + 1, ..TableConfig::default() };
        assert!(matches!(rich.validate(), Err(PokerError::InvalidSettings(_))));
        let steep = TableConfig { big_blind: 3_000_000_000, ..TableConfig::default() };
        assert!(steep.validate().is_err());
        let at_cap = TableConfig { big_blind: MAX_STACK, buy_in: MAX_STACK, ..TableConfig::default() };
        assert!(at_cap.validate().is_ok());
        // a full table of capped stacks fits under the table ceiling
        assert!(MAX_SEATS as u64 * MAX_STACK as u64 <= MAX_TABLE_CHIPS as u64);
    }

    #[test]
    fn test_eligibility() {
        let mut p = Player::new(Uuid::new_v4(), "ann", 100);
        assert!(p.is_eligible());
        p.sitting_out = true;
        assert!(!p.is_eligible());
        p.sitting_out = false;
        p.stack = 0;
        assert!(!p.is_eligible());
    }

    #[test]
    fn test_collect_bets() {
        let mut hand = HandState::new(1, Deck::new(), 3, 20);
        hand.bets = vec![10, 20, 0];
        hand.pot = 5;
        assert_eq!(hand.total_pot(), 35);
        assert_eq!(hand.collect_bets(), 30);
        assert_eq!(hand.pot, 35);
        assert_eq!(hand.bets, vec![0, 0, 0]);
    }
}
