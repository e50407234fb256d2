use crate::card::{Card, Deck};
use crate::error::{PokerError, PokerResult};
use crate::state::*;
use tracing::{debug, info};

/// One poker table: its seats, settings and the hand being played.
///
/// A `Table` performs no I/O and no locking; the caller serializes access.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) code: TableCode,
    pub(crate) host_id: PlayerId,
    pub(crate) host_name: String,
    pub(crate) config: TableConfig,
    pub(crate) phase: TablePhase,
    pub(crate) seats: Vec<Option<Player>>,
    pub(crate) hand: Option<HandState>,
    /// Dealer of the previous hand. The next button is the first eligible seat after it.
    pub(crate) button: SeatIndex,
    pub(crate) hands_played: u64,
    pub(crate) pending_next_hand: Option<NextHandTicket>,
}

impl Table {
    pub fn new(
        code: impl Into<TableCode>,
        host_id: PlayerId,
        host_name: impl Into<String>,
        config: TableConfig,
    ) -> PokerResult<Table> {
        config.validate()?;
        let code = code.into();
        info!(table = %code, seats = config.max_seats, sb = config.small_blind, bb = config.big_blind, "table created");
        Ok(Table {
            code,
            host_id,
            host_name: host_name.into(),
            seats: vec![None; config.max_seats],
            config,
            phase: TablePhase::Waiting,
            hand: None,
            button: 0,
            hands_played: 0,
            pending_next_hand: None,
        })
    }

    // --- accessors ---

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host_id(&self) -> PlayerId {
        self.host_id
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn set_host(&mut self, id: PlayerId, name: impl Into<String>) {
        self.host_id = id;
        self.host_name = name.into();
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn phase(&self) -> TablePhase {
        self.phase
    }

    pub fn seats(&self) -> &[Option<Player>] {
        &self.seats
    }

    pub fn player(&self, seat: SeatIndex) -> Option<&Player> {
        self.seats.get(seat).and_then(Option::as_ref)
    }

    pub fn hand(&self) -> Option<&HandState> {
        self.hand.as_ref()
    }

    pub fn hands_played(&self) -> u64 {
        self.hands_played
    }

    pub fn pending_next_hand(&self) -> Option<&NextHandTicket> {
        self.pending_next_hand.as_ref()
    }

    /// A hand has been dealt and its pot is not settled yet.
    pub fn hand_in_progress(&self) -> bool {
        self.hand.as_ref().is_some_and(|h| !h.settled)
    }

    pub fn seat_of(&self, id: PlayerId) -> Option<SeatIndex> {
        self.seats.iter().position(|s| s.as_ref().is_some_and(|p| p.id == id))
    }

    pub fn first_free_seat(&self) -> Option<SeatIndex> {
        self.seats.iter().position(Option::is_none)
    }

    pub fn player_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.player_count() == 0
    }

    /// Seats that would be dealt into a hand starting now.
    pub fn eligible_seats(&self) -> Vec<SeatIndex> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_ref().is_some_and(Player::is_eligible))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            code: self.code.clone(),
            host_name: self.host_name.clone(),
            player_count: self.player_count(),
            max_seats: self.config.max_seats,
            small_blind: self.config.small_blind,
            big_blind: self.config.big_blind,
            buy_in: self.config.buy_in,
            in_progress: self.phase == TablePhase::Playing,
            is_private: self.config.is_private,
        }
    }

    /// Every chip at the table: seated stacks plus whatever sits in the pot.
    fn chips_in_play(&self) -> u64 {
        let stacks: u64 = self.seats.iter().flatten().map(|p| p.stack as u64).sum();
        let pot = self.hand.as_ref().map_or(0, |h| h.pot as u64 + h.bets.iter().map(|&b| b as u64).sum::<u64>());
        stacks + pot
    }

    fn check_seat(&self, seat: SeatIndex) -> PokerResult<()> {
        if seat < self.seats.len() { Ok(()) } else { Err(PokerError::InvalidSeat(seat)) }
    }

    // --- seating ---

    /// Sits `player` at `seat`. Players arriving mid-hand sit out until they sit in.
    pub fn seat_player(&mut self, seat: SeatIndex, mut player: Player) -> PokerResult<()> {
        self.check_seat(seat)?;
        if let Some(existing) = self.seat_of(player.id) {
            return Err(PokerError::AlreadySeated(existing));
        }
        if self.seats[seat].is_some() {
            return Err(PokerError::SeatOccupied(seat));
        }
        let headroom = (MAX_TABLE_CHIPS as u64).saturating_sub(self.chips_in_play());
        let max = (MAX_STACK as u64).min(headroom) as u32;
        if player.stack > max {
            return Err(PokerError::StackTooLarge { stack: player.stack, max });
        }
        player.reset_for_hand();
        if self.hand_in_progress() {
            player.sitting_out = true;
        }
        info!(table = %self.code, seat, player = %player.name, stack = player.stack, sitting_out = player.sitting_out, "player seated");
        self.seats[seat] = Some(player);
        Ok(())
    }

    /// Sits `player` at the first free seat.
    pub fn join(&mut self, player: Player) -> PokerResult<SeatIndex> {
        if let Some(existing) = self.seat_of(player.id) {
            return Err(PokerError::AlreadySeated(existing));
        }
        let seat = self.first_free_seat().ok_or(PokerError::TableFull)?;
        self.seat_player(seat, player)?;
        Ok(seat)
    }

    pub fn move_player(&mut self, from: SeatIndex, to: SeatIndex) -> PokerResult<()> {
        self.check_seat(from)?;
        self.check_seat(to)?;
        if self.seats[from].is_none() {
            return Err(PokerError::EmptySeat(from));
        }
        if self.seats[to].is_some() {
            return Err(PokerError::SeatOccupied(to));
        }
        if self.hand_in_progress() && self.is_live(from) {
            return Err(PokerError::CannotMoveDuringHand);
        }
        let player = self.seats[from].take();
        self.seats[to] = player;
        debug!(table = %self.code, from, to, "player moved");
        Ok(())
    }

    /// Removes whoever sits at `seat`.
    ///
    /// A player still in a hand is folded first. Their chips stay in the pot
    /// and their record is kept with the hand until it settles.
    pub fn vacate_seat(&mut self, seat: SeatIndex) -> PokerResult<Vacated> {
        self.check_seat(seat)?;
        if self.seats[seat].is_none() {
            return Err(PokerError::EmptySeat(seat));
        }

        if !(self.hand_in_progress() && self.is_live(seat)) {
            let player = self.seats[seat].take().ok_or(PokerError::EmptySeat(seat))?;
            info!(table = %self.code, seat, player = %player.name, "player left");
            return Ok(Vacated { player, outcome: None });
        }

        let was_turn = self.hand.as_ref().is_some_and(|h| h.current_idx == Some(seat));
        let mut player = self.seats[seat].take().ok_or(PokerError::EmptySeat(seat))?;
        player.folded = true;
        if let Some(hand) = self.hand.as_mut() {
            hand.departed.push((seat, player.clone()));
        }
        info!(table = %self.code, seat, player = %player.name, was_turn, "player left mid-hand, folded");

        let outcome = if was_turn {
            Some(self.resolve_round(seat))
        } else {
            match self.live_seats().as_slice() {
                [winner] => {
                    let summary = self.award_uncontested(*winner);
                    Some(self.conclude(summary))
                }
                _ => None,
            }
        };
        Ok(Vacated { player, outcome })
    }

    /// Clears sitting-out for `seat`, then starts a hand if the table is idle.
    pub fn sit_in(&mut self, seat: SeatIndex) -> PokerResult<Option<HandStart>> {
        self.check_seat(seat)?;
        let player = self.seats[seat].as_mut().ok_or(PokerError::EmptySeat(seat))?;
        player.sitting_out = false;
        debug!(table = %self.code, seat, "player sat in");
        Ok(self.try_auto_start())
    }

    // --- hand lifecycle ---

    /// Deals a new hand from a freshly shuffled deck.
    pub fn start_hand(&mut self) -> PokerResult<HandStart> {
        self.start_hand_with(Deck::shuffled(&mut rand::rng()))
    }

    /// Starts a hand if the table is waiting and at least two players can play.
    pub fn try_auto_start(&mut self) -> Option<HandStart> {
        if self.phase != TablePhase::Waiting || self.hand_in_progress() || self.eligible_seats().len() < 2 {
            return None;
        }
        self.start_hand().ok()
    }

    /// Wraps a settled hand with the end-of-hand bookkeeping.
    pub(crate) fn conclude(&mut self, summary: HandSummary) -> RoundOutcome {
        let next = self.finish_hand();
        RoundOutcome::HandComplete { summary, next }
    }

    fn finish_hand(&mut self) -> AfterHand {
        for player in self.seats.iter_mut().flatten() {
            if player.stack == 0 {
                player.sitting_out = true;
            }
        }

        if self.eligible_seats().len() < 2 {
            return self.stop();
        }

        let ticket = NextHandTicket {
            table_code: self.code.clone(),
            after_hand: self.hands_played,
        };
        self.pending_next_hand = Some(ticket.clone());
        AfterHand::NextHand(ticket)
    }

    /// Puts the table back to waiting.
    fn stop(&mut self) -> AfterHand {
        self.phase = TablePhase::Waiting;
        self.pending_next_hand = None;
        let winner = self.seats.iter().flatten().find(|p| p.stack > 0).map(|p| p.name.clone());
        info!(table = %self.code, winner = ?winner, "game over");
        AfterHand::GameOver { winner }
    }

    /// Fires a ticket issued at the end of a hand.
    ///
    /// Returns `None` when the ticket is no longer the pending one.
    pub fn start_scheduled_hand(&mut self, ticket: &NextHandTicket) -> Option<ScheduledStart> {
        if self.pending_next_hand.as_ref() != Some(ticket) {
            debug!(table = %self.code, after_hand = ticket.after_hand, "stale next-hand ticket ignored");
            return None;
        }
        self.pending_next_hand = None;
        match self.start_hand() {
            Ok(start) => Some(ScheduledStart::Started(start)),
            Err(_) => match self.stop() {
                AfterHand::GameOver { winner } => Some(ScheduledStart::GameOver { winner }),
                AfterHand::NextHand(_) => None,
            },
        }
    }

    pub fn cancel_scheduled_hand(&mut self) -> Option<NextHandTicket> {
        self.pending_next_hand.take()
    }

    // --- reveals ---

    /// Turns one hole card face up, or back down, for everyone.
    pub fn reveal_card(&mut self, seat: SeatIndex, card_index: usize, revealed: bool) -> PokerResult<Card> {
        self.check_seat(seat)?;
        let player = self.seats[seat].as_mut().ok_or(PokerError::EmptySeat(seat))?;
        if player.cards.is_empty() {
            return Err(PokerError::NothingToShow(seat));
        }
        let card = *player.cards.get(card_index).ok_or(PokerError::InvalidCardIndex(card_index))?;
        player.revealed[card_index] = revealed;
        Ok(card)
    }

    /// Opts into showing both hole cards after the hand.
    pub fn show_cards(&mut self, seat: SeatIndex) -> PokerResult<Vec<Card>> {
        self.check_seat(seat)?;
        let hand = self.hand.as_ref().filter(|h| h.phase == Phase::Showdown).ok_or(PokerError::NotAtShowdown)?;
        let uncontested_winner = hand.uncontested_winner == Some(seat);
        if self.dealt_player(seat).is_none() {
            return Err(PokerError::NothingToShow(seat));
        }
        let player = self.seats[seat].as_mut().ok_or(PokerError::EmptySeat(seat))?;
        if player.cards.is_empty() {
            return Err(PokerError::NothingToShow(seat));
        }
        if !player.went_to_showdown && !uncontested_winner {
            return Err(PokerError::CannotShow(seat));
        }
        player.voluntary_show = true;
        Ok(player.cards.clone())
    }
}
