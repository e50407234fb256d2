use crate::card::{Card, Deck};
use crate::error::{PokerError, PokerResult};
use crate::hand::{HandValue, evaluate};
use crate::pot::{Contribution, Pot, compute_side_pots};
use crate::state::*;
use crate::table::Table;
use tracing::{debug, info, warn};

// --- betting engine ---

impl HandState {
    /// Burns one card and turns the next street face up.
    fn deal_street(&mut self) {
        let count = if self.community.is_empty() { 3 } else { 1 };
        self.deck.burn();
        for _ in 0..count {
            if let Some(card) = self.deck.draw() {
                self.community.push(card);
            }
        }
    }
}

impl Table {
    /// The player dealt in at `seat`, as long as they still sit there.
    pub(crate) fn dealt_player(&self, seat: SeatIndex) -> Option<&Player> {
        let id = self.hand.as_ref()?.dealt.get(seat).copied().flatten()?;
        self.player(seat).filter(|p| p.id == id)
    }

    /// Still contesting the pot.
    pub(crate) fn is_live(&self, seat: SeatIndex) -> bool {
        self.dealt_player(seat).is_some_and(|p| !p.folded)
    }

    /// Live and holding chips, so a decision can be asked of this seat.
    pub(crate) fn can_act(&self, seat: SeatIndex) -> bool {
        self.dealt_player(seat).is_some_and(|p| !p.folded && !p.all_in)
    }

    pub(crate) fn live_seats(&self) -> Vec<SeatIndex> {
        (0..self.seats.len()).filter(|&s| self.is_live(s)).collect()
    }

    /// First seat clockwise after `from` that satisfies `pred`, `from` itself last.
    pub(crate) fn next_seat_where(&self, from: SeatIndex, pred: impl Fn(SeatIndex) -> bool) -> Option<SeatIndex> {
        let n = self.seats.len();
        (1..=n).map(|step| (from + step) % n).find(|&s| pred(s))
    }

    /// Moves up to `amount` chips from the seat's stack into its street bet.
    /// Returns the chips actually moved.
    fn commit(&mut self, seat: SeatIndex, amount: u32) -> u32 {
        let (Some(hand), Some(player)) = (self.hand.as_mut(), self.seats.get_mut(seat).and_then(Option::as_mut)) else {
            return 0;
        };
        let chips = amount.min(player.stack);
        player.stack -= chips;
        hand.bets[seat] += chips;
        hand.contributions[seat] += chips;
        if player.stack == 0 {
            player.all_in = true;
        }
        chips
    }

    /// Deals a hand from `deck`: moves the button, posts the blinds and deals
    /// hole cards.
    ///
    /// Every check runs before anything changes, so an error leaves the table
    /// as it was. The deck must hold enough cards for the whole hand.
    pub fn start_hand_with(&mut self, deck: Deck) -> PokerResult<HandStart> {
        if self.hand_in_progress() {
            return Err(PokerError::HandInProgress);
        }
        let eligible = self.eligible_seats();
        if eligible.len() < 2 {
            return Err(PokerError::NotEnoughPlayers);
        }
        // hole cards, board, three burns
        let needed = eligible.len() * 2 + 8;
        if deck.len() < needed {
            return Err(PokerError::DeckTooSmall { needed, available: deck.len() });
        }

        let next_eligible = |from: SeatIndex| {
            self.next_seat_where(from, |s| eligible.contains(&s)).ok_or(PokerError::NotEnoughPlayers)
        };
        let dealer = next_eligible(self.button)?;
        let (sb, bb) = if eligible.len() == 2 {
            // heads-up: the dealer posts the small blind
            (dealer, next_eligible(dealer)?)
        } else {
            let sb = next_eligible(dealer)?;
            (sb, next_eligible(sb)?)
        };

        self.pending_next_hand = None;
        self.phase = TablePhase::Playing;
        self.button = dealer;
        self.hands_played += 1;
        for player in self.seats.iter_mut().flatten() {
            player.reset_for_hand();
        }

        let mut hand = HandState::new(self.hands_played, deck, self.seats.len(), self.config.big_blind);
        hand.dealer_idx = dealer;
        hand.sb_idx = sb;
        hand.bb_idx = bb;
        for &seat in &eligible {
            if let Some(player) = self.seats[seat].as_mut() {
                player.cards = (0..2).filter_map(|_| hand.deck.draw()).collect();
                hand.dealt[seat] = Some(player.id);
            }
        }
        self.hand = Some(hand);

        let sb_posted = self.commit(sb, self.config.small_blind);
        let bb_posted = self.commit(bb, self.config.big_blind);
        let current_bet = sb_posted.max(bb_posted);
        let actors: Vec<SeatIndex> = eligible.iter().copied().filter(|&s| self.can_act(s)).collect();
        let first = self.next_seat_where(bb, |s| self.can_act(s));
        let nobody_to_act = match actors.as_slice() {
            [] => true,
            [only] => self.hand.as_ref().is_some_and(|h| h.bets[*only] >= current_bet),
            _ => false,
        };
        if let Some(hand) = self.hand.as_mut() {
            hand.current_bet = current_bet;
        }

        info!(
            table = %self.code, hand = self.hands_played, dealer, sb, bb,
            players = eligible.len(), "hand started"
        );

        let outcome = if nobody_to_act {
            debug!(table = %self.code, "no one can act after the blinds, running the board out");
            Some(self.run_out())
        } else {
            if let Some(hand) = self.hand.as_mut() {
                hand.current_idx = first;
            }
            None
        };

        Ok(HandStart {
            hand_number: self.hands_played,
            dealer,
            small_blind: sb,
            big_blind: bb,
            outcome,
        })
    }

    /// Applies one betting action for the seat whose turn it is.
    ///
    /// A rejected action returns an error and changes nothing.
    pub fn submit_action(&mut self, seat: SeatIndex, action: PlayerAction) -> PokerResult<ActionOutcome> {
        if seat >= self.seats.len() {
            return Err(PokerError::InvalidSeat(seat));
        }
        let hand = self.hand.as_ref().filter(|h| !h.settled).ok_or(PokerError::NoHandInProgress)?;
        if hand.current_idx != Some(seat) {
            return Err(PokerError::NotYourTurn { seat, current: hand.current_idx });
        }
        let player = self
            .dealt_player(seat)
            .filter(|p| !p.folded && !p.all_in)
            .ok_or(PokerError::CannotAct(seat))?;

        let bet = hand.bets[seat];
        let stack = player.stack;
        let to_call = hand.current_bet.saturating_sub(bet);

        // chips this action moves from the stack
        let chips = match action {
            PlayerAction::Fold => 0,
            PlayerAction::Check => {
                if to_call > 0 {
                    return Err(PokerError::CannotCheck { to_call });
                }
                0
            }
            PlayerAction::Call => to_call.min(stack),
            PlayerAction::Raise(amount) => {
                let available = bet + stack;
                let minimum = hand.current_bet + hand.min_raise;
                if amount > available {
                    return Err(PokerError::InsufficientChips { amount, available });
                }
                if amount == available {
                    // all in, legal at any size
                    stack
                } else if amount < minimum {
                    return Err(PokerError::RaiseTooSmall { amount, minimum });
                } else {
                    amount - bet
                }
            }
            PlayerAction::AllIn => stack,
        };

        if action == PlayerAction::Fold {
            if let Some(player) = self.seats[seat].as_mut() {
                player.folded = true;
            }
        }
        let committed = self.commit(seat, chips);

        let hand = self.hand.as_mut().ok_or(PokerError::NoHandInProgress)?;
        let street_bet = hand.bets[seat];
        if street_bet > hand.current_bet {
            let raised_by = street_bet - hand.current_bet;
            // only a full raise reopens the betting
            if raised_by >= hand.min_raise {
                hand.min_raise = raised_by;
                hand.acted.fill(false);
            }
            hand.current_bet = street_bet;
        }
        hand.acted[seat] = true;

        let pot = hand.total_pot();
        let stack = self.player(seat).map_or(0, |p| p.stack);
        debug!(table = %self.code, seat, ?action, committed, street_bet, stack, "action applied");

        let round = self.resolve_round(seat);
        Ok(ActionOutcome { seat, action, committed, street_bet, stack, pot, round })
    }

    /// What `seat` may do right now. Empty unless it is that seat's turn.
    pub fn legal_actions(&self, seat: SeatIndex) -> Vec<ActionOption> {
        let Some(hand) = self.hand.as_ref().filter(|h| !h.settled && h.current_idx == Some(seat)) else {
            return Vec::new();
        };
        let Some(player) = self.dealt_player(seat).filter(|p| !p.folded && !p.all_in) else {
            return Vec::new();
        };

        let bet = hand.bets[seat];
        let to_call = hand.current_bet.saturating_sub(bet);
        let all_in_total = bet + player.stack;
        let min_raise_to = hand.current_bet + hand.min_raise;

        let mut options = vec![ActionOption::Fold];
        if to_call == 0 {
            options.push(ActionOption::Check);
        } else {
            options.push(ActionOption::Call(to_call.min(player.stack)));
        }
        if all_in_total >= min_raise_to {
            options.push(ActionOption::Raise { min: min_raise_to, max: all_in_total });
        }
        options.push(ActionOption::AllIn(all_in_total));
        options
    }

    /// Decides what follows the action (or forced fold) of seat `last`.
    pub(crate) fn resolve_round(&mut self, last: SeatIndex) -> RoundOutcome {
        let live = self.live_seats();
        if let [winner] = live.as_slice() {
            let summary = self.award_uncontested(*winner);
            return self.conclude(summary);
        }

        let Some(hand) = self.hand.as_ref() else {
            return RoundOutcome::Continue;
        };
        let actors: Vec<SeatIndex> = (0..self.seats.len()).filter(|&s| self.can_act(s)).collect();
        let owes = |s: SeatIndex| !hand.acted[s] || hand.bets[s] < hand.current_bet;
        // a lone player with chips has no one left to bet against
        let lone_actor_matched = matches!(actors.as_slice(), [only] if hand.bets[*only] >= hand.current_bet);

        if !lone_actor_matched && actors.iter().any(|&s| owes(s)) {
            let next = self.next_seat_where(last, |s| self.can_act(s) && owes(s));
            if let Some(hand) = self.hand.as_mut() {
                hand.current_idx = next;
            }
            return RoundOutcome::Continue;
        }

        if actors.len() <= 1 { self.run_out() } else { self.advance_street() }
    }

    fn advance_street(&mut self) -> RoundOutcome {
        let Some(hand) = self.hand.as_mut() else {
            return RoundOutcome::Continue;
        };
        let phase = hand.phase;
        let next = match phase {
            Phase::PreFlop => Phase::Flop,
            Phase::Flop => Phase::Turn,
            Phase::Turn => Phase::River,
            Phase::River | Phase::Showdown => {
                let summary = self.showdown();
                return self.conclude(summary);
            }
        };

        hand.collect_bets();
        hand.current_bet = 0;
        hand.min_raise = self.config.big_blind;
        hand.acted.fill(false);
        hand.deal_street();
        hand.phase = next;
        let dealer = hand.dealer_idx;
        let community = hand.community.clone();

        let first = self.next_seat_where(dealer, |s| self.can_act(s));
        if let Some(hand) = self.hand.as_mut() {
            hand.current_idx = first;
        }
        debug!(table = %self.code, phase = ?next, board = %crate::card::format_cards(&community), "street dealt");
        RoundOutcome::StreetDealt { phase: next, community }
    }

    /// Deals the rest of the board without further betting, then shows down.
    fn run_out(&mut self) -> RoundOutcome {
        if let Some(hand) = self.hand.as_mut() {
            hand.current_idx = None;
            while hand.community.len() < 5 && !hand.deck.is_empty() {
                hand.deal_street();
            }
        }
        let summary = self.showdown();
        self.conclude(summary)
    }

    /// Gives the whole pot to the last player standing. No cards are shown.
    pub(crate) fn award_uncontested(&mut self, winner: SeatIndex) -> HandSummary {
        let Some(hand) = self.hand.as_mut() else {
            return HandSummary::default();
        };
        hand.collect_bets();
        let amount = hand.pot;
        hand.pot = 0;
        hand.phase = Phase::Showdown;
        hand.current_idx = None;
        hand.uncontested_winner = Some(winner);
        hand.side_pots = vec![Pot { amount, eligible: vec![winner] }];
        hand.settled = true;
        let hand_number = hand.number;

        let mut winners = Vec::with_capacity(1);
        if let Some(player) = self.seats.get_mut(winner).and_then(Option::as_mut) {
            player.stack += amount;
            player.hands_won += 1;
            winners.push(Winner { seat: winner, player_id: player.id, name: player.name.clone(), amount });
            info!(table = %self.code, hand = hand_number, seat = winner, amount, "pot awarded uncontested");
        }

        HandSummary {
            hand_number,
            uncontested: true,
            winners,
            pots: vec![PotResult { amount, winners: vec![winner], hand: None }],
            shown: Vec::new(),
        }
    }

    /// Evaluates every live hand and awards each pot layer on its own.
    fn showdown(&mut self) -> HandSummary {
        let live = self.live_seats();
        let n = self.seats.len();
        let Some(hand) = self.hand.as_mut() else {
            return HandSummary::default();
        };
        hand.collect_bets();
        hand.phase = Phase::Showdown;
        hand.current_idx = None;
        let hand_number = hand.number;
        let community = hand.community.clone();
        // seats whose dealt-in player is gone count as folded
        let contributions: Vec<Contribution> = hand
            .contributions
            .iter()
            .enumerate()
            .map(|(seat, &amount)| Contribution { seat, amount, folded: !live.contains(&seat) })
            .collect();
        let pots = compute_side_pots(&contributions);

        let mut values: Vec<Option<HandValue>> = vec![None; n];
        for &seat in &live {
            if let Some(player) = self.seats[seat].as_mut() {
                player.went_to_showdown = true;
                let cards: Vec<Card> = player.cards.iter().chain(&community).copied().collect();
                values[seat] = evaluate(&cards).ok();
            }
        }

        let mut won = vec![0u32; n];
        // chips taken from a contested pot; a lone seat's own excess does not count as a win
        let mut won_contested = vec![0u32; n];
        let mut pot_results = Vec::with_capacity(pots.len());
        for pot in &pots {
            let best = pot.eligible.iter().filter_map(|&s| values[s]).max();
            let winners: Vec<SeatIndex> =
                pot.eligible.iter().copied().filter(|&s| best.is_some() && values[s] == best).collect();
            if winners.is_empty() {
                warn!(table = %self.code, amount = pot.amount, "pot has no eligible winner");
                continue;
            }
            let share = pot.amount / winners.len() as u32;
            let remainder = pot.amount % winners.len() as u32;
            // odd chips go to the first winner in seat order
            for (i, &seat) in winners.iter().enumerate() {
                let amount = share + if i == 0 { remainder } else { 0 };
                won[seat] += amount;
                if pot.is_contested() {
                    won_contested[seat] += amount;
                    if let Some(player) = self.seats[seat].as_mut() {
                        player.must_show = true;
                    }
                }
            }
            pot_results.push(PotResult {
                amount: pot.amount,
                winners,
                hand: best.filter(|_| pot.is_contested()),
            });
        }

        let mut winners = Vec::new();
        let mut shown = Vec::new();
        for (seat, slot) in self.seats.iter_mut().enumerate() {
            let Some(player) = slot.as_mut() else { continue };
            player.stack += won[seat];
            if won_contested[seat] > 0 {
                player.hands_won += 1;
                winners.push(Winner { seat, player_id: player.id, name: player.name.clone(), amount: won_contested[seat] });
            }
            if let (true, Some(value)) = (player.must_show, values[seat]) {
                shown.push(ShownHand { seat, name: player.name.clone(), cards: player.cards.clone(), hand: value });
            }
        }

        if let Some(hand) = self.hand.as_mut() {
            hand.pot = 0;
            hand.side_pots = pots;
            hand.settled = true;
        }
        info!(
            table = %self.code, hand = hand_number,
            winners = ?winners.iter().map(|w| (w.seat, w.amount)).collect::<Vec<_>>(),
            "showdown settled"
        );

        HandSummary { hand_number, uncontested: false, winners, pots: pot_results, shown }
    }
}
