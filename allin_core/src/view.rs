use crate::card::Card;
use crate::hand::evaluate;
use crate::pot::Pot;
use crate::state::*;
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// One occupied seat as a particular viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub name: String,
    pub stack: u32,
    /// Chips in front of the player on this street.
    pub bet: u32,
    pub in_hand: bool,
    pub folded: bool,
    pub all_in: bool,
    pub sitting_out: bool,
    pub is_host: bool,
    pub hands_won: u32,
    /// `None` for a card held face down. Empty when the seat holds no cards.
    pub cards: Vec<Option<Card>>,
    /// Hand name, once the board and both hole cards are visible.
    pub hand_name: Option<String>,
    /// The viewer may still choose to show these cards.
    pub can_show: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandView {
    pub number: u64,
    pub phase: Phase,
    pub community: Vec<Card>,
    /// Collected pot plus all street bets.
    pub pot: u32,
    pub current_bet: u32,
    pub min_raise: u32,
    pub dealer: SeatIndex,
    pub small_blind: SeatIndex,
    pub big_blind: SeatIndex,
    pub current: Option<SeatIndex>,
    pub side_pots: Vec<Pot>,
    pub uncontested_winner: Option<SeatIndex>,
}

/// Snapshot of a table for one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub code: TableCode,
    pub host_name: String,
    pub config: TableConfig,
    pub phase: TablePhase,
    pub seats: Vec<Option<SeatView>>,
    pub hand: Option<HandView>,
    pub your_seat: Option<SeatIndex>,
    /// What the viewer may do, when it is their turn.
    pub legal_actions: Vec<ActionOption>,
}

impl Table {
    /// Builds the view of the table seen by `viewer`, or by a spectator when
    /// `viewer` is `None`.
    ///
    /// Hole cards are visible to their owner, to everyone once the owner must
    /// or chooses to show them at showdown, and card by card when revealed.
    pub fn public_view(&self, viewer: Option<PlayerId>) -> TableView {
        let hand = self.hand.as_ref();
        let at_showdown = hand.is_some_and(|h| h.phase == Phase::Showdown);
        let community: &[Card] = hand.map_or(&[][..], |h| h.community.as_slice());
        let your_seat = viewer.and_then(|id| self.seat_of(id));

        let seats = self
            .seats
            .iter()
            .enumerate()
            .map(|(seat, slot)| {
                let player = slot.as_ref()?;
                let is_owner = viewer == Some(player.id);
                let shown = at_showdown && (player.must_show || player.voluntary_show);
                let cards: Vec<Option<Card>> = player
                    .cards
                    .iter()
                    .enumerate()
                    .map(|(i, &card)| {
                        let visible = is_owner || shown || player.revealed.get(i).copied().unwrap_or(false);
                        visible.then_some(card)
                    })
                    .collect();

                let hand_name = if cards.len() == 2 && cards.iter().all(Option::is_some) && community.len() >= 3 {
                    let all: Vec<Card> = player.cards.iter().chain(community).copied().collect();
                    evaluate(&all).ok().map(|v| v.name().to_string())
                } else {
                    None
                };

                let in_hand = self.dealt_player(seat).is_some();
                let uncontested_winner = hand.is_some_and(|h| h.uncontested_winner == Some(seat));
                let can_show = is_owner
                    && at_showdown
                    && in_hand
                    && !player.cards.is_empty()
                    && !shown
                    && (player.went_to_showdown || uncontested_winner);

                Some(SeatView {
                    seat,
                    player_id: player.id,
                    name: player.name.clone(),
                    stack: player.stack,
                    bet: if in_hand { hand.map_or(0, |h| h.bets[seat]) } else { 0 },
                    in_hand,
                    folded: player.folded,
                    all_in: player.all_in,
                    sitting_out: player.sitting_out,
                    is_host: player.id == self.host_id,
                    hands_won: player.hands_won,
                    cards,
                    hand_name,
                    can_show,
                })
            })
            .collect();

        let hand_view = hand.map(|h| HandView {
            number: h.number,
            phase: h.phase,
            community: h.community.clone(),
            pot: h.total_pot(),
            current_bet: h.current_bet,
            min_raise: h.min_raise,
            dealer: h.dealer_idx,
            small_blind: h.sb_idx,
            big_blind: h.bb_idx,
            current: h.current_idx,
            side_pots: h.side_pots.clone(),
            uncontested_winner: h.uncontested_winner,
        });

        TableView {
            code: self.code.clone(),
            host_name: self.host_name.clone(),
            config: self.config.clone(),
            phase: self.phase,
            seats,
            hand: hand_view,
            your_seat,
            legal_actions: your_seat.map(|s| self.legal_actions(s)).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn two_player_table() -> (Table, PlayerId, PlayerId) {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut table = Table::new("VIEW23", a, "ann", TableConfig::default()).unwrap();
        table.seat_player(0, Player::new(a, "ann", 1000)).unwrap();
        table.seat_player(1, Player::new(b, "bob", 1000)).unwrap();
        (table, a, b)
    }

    fn visible(view: &TableView, seat: SeatIndex) -> usize {
        view.seats[seat].as_ref().unwrap().cards.iter().filter(|c| c.is_some()).count()
    }

    #[test]
    fn test_owner_sees_own_cards_only() {
        let (mut table, a, _) = two_player_table();
        table.start_hand().unwrap();
        let view = table.public_view(Some(a));
        assert_eq!(view.your_seat, Some(0));
        assert_eq!(visible(&view, 0), 2);
        assert_eq!(visible(&view, 1), 0);
        assert_eq!(view.seats[1].as_ref().unwrap().cards.len(), 2);
        assert!(view.seats[0].as_ref().unwrap().is_host);

        let spectator = table.public_view(None);
        assert_eq!(spectator.your_seat, None);
        assert_eq!(visible(&spectator, 0), 0);
        assert_eq!(visible(&spectator, 1), 0);
        assert!(spectator.legal_actions.is_empty());
    }

    #[test]
    fn test_revealed_card_is_visible_to_all() {
        let (mut table, a, _) = two_player_table();
        table.start_hand().unwrap();
        table.reveal_card(1, 0, true).unwrap();
        let view = table.public_view(Some(a));
        let cards = &view.seats[1].as_ref().unwrap().cards;
        assert!(cards[0].is_some());
        assert!(cards[1].is_none());
    }

    #[test]
    fn test_actor_sees_legal_actions() {
        let (mut table, _, b) = two_player_table();
        table.start_hand().unwrap();
        // heads-up, seat 1 deals and acts first
        let view = table.public_view(Some(b));
        assert_eq!(view.hand.as_ref().unwrap().current, Some(1));
        assert_eq!(view.hand.as_ref().unwrap().pot, 30);
        assert!(view.legal_actions.contains(&ActionOption::Call(10)));
        assert_eq!(view.seats[1].as_ref().unwrap().bet, 10);
    }

    #[test]
    fn test_uncontested_winner_may_show() {
        let (mut table, a, b) = two_player_table();
        table.start_hand().unwrap();
        table.submit_action(1, PlayerAction::Fold).unwrap();

        let winner_view = table.public_view(Some(a));
        assert!(winner_view.seats[0].as_ref().unwrap().can_show);
        let loser_view = table.public_view(Some(b));
        assert_eq!(visible(&loser_view, 0), 0);
        assert!(!loser_view.seats[1].as_ref().unwrap().can_show);

        table.show_cards(0).unwrap();
        let loser_view = table.public_view(Some(b));
        assert_eq!(visible(&loser_view, 0), 2);
        assert!(!table.public_view(Some(a)).seats[0].as_ref().unwrap().can_show);
    }

    #[test]
    fn test_contested_winner_is_shown() {
        let (mut table, _, _) = two_player_table();
        table.start_hand().unwrap();
        table.submit_action(1, PlayerAction::AllIn).unwrap();
        table.submit_action(0, PlayerAction::Call).unwrap();
        let view = table.public_view(None);
        let shown: Vec<SeatIndex> = table
            .seats()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.as_ref().is_some_and(|p| p.must_show))
            .map(|(i, _)| i)
            .collect();
        assert!(!shown.is_empty());
        for seat in shown {
            assert_eq!(visible(&view, seat), 2);
            assert!(view.seats[seat].as_ref().unwrap().hand_name.is_some());
        }
    }
}
