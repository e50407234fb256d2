use crate::card::{Card, Rank};
use crate::error::PokerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hand category, from weakest to strongest.
/// The discriminant is the category rank, 1 to 10.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum HandCategory {
    HighCard = 1,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl HandCategory {
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::Pair => "Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
            HandCategory::RoyalFlush => "Royal Flush",
        }
    }
}

/// Strength of a five-card hand.
///
/// Ordering is lexicographic on `(category, tiebreak)`, so two values compare
/// equal exactly when the hands split a pot. `tiebreak` packs the deciding
/// rank values (two = 0 .. ace = 12) in base 16, most significant first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct HandValue {
    pub category: HandCategory,
    pub tiebreak: u32,
}

impl HandValue {
    pub fn name(&self) -> &'static str {
        self.category.name()
    }
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

const RADIX: u32 = 16;

fn pack(ranks: &[Rank]) -> u32 {
    ranks.iter().fold(0, |acc, r| acc * RADIX + u32::from(r.value()))
}

/// Finds the strongest five-card hand among 5 to 7 cards.
///
/// Every five-card subset is scored, so the result does not depend on the
/// order of `all_cards`.
pub fn evaluate(all_cards: &[Card]) -> Result<HandValue, PokerError> {
    let card_count = all_cards.len();
    if !(5..=7).contains(&card_count) {
        return Err(PokerError::InvalidCardCount(card_count));
    }

    let best = combinations(all_cards, 5)
        .iter()
        .map(|hand| evaluate_five(hand))
        .max();
    best.ok_or(PokerError::InvalidCardCount(card_count))
}

fn evaluate_five(hand: &[Card]) -> HandValue {
    let mut cards = hand.to_vec();
    // high to low
    cards.sort_by(|a, b| b.rank.cmp(&a.rank));
    let ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();

    let is_flush = cards.windows(2).all(|w| w[0].suit == w[1].suit);

    let is_wheel = ranks == [Rank::Ace, Rank::Five, Rank::Four, Rank::Three, Rank::Two];
    let is_straight = is_wheel || ranks.windows(2).all(|w| w[0] as u8 == w[1] as u8 + 1);
    // in the wheel the five is the top card
    let high_card = if is_wheel { Rank::Five } else { ranks[0] };

    if is_straight && is_flush {
        let category = if high_card == Rank::Ace {
            HandCategory::RoyalFlush
        } else {
            HandCategory::StraightFlush
        };
        return HandValue { category, tiebreak: pack(&[high_card]) };
    }

    // (count, rank) pairs, most frequent first, then highest rank first
    let mut groups: Vec<(u8, Rank)> = Vec::with_capacity(5);
    for &rank in &ranks {
        match groups.iter_mut().find(|(_, r)| *r == rank) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, rank)),
        }
    }
    groups.sort_by(|a, b| b.cmp(a));
    let grouped: Vec<Rank> = groups.iter().map(|&(_, r)| r).collect();

    let category = match (groups[0].0, groups.get(1).map(|g| g.0)) {
        (4, _) => HandCategory::FourOfAKind,
        (3, Some(2)) => HandCategory::FullHouse,
        _ if is_flush => HandCategory::Flush,
        _ if is_straight => HandCategory::Straight,
        (3, _) => HandCategory::ThreeOfAKind,
        (2, Some(2)) => HandCategory::TwoPair,
        (2, _) => HandCategory::Pair,
        _ => HandCategory::HighCard,
    };

    let tiebreak = match category {
        HandCategory::Straight => pack(&[high_card]),
        HandCategory::Flush | HandCategory::HighCard => pack(&ranks),
        // groups are already ordered by significance
        _ => pack(&grouped),
    };
    HandValue { category, tiebreak }
}

/// All subsets of size `k`, preserving input order within each subset.
fn combinations<T: Clone>(data: &[T], k: usize) -> Vec<Vec<T>> {
    if k == 0 {
        return vec![vec![]];
    }
    if data.len() < k {
        return vec![];
    }

    let mut result = vec![];
    let (first, rest) = data.split_at(1);

    let mut with_first = combinations(rest, k - 1);
    for combo in &mut with_first {
        combo.insert(0, first[0].clone());
    }
    result.append(&mut with_first);

    if data.len() > k {
        result.append(&mut combinations(rest, k));
    }

    result
}
