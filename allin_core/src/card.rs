use crate::error::PokerError;
use rand::Rng;
use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Suit
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Heart,   // h ♥
    Diamond, // d ♦
    Club,    // c ♣
    Spade,   // s ♠
}

/// Rank
/// Ace is high by default; the wheel straight is handled by the evaluator.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];

    /// Positional value, `Two` is 0 and `Ace` is 12.
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// A single playing card.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Heart => "♥",
            Suit::Diamond => "♦",
            Suit::Club => "♣",
            Suit::Spade => "♠",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "T",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// Parses the short form, rank then suit letter: `As`, `Td`, `2c`.
impl FromStr for Card {
    type Err = PokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(r), Some(su), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(PokerError::InvalidCard(s.to_string()));
        };
        let rank = match r.to_ascii_uppercase() {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return Err(PokerError::InvalidCard(s.to_string())),
        };
        let suit = match su.to_ascii_lowercase() {
            'h' => Suit::Heart,
            'd' => Suit::Diamond,
            'c' => Suit::Club,
            's' => Suit::Spade,
            _ => return Err(PokerError::InvalidCard(s.to_string())),
        };
        Ok(Card { rank, suit })
    }
}

/// Formats cards separated by spaces, e.g. `A♠ K♥`.
pub fn format_cards(cards: &[Card]) -> String {
    cards.iter().map(Card::to_string).collect::<Vec<_>>().join(" ")
}

// --- Deck ---

/// The cards left to deal in the current hand. Cards come off the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A full 52-card deck in suit-major order.
    pub fn new() -> Deck {
        let mut cards = Vec::with_capacity(52);
        for &suit in &Suit::ALL {
            for &rank in &Rank::ALL {
                cards.push(Card { rank, suit });
            }
        }
        Deck { cards }
    }

    /// A full deck in a uniformly random order.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Deck {
        let mut deck = Deck::new();
        deck.shuffle(rng);
        deck
    }

    /// Fisher-Yates shuffle of the remaining cards.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// A deck that deals `top` first, in order, followed by the rest of a
    /// fresh deck.
    #[cfg(test)]
    pub(crate) fn stacked(top: &[Card]) -> Deck {
        let mut cards: Vec<Card> = Deck::new().cards.into_iter().filter(|c| !top.contains(c)).collect();
        cards.extend(top.iter().rev());
        Deck { cards }
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Discards the next card face down.
    pub fn burn(&mut self) {
        self.cards.pop();
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_new_deck_is_complete() {
        let mut deck = Deck::new();
        assert_eq!(deck.len(), 52);
        let mut seen = HashSet::new();
        while let Some(card) = deck.draw() {
            assert!(seen.insert(card), "duplicate {}", card);
        }
        assert_eq!(seen.len(), 52);
        assert!(deck.is_empty());
    }

    #[test]
    fn test_shuffle_keeps_the_same_cards() {
        let mut rng = StdRng::seed_from_u64(7);
        let shuffled = Deck::shuffled(&mut rng);
        assert_ne!(shuffled, Deck::new());
        let mut a = shuffled.cards.clone();
        let mut b = Deck::new().cards;
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_and_burn_take_from_the_end() {
        let top: Vec<Card> = ["As", "Kd", "2c"].iter().map(|s| s.parse().unwrap()).collect();
        let mut deck = Deck::stacked(&top);
        assert_eq!(deck.len(), 52);
        assert_eq!(deck.draw(), Some(top[0]));
        deck.burn();
        assert_eq!(deck.draw(), Some(top[2]));
        assert_eq!(deck.len(), 49);
    }

    #[test]
    fn test_parse_and_display() {
        let card: Card = "Th".parse().unwrap();
        assert_eq!(card, Card::new(Rank::Ten, Suit::Heart));
        assert_eq!(card.to_string(), "T♥");
        assert_eq!("as".parse::<Card>().unwrap(), Card::new(Rank::Ace, Suit::Spade));
        assert!("1s".parse::<Card>().is_err());
        assert!("Asd".parse::<Card>().is_err());
        assert!("A".parse::<Card>().is_err());
    }

    #[test]
    fn test_format_cards() {
        let cards = [Card::new(Rank::Ace, Suit::Spade), Card::new(Rank::Two, Suit::Club)];
        assert_eq!(format_cards(&cards), "A♠ 2♣");
    }
}
