use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{constants, functional};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u8)]
pub enum Suit {
    Heart = 0,
    Diamond = 1,
    Club = 2,
    Spade = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

    /// Suit for its wire index (0-3).
    #[must_use]
    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(usize::from(idx)).copied()
    }

    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Heart => "♥",
            Self::Diamond => "♦",
            Self::Club => "♣",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card ranks (ace=1u8 ... king=13u8).
pub type Value = u8;

/// A playing card. Ranks run from 1 (ace) to 13 (king).
///
/// Cards only come out of a [`Deck`] or a validated wire frame, so a
/// `Card` always holds an in-range rank.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(Value, Suit);

impl Card {
    pub const ACE: Value = 1;
    pub const JACK: Value = 11;
    pub const QUEEN: Value = 12;
    pub const KING: Value = 13;

    /// Create a card, returning `None` for ranks outside 1-13.
    #[must_use]
    pub fn new(rank: Value, suit: Suit) -> Option<Self> {
        (Self::ACE..=Self::KING)
            .contains(&rank)
            .then_some(Self(rank, suit))
    }

    #[must_use]
    pub fn rank(&self) -> Value {
        self.0
    }

    #[must_use]
    pub fn suit(&self) -> Suit {
        self.1
    }

    #[must_use]
    pub fn is_ace(&self) -> bool {
        self.0 == Self::ACE
    }

    /// Blackjack value with the ace counted high.
    #[must_use]
    pub fn points(&self) -> u32 {
        match self.0 {
            Self::ACE => constants::ACE_HIGH_VALUE,
            v if v >= Self::JACK => constants::FACE_CARD_VALUE,
            v => u32::from(v),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Self::ACE => write!(f, "A{}", self.1),
            Self::JACK => write!(f, "J{}", self.1),
            Self::QUEEN => write!(f, "Q{}", self.1),
            Self::KING => write!(f, "K{}", self.1),
            v => write!(f, "{v}{}", self.1),
        }
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum DeckError {
    #[error("deck exhausted after {0} cards")]
    Exhausted(usize),
}

/// A 52-card deck with a draw cursor. Each round gets its own deck and
/// never reshuffles it.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: [Card; constants::DECK_SIZE],
    deck_idx: usize,
}

impl Deck {
    /// A freshly shuffled deck using the thread-local RNG.
    #[must_use]
    pub fn new() -> Self {
        Self::shuffled(&mut rand::rng())
    }

    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::default();
        deck.cards.shuffle(rng);
        deck
    }

    /// A deck that deals `top` first (in order) and then the remaining cards
    /// in standard order. Repeated cards in `top` are only dealt once.
    #[must_use]
    pub fn stacked(top: &[Card]) -> Self {
        let ordered = Self::default().cards;
        let mut cards = Vec::with_capacity(constants::DECK_SIZE);
        for card in top.iter().chain(ordered.iter()) {
            if !cards.contains(card) {
                cards.push(*card);
            }
        }
        let mut deck = Self::default();
        deck.cards.copy_from_slice(&cards);
        deck
    }

    pub fn deal_card(&mut self) -> Result<Card, DeckError> {
        let card = self
            .cards
            .get(self.deck_idx)
            .copied()
            .ok_or(DeckError::Exhausted(self.deck_idx))?;
        self.deck_idx += 1;
        Ok(card)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        constants::DECK_SIZE - self.deck_idx
    }
}

impl Default for Deck {
    /// An unshuffled deck, suit by suit from ace to king.
    fn default() -> Self {
        let mut cards = [Card(Card::ACE, Suit::Heart); constants::DECK_SIZE];
        for (j, suit) in Suit::ALL.into_iter().enumerate() {
            for (i, value) in (Card::ACE..=Card::KING).enumerate() {
                cards[usize::from(constants::RANKS_PER_SUIT) * j + i] = Card(value, suit);
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// Who a card or bust belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Party {
    Player,
    Dealer,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Player => "player",
            Self::Dealer => "dealer",
        };
        write!(f, "{repr}")
    }
}

/// Cards held by one party during one round.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Hand(Vec<Card>);

impl Hand {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::with_capacity(constants::INITIAL_HAND_SIZE + 2))
    }

    pub fn push(&mut self, card: Card) {
        self.0.push(card);
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        functional::value(&self.0)
    }

    #[must_use]
    pub fn is_bust(&self) -> bool {
        functional::is_bust(self.value())
    }

    /// Whether an ace is still being counted as 11.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        let hard: u32 = self
            .0
            .iter()
            .map(|card| {
                if card.is_ace() {
                    constants::ACE_LOW_VALUE
                } else {
                    card.points()
                }
            })
            .sum();
        self.value() != hard
    }
}

impl From<Vec<Card>> for Hand {
    fn from(value: Vec<Card>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cards = self
            .0
            .iter()
            .map(Card::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{cards} ({})", self.value())
    }
}

/// A player decision at their turn.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Decision {
    Hit,
    Stand,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Hit => "hits",
            Self::Stand => "stands",
        };
        write!(f, "{repr}")
    }
}

/// How a round ended, from the player's point of view. The discriminants
/// are the result codes used on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[repr(u8)]
pub enum Outcome {
    Tie = 1,
    Loss = 2,
    Win = 3,
}

impl Outcome {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Tie),
            2 => Some(Self::Loss),
            3 => Some(Self::Win),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Tie => "TIE",
            Self::Loss => "LOSS",
            Self::Win => "WIN",
        };
        write!(f, "{repr}")
    }
}

/// Running win/loss/tie counts for one session.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Tally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Tie => self.ties += 1,
        }
    }

    #[must_use]
    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Percentage of recorded rounds that were won.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        match self.played() {
            0 => 0.0,
            played => f64::from(self.wins) * 100.0 / f64::from(played),
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}W {}L {}T (rate: {:.1}%)",
            self.wins,
            self.losses,
            self.ties,
            self.win_rate()
        )
    }
}
