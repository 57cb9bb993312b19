//! Blackjack round state machine.
//!
//! The dealer side of a round is a type-state machine: a [`Round<T>`] only
//! offers the transitions that are legal in phase `T`, and [`RoundState`]
//! wraps the phases so a session loop can hold "whatever phase the round is
//! in". Everything the dealer announces is queued as [`RoundEvent`]s, in
//! the exact order it must be sent, and drained by the caller.

use enum_dispatch::enum_dispatch;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};
use thiserror::Error;

use super::{
    entities::{Card, Deck, DeckError, Decision, Hand, Outcome, Party},
    functional,
    states::{Deal, DealerTurn, PlayerTurn, Resolved},
};

/// Errors that end a round (and the session playing it).
#[derive(Debug, Eq, Error, PartialEq)]
pub enum RoundError {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error("player {decision} outside their turn ({phase})")]
    OutOfTurn {
        decision: Decision,
        phase: &'static str,
    },
    #[error("unexpected card {card} during {phase}")]
    UnexpectedCard { card: Card, phase: &'static str },
    #[error("unexpected {outcome} result during {phase}")]
    UnexpectedResult {
        outcome: Outcome,
        phase: &'static str,
    },
}

/// What a dealer card update or result carries on the wire. The owner of a
/// card is implied by protocol order and never transmitted.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Update {
    Card(Card),
    Result(Outcome),
}

/// Something that happened during a round, with the card's owner attached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoundEvent {
    Dealt(Party, Card),
    Resolved(Outcome),
}

impl From<RoundEvent> for Update {
    fn from(value: RoundEvent) -> Self {
        match value {
            RoundEvent::Dealt(_, card) => Self::Card(card),
            RoundEvent::Resolved(outcome) => Self::Result(outcome),
        }
    }
}

impl fmt::Display for RoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dealt(party, card) => write!(f, "{party} gets {card}"),
            Self::Resolved(outcome) => write!(f, "round ends: {outcome}"),
        }
    }
}

/// Data owned by a round for its whole lifetime.
#[derive(Debug)]
pub struct RoundData {
    deck: Deck,
    pub player: Hand,
    pub dealer: Hand,
    events: VecDeque<RoundEvent>,
}

impl RoundData {
    fn deal_to(&mut self, party: Party) -> Result<Card, RoundError> {
        let card = self.deck.deal_card()?;
        match party {
            Party::Player => self.player.push(card),
            Party::Dealer => self.dealer.push(card),
        }
        Ok(card)
    }

    fn announce(&mut self, event: RoundEvent) {
        debug!("{event}");
        self.events.push_back(event);
    }
}

/// Accessors shared by every phase of a round.
#[enum_dispatch]
pub trait RoundManagement {
    fn drain_events(&mut self) -> VecDeque<RoundEvent>;
    fn player_hand(&self) -> &Hand;
    fn dealer_hand(&self) -> &Hand;
}

/// A round in phase `T`.
#[derive(Debug)]
pub struct Round<T> {
    pub data: RoundData,
    pub state: T,
}

impl<T> RoundManagement for Round<T> {
    fn drain_events(&mut self) -> VecDeque<RoundEvent> {
        self.data.events.drain(..).collect()
    }

    fn player_hand(&self) -> &Hand {
        &self.data.player
    }

    fn dealer_hand(&self) -> &Hand {
        &self.data.dealer
    }
}

impl Round<Deal> {
    #[must_use]
    pub fn new(deck: Deck) -> Self {
        Self {
            data: RoundData {
                deck,
                player: Hand::new(),
                dealer: Hand::new(),
                events: VecDeque::new(),
            },
            state: Deal {},
        }
    }

    /// Two cards each. Only the player's cards and the dealer's first card
    /// are announced; the second dealer card stays face down.
    fn deal(mut self) -> Result<Round<PlayerTurn>, RoundError> {
        let first = self.data.deal_to(Party::Player)?;
        let second = self.data.deal_to(Party::Player)?;
        let up_card = self.data.deal_to(Party::Dealer)?;
        self.data.deal_to(Party::Dealer)?;

        self.data.announce(RoundEvent::Dealt(Party::Player, first));
        self.data.announce(RoundEvent::Dealt(Party::Player, second));
        self.data.announce(RoundEvent::Dealt(Party::Dealer, up_card));
        Ok(Round {
            data: self.data,
            state: PlayerTurn {},
        })
    }
}

impl Round<PlayerTurn> {
    fn hit(mut self) -> Result<RoundState, RoundError> {
        let card = self.data.deal_to(Party::Player)?;
        self.data.announce(RoundEvent::Dealt(Party::Player, card));
        if self.data.player.is_bust() {
            return Ok(self.resolve(Outcome::Loss).into());
        }
        Ok(self.into())
    }

    fn resolve(mut self, outcome: Outcome) -> Round<Resolved> {
        self.data.announce(RoundEvent::Resolved(outcome));
        Round {
            data: self.data,
            state: Resolved { outcome },
        }
    }
}

impl From<Round<PlayerTurn>> for Round<DealerTurn> {
    fn from(value: Round<PlayerTurn>) -> Self {
        Self {
            data: value.data,
            state: DealerTurn {},
        }
    }
}

impl Round<DealerTurn> {
    /// Reveal the hole card, draw to 17, and settle the round.
    fn play_out(mut self) -> Result<Round<Resolved>, RoundError> {
        if let Some(&hole_card) = self.data.dealer.cards().get(1) {
            self.data
                .announce(RoundEvent::Dealt(Party::Dealer, hole_card));
        }
        while functional::dealer_should_hit(self.data.dealer.value()) {
            let card = self.data.deal_to(Party::Dealer)?;
            self.data.announce(RoundEvent::Dealt(Party::Dealer, card));
        }

        let player_value = self.data.player.value();
        let dealer_value = self.data.dealer.value();
        let outcome = functional::winner(
            player_value,
            dealer_value,
            functional::is_bust(player_value),
            functional::is_bust(dealer_value),
        );
        self.data.announce(RoundEvent::Resolved(outcome));
        Ok(Round {
            data: self.data,
            state: Resolved { outcome },
        })
    }
}

/// A round in any phase.
#[enum_dispatch(RoundManagement)]
#[derive(Debug)]
pub enum RoundState {
    Deal(Round<Deal>),
    PlayerTurn(Round<PlayerTurn>),
    DealerTurn(Round<DealerTurn>),
    Resolved(Round<Resolved>),
}

impl RoundState {
    #[must_use]
    pub fn new(deck: Deck) -> Self {
        Round::new(deck).into()
    }

    /// Run the phases that need no input from the player. Dealing moves
    /// to the player's turn and the dealer's turn runs to resolution; the
    /// other phases are left as they are.
    pub fn step(self) -> Result<Self, RoundError> {
        Ok(match self {
            Self::Deal(round) => round.deal()?.into(),
            Self::DealerTurn(round) => round.play_out()?.into(),
            other => other,
        })
    }

    /// Apply the player's decision. Only legal during the player's turn.
    pub fn decide(self, decision: Decision) -> Result<Self, RoundError> {
        match self {
            Self::PlayerTurn(round) => match decision {
                Decision::Hit => round.hit(),
                Decision::Stand => Ok(Round::<DealerTurn>::from(round).into()),
            },
            other => Err(RoundError::OutOfTurn {
                decision,
                phase: other.phase(),
            }),
        }
    }

    #[must_use]
    pub fn awaiting_decision(&self) -> bool {
        matches!(self, Self::PlayerTurn(_))
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Resolved(round) => Some(round.state.outcome),
            _ => None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Deal(_) => "deal",
            Self::PlayerTurn(_) => "player turn",
            Self::DealerTurn(_) => "dealer turn",
            Self::Resolved(_) => "resolved",
        }
    }
}
