//! The player's view of a round.
//!
//! Card updates on the wire never say who a card belongs to; the owner
//! follows from where the round is. [`RoundMirror`] replays the dealer's
//! rules from the updates it receives and the decisions it makes, so the
//! client can attribute each card and spot a server that breaks order.

use super::{
    entities::{Decision, Hand, Outcome, Party},
    state_machine::{RoundError, RoundEvent, Update},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    /// Initial deal; counts the cards seen so far.
    Dealing(u8),
    Deciding,
    AwaitingHit,
    /// Player busted; only the result is left.
    AwaitingResult,
    DealerTurn,
    Done(Outcome),
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Self::Dealing(_) => "deal",
            Self::Deciding => "player decision",
            Self::AwaitingHit => "player hit",
            Self::AwaitingResult => "player bust",
            Self::DealerTurn => "dealer turn",
            Self::Done(_) => "resolved",
        }
    }
}

/// Client-side tracker for a single round.
#[derive(Clone, Debug)]
pub struct RoundMirror {
    phase: Phase,
    player: Hand,
    dealer: Hand,
}

impl Default for RoundMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundMirror {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Dealing(0),
            player: Hand::new(),
            dealer: Hand::new(),
        }
    }

    /// Attribute an update from the server and advance the round.
    pub fn observe(&mut self, update: Update) -> Result<RoundEvent, RoundError> {
        let phase = self.phase;
        match (phase, update) {
            (Phase::Dealing(seen), Update::Card(card)) => {
                if seen < 2 {
                    self.player.push(card);
                    self.phase = Phase::Dealing(seen + 1);
                    Ok(RoundEvent::Dealt(Party::Player, card))
                } else {
                    self.dealer.push(card);
                    self.phase = Phase::Deciding;
                    Ok(RoundEvent::Dealt(Party::Dealer, card))
                }
            }
            (Phase::AwaitingHit, Update::Card(card)) => {
                self.player.push(card);
                self.phase = if self.player.is_bust() {
                    Phase::AwaitingResult
                } else {
                    Phase::Deciding
                };
                Ok(RoundEvent::Dealt(Party::Player, card))
            }
            (Phase::DealerTurn, Update::Card(card)) => {
                self.dealer.push(card);
                Ok(RoundEvent::Dealt(Party::Dealer, card))
            }
            (Phase::AwaitingResult | Phase::DealerTurn, Update::Result(outcome)) => {
                self.phase = Phase::Done(outcome);
                Ok(RoundEvent::Resolved(outcome))
            }
            (phase, Update::Card(card)) => Err(RoundError::UnexpectedCard {
                card,
                phase: phase.name(),
            }),
            (phase, Update::Result(outcome)) => Err(RoundError::UnexpectedResult {
                outcome,
                phase: phase.name(),
            }),
        }
    }

    /// Record the decision about to be sent.
    pub fn decide(&mut self, decision: Decision) -> Result<(), RoundError> {
        if self.phase != Phase::Deciding {
            return Err(RoundError::OutOfTurn {
                decision,
                phase: self.phase.name(),
            });
        }
        self.phase = match decision {
            Decision::Hit => Phase::AwaitingHit,
            Decision::Stand => Phase::DealerTurn,
        };
        Ok(())
    }

    #[must_use]
    pub fn awaiting_decision(&self) -> bool {
        self.phase == Phase::Deciding
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    #[must_use]
    pub fn player_hand(&self) -> &Hand {
        &self.player
    }

    /// Dealer cards seen so far. Holds only the up-card until the player
    /// stands.
    #[must_use]
    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer
    }
}
