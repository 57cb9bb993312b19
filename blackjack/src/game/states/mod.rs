//! Round state definitions for the blackjack FSM.
//!
//! Each state represents a specific phase of a single round.

use crate::game::entities::Outcome;

/// Fresh deck, nothing dealt yet
#[derive(Debug, Default)]
pub struct Deal {}

/// Waiting for the player to hit or stand
#[derive(Debug)]
pub struct PlayerTurn {}

/// Player stood; the dealer reveals their hole card and draws to 17
#[derive(Debug)]
pub struct DealerTurn {}

/// Round decided; the result has been announced
#[derive(Clone, Copy, Debug)]
pub struct Resolved {
    pub outcome: Outcome,
}
