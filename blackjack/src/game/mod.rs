//! Blackjack game engine: cards, hand arithmetic, and the round FSM.
//!
//! The dealer side of a round is [`RoundState`]; the player side follows
//! along with [`RoundMirror`].

pub mod constants;
pub mod entities;
pub mod functional;
pub mod mirror;
pub mod state_machine;
pub mod states;

pub use mirror::RoundMirror;
pub use state_machine::{Round, RoundError, RoundEvent, RoundManagement, RoundState, Update};
