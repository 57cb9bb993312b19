//! # Blackjack
//!
//! A LAN blackjack dealer and player built around a type-safe finite state
//! machine.
//!
//! Servers advertise themselves with UDP broadcasts and deal rounds to any
//! number of clients over TCP, each connection on its own thread. Both ends
//! speak a small fixed-width binary protocol. A round on the server is a
//! [`RoundState`]; the client replays it with a [`RoundMirror`] so it can
//! tell which card belongs to whom.
//!
//! ## Round phases
//!
//! - **Deal**: two cards each; the dealer's second card stays face down
//! - **PlayerTurn**: the player hits until they stand or bust
//! - **DealerTurn**: the hole card is revealed and the dealer draws to 17
//! - **Resolved**: the result is announced
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, hand values, and the round state machine
//! - [`net`]: Wire codec, server, client, and discovery
//!
//! ## Example
//!
//! ```
//! use blackjack::{RoundManagement, RoundState, entities::{Deck, Decision}};
//!
//! let mut round = RoundState::new(Deck::new()).step().unwrap();
//! assert_eq!(round.drain_events().len(), 3);
//! let round = round.decide(Decision::Stand).unwrap().step().unwrap();
//! assert!(round.outcome().is_some());
//! ```

/// Networking components for client-server communication.
pub mod net;
pub use net::{
    client::{Client, Table},
    discovery, errors, messages, server, session, utils,
};

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    RoundError, RoundEvent, RoundManagement, RoundMirror, RoundState, Update,
    constants, entities, functional,
};
