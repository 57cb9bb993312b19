//! Table rules and deck dimensions.

/// Number of cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Number of ranks per suit (ace through king).
pub const RANKS_PER_SUIT: u8 = 13;

/// Best possible hand value. Anything above it is a bust.
pub const BLACKJACK: u32 = 21;

/// The dealer draws while below this value and stands at or above it.
pub const DEALER_STANDS_AT: u32 = 17;

pub const ACE_HIGH_VALUE: u32 = 11;
pub const ACE_LOW_VALUE: u32 = 1;
pub const FACE_CARD_VALUE: u32 = 10;

/// Cards dealt to each party at the start of a round.
pub const INITIAL_HAND_SIZE: usize = 2;

/// Largest round count a request can carry (it's a single byte on the wire).
pub const MAX_ROUNDS: u8 = u8::MAX;

/// Width in bytes of the server and team name fields on the wire.
pub const MAX_NAME_LEN: usize = 32;
