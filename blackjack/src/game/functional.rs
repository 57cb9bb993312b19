//! Pure blackjack arithmetic: hand values, busts, the dealer rule, and
//! deciding a round.

use super::{
    constants::{ACE_HIGH_VALUE, ACE_LOW_VALUE, BLACKJACK, DEALER_STANDS_AT},
    entities::{Card, Outcome},
};

/// Hand value with aces counted as 11 and then recounted as 1, one at a
/// time, while the total is over 21.
#[must_use]
pub fn value(cards: &[Card]) -> u32 {
    let mut total: u32 = cards.iter().map(Card::points).sum();
    let mut soft_aces = cards.iter().filter(|card| card.is_ace()).count();
    while total > BLACKJACK && soft_aces > 0 {
        total -= ACE_HIGH_VALUE - ACE_LOW_VALUE;
        soft_aces -= 1;
    }
    total
}

#[must_use]
pub fn is_bust(value: u32) -> bool {
    value > BLACKJACK
}

#[must_use]
pub fn dealer_should_hit(value: u32) -> bool {
    value < DEALER_STANDS_AT
}

/// Decide a round. A busted player loses even when the dealer busts too.
#[must_use]
pub fn winner(
    player_value: u32,
    dealer_value: u32,
    player_busted: bool,
    dealer_busted: bool,
) -> Outcome {
    if player_busted {
        return Outcome::Loss;
    }
    if dealer_busted {
        return Outcome::Win;
    }
    match player_value.cmp(&dealer_value) {
        std::cmp::Ordering::Greater => Outcome::Win,
        std::cmp::Ordering::Less => Outcome::Loss,
        std::cmp::Ordering::Equal => Outcome::Tie,
    }
}
