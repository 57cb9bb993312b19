//! Hand Evaluation Example
//!
//! Demonstrates hand values, the dealer rule, and a full round played on a
//! stacked deck.

use blackjack::{
    RoundManagement, RoundState,
    entities::{Card, Deck, Decision, Suit},
    functional::{dealer_should_hit, value, winner},
};

fn card(rank: u8, suit: Suit) -> Option<Card> {
    Card::new(rank, suit)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Blackjack Hand Evaluation Example ===\n");

    // Example 1: Aces count 11 until that would bust the hand
    println!("Example 1: Soft and hard aces");
    let soft: Vec<Card> = [card(1, Suit::Heart), card(6, Suit::Club)]
        .into_iter()
        .flatten()
        .collect();
    let hard: Vec<Card> = [card(1, Suit::Heart), card(6, Suit::Club), card(9, Suit::Spade)]
        .into_iter()
        .flatten()
        .collect();
    println!("{soft:?} is worth {}", value(&soft));
    println!("{hard:?} is worth {}\n", value(&hard));

    // Example 2: The dealer draws below 17
    println!("Example 2: Dealer rule");
    for total in [16, 17] {
        println!("Dealer on {total} hits: {}", dealer_should_hit(total));
    }
    println!("Player 20 against dealer 20: {}\n", winner(20, 20, false, false));

    // Example 3: A whole round
    println!("Example 3: Player stands on 20, dealer draws to 20");
    let stacked: Vec<Card> = [
        card(10, Suit::Diamond),
        card(10, Suit::Club),
        card(5, Suit::Spade),
        card(10, Suit::Heart),
        card(5, Suit::Club),
    ]
    .into_iter()
    .flatten()
    .collect();
    let mut round = RoundState::new(Deck::stacked(&stacked)).step()?;
    round = round.decide(Decision::Stand)?.step()?;
    for event in round.drain_events() {
        println!("  {event}");
    }
    println!("Player: {}", round.player_hand());
    println!("Dealer: {}", round.dealer_hand());

    Ok(())
}
