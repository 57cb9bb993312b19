//! Promptless player for unattended and load-testing sessions.

use blackjack::{
    Table,
    constants::DEALER_STANDS_AT,
    entities::{Card, Decision, Hand, Outcome, Party, Tally},
};
use log::{debug, info, warn};

/// Plays the dealer's own rule: hit below a threshold, stand otherwise.
/// Everything else is only logged.
#[derive(Debug, Clone)]
pub struct AutoPlayer {
    name: String,
    stand_at: u32,
    decisions: u32,
    last_error: Option<String>,
    last_tally: Option<Tally>,
}

impl AutoPlayer {
    pub fn new(name: &str) -> Self {
        Self::standing_at(name, DEALER_STANDS_AT)
    }

    pub fn standing_at(name: &str, stand_at: u32) -> Self {
        Self {
            name: name.to_string(),
            stand_at,
            decisions: 0,
            last_error: None,
            last_tally: None,
        }
    }

    /// Number of decisions made so far.
    pub fn decisions(&self) -> u32 {
        self.decisions
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_tally(&self) -> Option<Tally> {
        self.last_tally
    }
}

impl Table for AutoPlayer {
    fn round_started(&mut self, round: u8, total: u8) {
        debug!("{}: round {round}/{total}", self.name);
    }

    fn initial_hand(&mut self, player: &Hand, dealer_up: Card) {
        debug!("{}: dealt {player}, dealer shows {dealer_up}", self.name);
    }

    fn decide(&mut self, player: &Hand, _dealer_up: Card) -> Decision {
        self.decisions += 1;
        let decision = if player.value() < self.stand_at {
            Decision::Hit
        } else {
            Decision::Stand
        };
        debug!("{} {decision} on {}", self.name, player.value());
        decision
    }

    fn card_drawn(&mut self, card: Card, owner: Party) {
        debug!("{}: {owner} drew {card}", self.name);
    }

    fn bust(&mut self, owner: Party) {
        debug!("{}: {owner} busts", self.name);
    }

    fn round_result(&mut self, outcome: Outcome, player: &Hand, dealer: &Hand) {
        info!("{}: {outcome} ({player} vs {dealer})", self.name);
    }

    fn session_error(&mut self, message: &str) {
        warn!("{}: session failed: {message}", self.name);
        self.last_error = Some(message.to_string());
    }

    fn final_statistics(&mut self, tally: &Tally) {
        info!("{}: finished with {tally}", self.name);
        self.last_tally = Some(*tally);
    }
}
