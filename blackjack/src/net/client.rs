//! A blocking TCP blackjack client.
//!
//! The client plays the player's side of each round: it mirrors the
//! dealer's state machine from the updates it reads, asks a [`Table`] for
//! decisions, and reports everything that happens back to it.

use log::{debug, info};
use std::{
    io,
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use super::{
    errors::{ClientError, SessionError},
    messages::{Payload, Request},
    utils,
};
use crate::game::{
    RoundEvent, RoundMirror,
    entities::{Card, Decision, Hand, Outcome, Party, Tally},
};

/// The collaborator a [`Client`] plays through, usually a user interface.
pub trait Table {
    fn round_started(&mut self, round: u8, total: u8);

    /// The opening deal: two player cards and the dealer's face-up card.
    fn initial_hand(&mut self, player: &Hand, dealer_up: Card);

    /// Called once per player turn. May block on user input.
    fn decide(&mut self, player: &Hand, dealer_up: Card) -> Decision;

    /// Any card dealt after the opening deal.
    fn card_drawn(&mut self, card: Card, owner: Party);

    fn bust(&mut self, owner: Party);

    fn round_result(&mut self, outcome: Outcome, player: &Hand, dealer: &Hand);

    /// The session failed. Reported at most once per session.
    fn session_error(&mut self, message: &str);

    fn final_statistics(&mut self, tally: &Tally);

    /// Asked between rounds; returning `false` ends the session early.
    fn keep_playing(&mut self, _completed: u8, _total: u8) -> bool {
        true
    }
}

/// A blocking client connected to one server for one session.
pub struct Client {
    pub request: Request,
    pub stream: TcpStream,
    pub tally: Tally,
}

impl Client {
    /// Connect to a blackjack server and send the session request.
    ///
    /// Connecting is tried three times with decreasing timeouts (1s, 500ms,
    /// 100ms). `timeout` bounds every gameplay read and write afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if no attempt connects or the request can't be
    /// sent.
    pub fn connect(
        addr: &SocketAddr,
        request: Request,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let mut connect_timeouts = vec![
            Duration::from_millis(100),
            Duration::from_millis(500),
            Duration::from_secs(1),
        ];
        let mut last_error = io::Error::from(io::ErrorKind::NotConnected);
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(mut stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    utils::write_message(&mut stream, &request.clone().into())?;
                    info!("connected to {addr} as {}", request.team_name());
                    return Ok(Self {
                        request,
                        stream,
                        tally: Tally::default(),
                    });
                }
                Err(error) => {
                    debug!("couldn't connect to {addr}: {error}");
                    last_error = error;
                    thread::sleep(connect_timeout);
                }
            }
        }
        Err(SessionError::Io(last_error))
    }

    /// Play every requested round through `table`.
    ///
    /// # Errors
    ///
    /// Any connection or protocol error ends the session. It is reported to
    /// `table` once, followed by the statistics so far, and then returned.
    pub fn play<T: Table + ?Sized>(&mut self, table: &mut T) -> Result<Tally, ClientError> {
        let total = self.request.rounds();
        for round in 1..=total {
            if round > 1 && !table.keep_playing(round - 1, total) {
                info!("leaving after {} of {total} rounds", round - 1);
                break;
            }
            table.round_started(round, total);
            match self.play_round(table) {
                Ok(outcome) => self.tally.record(outcome),
                Err(error) => {
                    table.session_error(&error.to_string());
                    table.final_statistics(&self.tally);
                    return Err(error);
                }
            }
        }
        table.final_statistics(&self.tally);
        Ok(self.tally)
    }

    fn play_round<T: Table + ?Sized>(&mut self, table: &mut T) -> Result<Outcome, ClientError> {
        let mut mirror = RoundMirror::new();
        let mut up_card = None;
        loop {
            if let (true, Some(up)) = (mirror.awaiting_decision(), up_card) {
                let decision = table.decide(mirror.player_hand(), up);
                mirror.decide(decision)?;
                debug!("sending decision: {decision}");
                utils::write_message(&mut self.stream, &Payload::Decision(decision).into())?;
                continue;
            }

            let update = utils::read_update(&mut self.stream)?;
            match mirror.observe(update)? {
                RoundEvent::Dealt(owner, card) => match up_card {
                    None => {
                        if mirror.awaiting_decision() {
                            up_card = Some(card);
                            table.initial_hand(mirror.player_hand(), card);
                        }
                    }
                    Some(_) => {
                        table.card_drawn(card, owner);
                        let hand = match owner {
                            Party::Player => mirror.player_hand(),
                            Party::Dealer => mirror.dealer_hand(),
                        };
                        if hand.is_bust() {
                            table.bust(owner);
                        }
                    }
                },
                RoundEvent::Resolved(outcome) => {
                    table.round_result(outcome, mirror.player_hand(), mirror.dealer_hand());
                    return Ok(outcome);
                }
            }
        }
    }
}
