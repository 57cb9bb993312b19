//! Dealer side of one client connection.

use log::{debug, info, warn};
use std::{
    io::{Read, Write},
    net::SocketAddr,
    sync::atomic::{AtomicBool, Ordering},
};

use super::{
    errors::Result,
    messages::{Payload, Request},
    utils,
};
use crate::game::{
    RoundManagement, RoundState,
    entities::{Deck, Outcome, Tally},
};

/// Everything the server knows about one connected team. Owned by the
/// worker serving the connection.
#[derive(Clone, Debug)]
pub struct Session {
    pub peer: SocketAddr,
    pub team_name: String,
    pub rounds_requested: u8,
    pub rounds_completed: u8,
    pub tally: Tally,
}

impl Session {
    #[must_use]
    pub fn new(peer: SocketAddr, request: &Request) -> Self {
        Self {
            peer,
            team_name: request.team_name().to_string(),
            rounds_requested: request.rounds(),
            rounds_completed: 0,
            tally: Tally::default(),
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.rounds_completed >= self.rounds_requested
    }

    /// Deal one round on `stream`, returning once the result is sent.
    fn play_round<S: Read + Write>(&mut self, stream: &mut S, deck: Deck) -> Result<Outcome> {
        let mut round = RoundState::new(deck);
        loop {
            round = round.step()?;
            for event in round.drain_events() {
                debug!("{} round {}: {event}", self.team_name, self.rounds_completed + 1);
                utils::write_message(stream, &Payload::Update(event.into()).into())?;
            }
            if let Some(outcome) = round.outcome() {
                self.rounds_completed += 1;
                self.tally.record(outcome);
                info!(
                    "{} round {}/{}: player {} vs dealer {} -> {outcome}",
                    self.team_name,
                    self.rounds_completed,
                    self.rounds_requested,
                    round.player_hand(),
                    round.dealer_hand(),
                );
                return Ok(outcome);
            }

            let decision = utils::read_decision(stream)?;
            debug!("{} {decision}", self.team_name);
            round = round.decide(decision)?;
        }
    }
}

/// Serve a connection end to end: read the request, then deal the
/// requested rounds with a fresh deck each. A raised `stop` flag ends the
/// session after the round in progress.
pub fn serve<S, F>(
    stream: &mut S,
    peer: SocketAddr,
    mut next_deck: F,
    stop: &AtomicBool,
) -> Result<Session>
where
    S: Read + Write,
    F: FnMut() -> Deck,
{
    let request = match utils::read_request(stream) {
        Ok(request) => request,
        Err(error) => {
            warn!("rejecting {peer}: {error}");
            return Err(error);
        }
    };
    let mut session = Session::new(peer, &request);
    info!(
        "{} from {peer} wants {} rounds",
        session.team_name, session.rounds_requested
    );

    while !session.is_finished() {
        if stop.load(Ordering::SeqCst) {
            warn!(
                "server shutting down; ending {} from {peer} after {}/{} rounds",
                session.team_name, session.rounds_completed, session.rounds_requested
            );
            return Ok(session);
        }
        if let Err(error) = session.play_round(stream, next_deck()) {
            warn!(
                "session with {} from {peer} aborted after {} rounds: {error}",
                session.team_name, session.rounds_completed
            );
            return Err(error);
        }
    }

    info!(
        "{} from {peer} finished {} rounds: {}",
        session.team_name, session.rounds_completed, session.tally
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::{
            Update,
            entities::{Card, Decision, Suit},
        },
        net::{
            errors::SessionError,
            messages::{CodecError, PAYLOAD_LEN},
        },
    };
    use std::io::{self, Cursor};

    /// Scripted peer: reads come from `input`, writes land in `output`.
    struct Script {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Script {
        fn new(frames: &[&[u8]]) -> Self {
            Self {
                input: Cursor::new(frames.concat()),
                output: Vec::new(),
            }
        }

        fn updates(&self) -> Vec<Update> {
            self.output
                .chunks(PAYLOAD_LEN)
                .map(|frame| Payload::decode_update(frame).unwrap())
                .collect()
        }
    }

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Script {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn card(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit).unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:4242".parse().unwrap()
    }

    fn tie_deck() -> Deck {
        Deck::stacked(&[
            card(10, Suit::Diamond),
            card(10, Suit::Club),
            card(5, Suit::Spade),
            card(10, Suit::Heart),
            card(5, Suit::Club),
        ])
    }

    #[test]
    fn test_serve_scripted_tie() {
        let request = Request::new(1, "x").unwrap().encode();
        let stand = Payload::Decision(Decision::Stand).encode();
        let mut script = Script::new(&[&request, &stand]);

        let session = serve(&mut script, peer(), tie_deck, &AtomicBool::new(false)).unwrap();
        assert_eq!(session.team_name, "x");
        assert_eq!(session.rounds_completed, 1);
        assert_eq!(
            session.tally,
            Tally {
                wins: 0,
                losses: 0,
                ties: 1
            }
        );
        assert_eq!(
            script.updates(),
            vec![
                Update::Card(card(10, Suit::Diamond)),
                Update::Card(card(10, Suit::Club)),
                Update::Card(card(5, Suit::Spade)),
                Update::Card(card(10, Suit::Heart)),
                Update::Card(card(5, Suit::Club)),
                Update::Result(Outcome::Tie),
            ]
        );
    }

    #[test]
    fn test_serve_multiple_rounds() {
        let request = Request::new(3, "trio").unwrap().encode();
        let stand = Payload::Decision(Decision::Stand).encode();
        let mut script = Script::new(&[&request, &stand, &stand, &stand]);

        let session = serve(&mut script, peer(), tie_deck, &AtomicBool::new(false)).unwrap();
        assert_eq!(session.rounds_completed, 3);
        assert_eq!(session.tally.ties, 3);
        let results = script
            .updates()
            .into_iter()
            .filter(|update| matches!(update, Update::Result(_)))
            .count();
        assert_eq!(results, 3);
    }

    #[test]
    fn test_serve_invalid_decision_aborts() {
        let request = Request::new(2, "x").unwrap().encode();
        let mut bogus = Payload::Decision(Decision::Stand).encode();
        bogus[5..10].copy_from_slice(b"Maybe");
        let mut script = Script::new(&[&request, &bogus]);

        let error = serve(&mut script, peer(), tie_deck, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(
            error,
            SessionError::Codec(CodecError::InvalidDecision(_))
        ));
        // Only the initial deal went out.
        assert_eq!(script.updates().len(), 3);
    }

    #[test]
    fn test_serve_disconnect_mid_round() {
        let request = Request::new(1, "x").unwrap().encode();
        let mut script = Script::new(&[&request]);
        let error = serve(&mut script, peer(), tie_deck, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(error, SessionError::Disconnected));
    }

    #[test]
    fn test_serve_rejects_zero_rounds() {
        let mut request = Request::new(1, "x").unwrap().encode();
        request[5] = 0;
        let mut script = Script::new(&[&request]);
        let error = serve(&mut script, peer(), tie_deck, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(error, SessionError::Codec(CodecError::ZeroRounds)));
        assert!(script.output.is_empty());
    }

    #[test]
    fn test_serve_stops_between_rounds() {
        let request = Request::new(5, "x").unwrap().encode();
        let mut script = Script::new(&[&request]);
        let session = serve(&mut script, peer(), tie_deck, &AtomicBool::new(true)).unwrap();
        assert_eq!(session.rounds_completed, 0);
        assert!(!session.is_finished());
        assert!(script.output.is_empty());
    }
}
