/// Integration tests for full client-server sessions
///
/// These tests run a real server on a loopback port and play against it
/// with the blocking client, checking payload order, tallies, and how
/// failures surface on both ends.
use std::{
    io::Write,
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use blackjack::{
    Client, Table, Update,
    entities::{Card, Deck, Decision, Hand, Outcome, Party, Suit, Tally},
    errors::SessionError,
    messages::{Payload, Request},
    server::{BlackjackConfig, Server, ShutdownHandle},
    utils,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn card(rank: u8, suit: Suit) -> Card {
    Card::new(rank, suit).unwrap()
}

/// Player 10♦ 10♣, dealer 5♠ with 10♥ face down, then 5♣.
fn tie_deck() -> Deck {
    Deck::stacked(&[
        card(10, Suit::Diamond),
        card(10, Suit::Club),
        card(5, Suit::Spade),
        card(10, Suit::Heart),
        card(5, Suit::Club),
    ])
}

fn start_server<F>(decks: Option<F>) -> (SocketAddr, ShutdownHandle, thread::JoinHandle<()>)
where
    F: Fn() -> Deck + Send + Sync + 'static,
{
    let addr = "127.0.0.1:0".parse().unwrap();
    let mut server = Server::bind(addr, BlackjackConfig::default()).unwrap();
    if let Some(decks) = decks {
        server = server.with_deck_source(decks);
    }
    let addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();
    let runner = thread::spawn(move || server.run().unwrap());
    (addr, handle, runner)
}

/// Records every callback and plays a fixed strategy.
#[derive(Default)]
struct Recorder {
    stand_at: u32,
    rounds: Vec<(u8, u8)>,
    initial: Vec<(Vec<Card>, Card)>,
    drawn: Vec<(Card, Party)>,
    busts: Vec<Party>,
    results: Vec<(Outcome, Hand, Hand)>,
    errors: Vec<String>,
    finals: Vec<Tally>,
    leave_after: Option<u8>,
}

impl Recorder {
    fn standing_at(stand_at: u32) -> Self {
        Self {
            stand_at,
            ..Self::default()
        }
    }
}

impl Table for Recorder {
    fn round_started(&mut self, round: u8, total: u8) {
        self.rounds.push((round, total));
    }

    fn initial_hand(&mut self, player: &Hand, dealer_up: Card) {
        self.initial.push((player.cards().to_vec(), dealer_up));
    }

    fn decide(&mut self, player: &Hand, _dealer_up: Card) -> Decision {
        if player.value() < self.stand_at {
            Decision::Hit
        } else {
            Decision::Stand
        }
    }

    fn card_drawn(&mut self, card: Card, owner: Party) {
        self.drawn.push((card, owner));
    }

    fn bust(&mut self, owner: Party) {
        self.busts.push(owner);
    }

    fn round_result(&mut self, outcome: Outcome, player: &Hand, dealer: &Hand) {
        self.results.push((outcome, player.clone(), dealer.clone()));
    }

    fn session_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn final_statistics(&mut self, tally: &Tally) {
        self.finals.push(*tally);
    }

    fn keep_playing(&mut self, completed: u8, _total: u8) -> bool {
        self.leave_after.is_none_or(|limit| completed < limit)
    }
}

#[test]
fn test_scripted_tie_session() {
    let (addr, shutdown, runner) = start_server(Some(tie_deck));
    let mut client = Client::connect(&addr, Request::new(1, "x").unwrap(), TIMEOUT).unwrap();
    let mut table = Recorder::standing_at(0);

    let tally = client.play(&mut table).unwrap();
    assert_eq!(
        tally,
        Tally {
            wins: 0,
            losses: 0,
            ties: 1
        }
    );
    assert_eq!(table.rounds, vec![(1, 1)]);
    assert_eq!(
        table.initial,
        vec![(
            vec![card(10, Suit::Diamond), card(10, Suit::Club)],
            card(5, Suit::Spade)
        )]
    );
    assert_eq!(
        table.drawn,
        vec![
            (card(10, Suit::Heart), Party::Dealer),
            (card(5, Suit::Club), Party::Dealer),
        ]
    );
    let (outcome, player, dealer) = &table.results[0];
    assert_eq!(*outcome, Outcome::Tie);
    assert_eq!(player.value(), 20);
    assert_eq!(dealer.value(), 20);
    assert!(table.errors.is_empty());
    assert_eq!(table.finals, vec![tally]);
    drop(client);

    shutdown.shutdown().unwrap();
    runner.join().unwrap();
}

#[test]
fn test_stand_framing_without_dealer_draws() {
    // Dealer 10♠ 8♥ stands pat at 18.
    let deck = || {
        Deck::stacked(&[
            card(10, Suit::Diamond),
            card(9, Suit::Club),
            card(10, Suit::Spade),
            card(8, Suit::Heart),
        ])
    };
    let (addr, shutdown, runner) = start_server(Some(deck));

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    stream.write_all(&Request::new(1, "raw").unwrap().encode()).unwrap();
    for _ in 0..3 {
        assert!(matches!(utils::read_update(&mut stream).unwrap(), Update::Card(_)));
    }
    stream
        .write_all(&Payload::Decision(Decision::Stand).encode())
        .unwrap();
    assert_eq!(
        utils::read_update(&mut stream).unwrap(),
        Update::Card(card(8, Suit::Heart))
    );
    assert_eq!(
        utils::read_update(&mut stream).unwrap(),
        Update::Result(Outcome::Win)
    );
    // Session over: the server closes the connection.
    assert!(matches!(
        utils::read_update(&mut stream),
        Err(SessionError::Disconnected)
    ));

    shutdown.shutdown().unwrap();
    runner.join().unwrap();
}

#[test]
fn test_player_bust_reported_once() {
    // Player 10♦ 6♣ hits into K♥.
    let deck = || {
        Deck::stacked(&[
            card(10, Suit::Diamond),
            card(6, Suit::Club),
            card(10, Suit::Spade),
            card(8, Suit::Heart),
            card(13, Suit::Heart),
        ])
    };
    let (addr, shutdown, runner) = start_server(Some(deck));
    let mut client = Client::connect(&addr, Request::new(2, "bust").unwrap(), TIMEOUT).unwrap();
    let mut table = Recorder::standing_at(17);

    let tally = client.play(&mut table).unwrap();
    assert_eq!(tally.losses, 2);
    assert_eq!(table.busts, vec![Party::Player, Party::Player]);
    assert_eq!(
        table.drawn,
        vec![
            (card(13, Suit::Heart), Party::Player),
            (card(13, Suit::Heart), Party::Player),
        ]
    );
    assert_eq!(table.rounds, vec![(1, 2), (2, 2)]);

    shutdown.shutdown().unwrap();
    runner.join().unwrap();
}

#[test]
fn test_many_concurrent_clients() {
    let (addr, shutdown, runner) = start_server(None::<fn() -> Deck>);

    let players: Vec<_> = (0..16)
        .map(|i| {
            thread::spawn(move || {
                let request = Request::new(10, &format!("team {i}")).unwrap();
                let mut client = Client::connect(&addr, request, TIMEOUT).unwrap();
                let mut table = Recorder::standing_at(12 + i % 6);
                let tally = client.play(&mut table).unwrap();
                (tally, table)
            })
        })
        .collect();

    for player in players {
        let (tally, table) = player.join().unwrap();
        assert_eq!(tally.played(), 10);
        assert_eq!(table.results.len(), 10);
        assert!(table.errors.is_empty());
        let wins = table
            .results
            .iter()
            .filter(|(outcome, _, _)| *outcome == Outcome::Win)
            .count();
        assert_eq!(wins, tally.wins as usize);
    }

    shutdown.shutdown().unwrap();
    runner.join().unwrap();
}

#[test]
fn test_invalid_request_closes_connection() {
    let (addr, shutdown, runner) = start_server(None::<fn() -> Deck>);

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    let mut request = Request::new(1, "x").unwrap().encode();
    request[5] = 0;
    stream.write_all(&request).unwrap();
    assert!(matches!(
        utils::read_update(&mut stream),
        Err(SessionError::Disconnected)
    ));

    // The server keeps serving other clients.
    let mut client = Client::connect(&addr, Request::new(1, "ok").unwrap(), TIMEOUT).unwrap();
    assert_eq!(
        client.play(&mut Recorder::standing_at(17)).unwrap().played(),
        1
    );

    shutdown.shutdown().unwrap();
    runner.join().unwrap();
}

#[test]
fn test_server_disconnect_reports_single_error() {
    // A fake server that deals two cards and hangs up.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let fake = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        utils::read_request(&mut stream).unwrap();
        for c in [card(2, Suit::Heart), card(3, Suit::Heart)] {
            stream.write_all(&Payload::Update(Update::Card(c)).encode()).unwrap();
        }
    });

    let mut client = Client::connect(&addr, Request::new(3, "x").unwrap(), TIMEOUT).unwrap();
    let mut table = Recorder::standing_at(17);
    let error = client.play(&mut table).unwrap_err();
    fake.join().unwrap();

    assert!(matches!(error, SessionError::Disconnected));
    assert_eq!(table.errors.len(), 1);
    assert_eq!(table.finals, vec![Tally::default()]);
    assert!(table.results.is_empty());
}

#[test]
fn test_out_of_order_update_aborts_client() {
    // A result before the deal is over.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let fake = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        utils::read_request(&mut stream).unwrap();
        stream
            .write_all(&Payload::Update(Update::Card(card(2, Suit::Heart))).encode())
            .unwrap();
        stream
            .write_all(&Payload::Update(Update::Result(Outcome::Win)).encode())
            .unwrap();
    });

    let mut client = Client::connect(&addr, Request::new(1, "x").unwrap(), TIMEOUT).unwrap();
    let mut table = Recorder::standing_at(17);
    assert!(matches!(
        client.play(&mut table),
        Err(SessionError::Round(_))
    ));
    fake.join().unwrap();
    assert_eq!(table.errors.len(), 1);
}

#[test]
fn test_client_leaves_between_rounds() {
    let (addr, shutdown, runner) = start_server(Some(tie_deck));
    let mut client = Client::connect(&addr, Request::new(5, "quitter").unwrap(), TIMEOUT).unwrap();
    let mut table = Recorder {
        leave_after: Some(2),
        ..Recorder::standing_at(0)
    };

    let tally = client.play(&mut table).unwrap();
    assert_eq!(tally.ties, 2);
    assert_eq!(table.rounds.len(), 2);
    assert_eq!(table.finals, vec![tally]);
    drop(client);

    shutdown.shutdown().unwrap();
    runner.join().unwrap();
}
