//! Line-oriented console front end.
//!
//! [`ConsoleTable`] prints every game event and reads decisions from any
//! buffered reader, so tests can drive it with in-memory input.

use blackjack::{
    Table,
    discovery::DiscoveredServer,
    entities::{Card, Decision, Hand, Outcome, Party, Tally},
};
use log::warn;
use std::{
    fmt,
    io::{self, BufRead, Write},
};

use crate::commands::{
    ParseError, ServerChoice, parse_decision, parse_rounds, parse_server_choice,
    parse_team_name, parse_yes_no,
};

const RULE: &str = "============================================================";

pub struct ConsoleTable<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleTable<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print one line. A console that can't be written to is logged and
    /// otherwise ignored; the game goes on.
    fn say(&mut self, line: fmt::Arguments) {
        if let Err(error) = writeln!(self.output, "{line}") {
            warn!("couldn't write to console: {error}");
        }
    }

    /// Ask until `parse` accepts the answer.
    ///
    /// # Errors
    ///
    /// Fails if input ends or can't be read.
    pub fn prompt<T, F>(&mut self, question: &str, parse: F) -> io::Result<T>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        loop {
            write!(self.output, "{question}")?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed",
                ));
            }
            match parse(&line) {
                Ok(value) => return Ok(value),
                Err(error) => self.say(format_args!("{error}")),
            }
        }
    }

    pub fn prompt_team_name(&mut self) -> io::Result<String> {
        self.prompt("Enter your team name: ", parse_team_name)
    }

    pub fn prompt_rounds(&mut self) -> io::Result<u8> {
        self.prompt("Enter number of rounds (1-255): ", parse_rounds)
    }

    pub fn prompt_play_again(&mut self) -> io::Result<bool> {
        self.prompt("\nPlay again? (y/n): ", parse_yes_no)
    }

    /// List `servers` and ask which one to join.
    pub fn prompt_server(&mut self, servers: &[DiscoveredServer]) -> io::Result<ServerChoice> {
        self.say(format_args!("\n{RULE}\nAvailable Servers:\n{RULE}"));
        for (i, server) in servers.iter().enumerate() {
            self.say(format_args!("{}. {server}", i + 1));
        }
        self.say(format_args!("0. Refresh list\n{RULE}"));
        let question = format!("Select server (0-{}): ", servers.len());
        self.prompt(&question, |input| parse_server_choice(input, servers.len()))
    }

    pub fn waiting_for_servers(&mut self) {
        self.say(format_args!("[No servers found yet... waiting for broadcasts]"));
    }

    pub fn game_starting(&mut self, server: &str, team: &str, rounds: u8) {
        self.say(format_args!(
            "\nConnected to {server}\nTeam: {team}\nRounds: {rounds}\nStarting game..."
        ));
    }

    pub fn notice(&mut self, message: &str) {
        self.say(format_args!("\n{message}"));
    }

    pub fn error(&mut self, message: &str) {
        self.say(format_args!("\n[ERROR] {message}"));
    }
}

impl<R: BufRead, W: Write> Table for ConsoleTable<R, W> {
    fn round_started(&mut self, round: u8, total: u8) {
        self.say(format_args!("\n{RULE}\nRound {round}/{total}\n{RULE}"));
    }

    fn initial_hand(&mut self, player: &Hand, dealer_up: Card) {
        self.say(format_args!(
            "Initial deal:\nYour hand: {player}\nDealer showing: {dealer_up}"
        ));
    }

    fn decide(&mut self, player: &Hand, _dealer_up: Card) -> Decision {
        match self.prompt("\nHit or Stand? (h/s): ", parse_decision) {
            Ok(decision) => decision,
            Err(error) => {
                warn!("no decision from the console ({error}), standing on {}", player.value());
                Decision::Stand
            }
        }
    }

    fn card_drawn(&mut self, card: Card, owner: Party) {
        match owner {
            Party::Player => self.say(format_args!("You drew: {card}")),
            Party::Dealer => self.say(format_args!("Dealer drew: {card}")),
        }
    }

    fn bust(&mut self, owner: Party) {
        match owner {
            Party::Player => self.say(format_args!("\nYou BUST!")),
            Party::Dealer => self.say(format_args!("\nDealer BUST!")),
        }
    }

    fn round_result(&mut self, outcome: Outcome, player: &Hand, dealer: &Hand) {
        let verdict = match outcome {
            Outcome::Tie => "TIE",
            Outcome::Loss => "LOSS - Dealer wins",
            Outcome::Win => "WIN - You win!",
        };
        self.say(format_args!(
            "Your hand: {player}\nDealer hand: {dealer}\n\nRound result: {verdict}"
        ));
    }

    fn session_error(&mut self, message: &str) {
        self.error(message);
    }

    fn final_statistics(&mut self, tally: &Tally) {
        self.say(format_args!(
            "\n{RULE}\nFINAL STATISTICS\n{RULE}\n\
             Wins:        {}\n\
             Losses:      {}\n\
             Ties:        {}\n\
             Total:       {}\n\
             Win rate:    {:.1}%\n{RULE}",
            tally.wins,
            tally.losses,
            tally.ties,
            tally.played(),
            tally.win_rate()
        ));
    }
}
