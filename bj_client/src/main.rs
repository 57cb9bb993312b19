//! A console client for LAN blackjack servers.
//!
//! The client listens for server offers, lets the user pick a server, and
//! plays the requested number of rounds against it.

use anyhow::{Result, bail};
use bj_client::{
    auto::AutoPlayer,
    commands::{ServerChoice, parse_rounds, parse_team_name},
    console::ConsoleTable,
};
use blackjack::{
    Client, Table,
    discovery::{DiscoveredServer, OFFER_INTERVAL, OFFER_UDP_PORT, OfferBook, OfferListener},
    entities::Tally,
    messages::Request,
    utils::IO_TIMEOUT,
};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use serde::Serialize;
use std::{
    io::{self, BufRead, Write},
    net::SocketAddr,
    thread,
    time::{Duration, Instant},
};

const HELP: &str = "\
Play blackjack against a server on the local network

USAGE:
  bj_client [OPTIONS]

OPTIONS:
  --team            NAME     Team name, 1-32 bytes       [default: prompt]
  --rounds          N        Rounds to play, 1-255       [default: prompt]
  --server          IP:PORT  Skip discovery and connect here
  --discovery-port  PORT     UDP port to hear offers on  [default: 13122]
  --timeout         SECS     Gameplay socket timeout     [default: 30]
  --auto                     Play without prompts, hitting below 17
  --json                     Print each session summary as JSON

FLAGS:
  -h, --help                 Print help information
";

const AUTO_TEAM: &str = "Autoplayer";
const AUTO_ROUNDS: u8 = 10;

struct Args {
    team: Option<String>,
    rounds: Option<u8>,
    server: Option<SocketAddr>,
    discovery_port: u16,
    timeout: Duration,
    auto: bool,
    json: bool,
}

/// What `--json` prints after each session.
#[derive(Serialize)]
struct Summary {
    team: String,
    server: DiscoveredServer,
    rounds_requested: u8,
    tally: Tally,
    win_rate: f64,
    error: Option<String>,
}

fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        team: pargs.opt_value_from_fn("--team", parse_team_name)?,
        rounds: pargs.opt_value_from_fn("--rounds", parse_rounds)?,
        server: pargs.opt_value_from_str("--server")?,
        discovery_port: pargs
            .opt_value_from_str("--discovery-port")?
            .unwrap_or(OFFER_UDP_PORT),
        timeout: pargs
            .opt_value_from_str("--timeout")?
            .map_or(IO_TIMEOUT, Duration::from_secs),
        auto: pargs.contains("--auto"),
        json: pargs.contains("--json"),
    };

    // Logs go to stderr and stay quiet unless asked for, so they don't
    // interleave with the game.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_target(false)
        .init();

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    let stdin = io::stdin();
    let mut console = ConsoleTable::new(stdin.lock(), io::stdout());
    run(args, &mut console)
}

fn run<R: BufRead, W: Write>(args: Args, console: &mut ConsoleTable<R, W>) -> Result<()> {
    let team = match args.team {
        Some(team) => team,
        None if args.auto => AUTO_TEAM.to_string(),
        None => console.prompt_team_name()?,
    };
    let rounds = match args.rounds {
        Some(rounds) => rounds,
        None if args.auto => AUTO_ROUNDS,
        None => console.prompt_rounds()?,
    };
    let request = Request::new(rounds, &team)?;

    let listener = match args.server {
        Some(_) => None,
        None => {
            if !args.auto {
                console.notice("Starting server discovery...");
            }
            let listener = OfferListener::bind(args.discovery_port)?.spawn()?;
            // Give the first offers a chance to arrive.
            thread::sleep(OFFER_INTERVAL * 2);
            Some(listener)
        }
    };

    loop {
        let server = match (args.server, &listener) {
            (Some(addr), _) => DiscoveredServer {
                addr,
                name: addr.to_string(),
            },
            (None, Some(listener)) => {
                let book = listener.book();
                if args.auto {
                    wait_for_server(&book, args.timeout)?
                } else {
                    choose_server(console, &book)?
                }
            }
            (None, None) => bail!("no server address and no discovery"),
        };

        let summary = if args.auto {
            let mut player = AutoPlayer::new(&team);
            play_session(&mut player, server, &request, args.timeout)
        } else {
            console.game_starting(&server.name, &team, rounds);
            play_session(&mut *console, server, &request, args.timeout)
        };

        if args.json {
            println!("{}", serde_json::to_string(&summary)?);
        }

        if args.auto {
            if let Some(error) = summary.error {
                bail!("session with {} failed: {error}", summary.server);
            }
            break;
        }
        if !console.prompt_play_again()? {
            console.notice("Thanks for playing!");
            break;
        }
    }

    if let Some(listener) = listener {
        listener.stop();
    }
    Ok(())
}

/// Show the discovered servers until the user picks one.
fn choose_server<R: BufRead, W: Write>(
    console: &mut ConsoleTable<R, W>,
    book: &OfferBook,
) -> Result<DiscoveredServer> {
    loop {
        let servers = book.snapshot();
        if servers.is_empty() {
            console.waiting_for_servers();
            thread::sleep(OFFER_INTERVAL);
            continue;
        }
        match console.prompt_server(&servers)? {
            ServerChoice::Refresh => thread::sleep(OFFER_INTERVAL),
            ServerChoice::Pick(index) => {
                if let Some(server) = servers.into_iter().nth(index) {
                    return Ok(server);
                }
            }
        }
    }
}

/// Take the first server heard within `patience`.
fn wait_for_server(book: &OfferBook, patience: Duration) -> Result<DiscoveredServer> {
    let deadline = Instant::now() + patience;
    loop {
        if let Some(server) = book.snapshot().into_iter().next() {
            return Ok(server);
        }
        if Instant::now() >= deadline {
            bail!("no server offers heard within {}s", patience.as_secs());
        }
        thread::sleep(OFFER_INTERVAL);
    }
}

fn play_session<T: Table + ?Sized>(
    table: &mut T,
    server: DiscoveredServer,
    request: &Request,
    timeout: Duration,
) -> Summary {
    info!("joining {server}");
    let (tally, error) = match Client::connect(&server.addr, request.clone(), timeout) {
        Ok(mut client) => match client.play(table) {
            Ok(tally) => (tally, None),
            Err(error) => (client.tally, Some(error.to_string())),
        },
        Err(error) => {
            let message = format!("couldn't connect to {server}: {error}");
            table.session_error(&message);
            (Tally::default(), Some(message))
        }
    };
    Summary {
        team: request.team_name().to_string(),
        server,
        rounds_requested: request.rounds(),
        tally,
        win_rate: tally.win_rate(),
        error,
    }
}
