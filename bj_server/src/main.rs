//! LAN blackjack dealer.
//!
//! Broadcasts offers on the local network and deals to every client that
//! connects, one thread per session.

mod config;

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use anyhow::{Context, Error};
use blackjack::{discovery::Broadcaster, messages::Offer, server::Server};
use config::{Overrides, ServerConfig};
use ctrlc::set_handler;
use log::{error, info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run a LAN blackjack dealer

USAGE:
  bj_server [OPTIONS]

OPTIONS:
  --name            NAME    Advertised name    [default: env BJ_SERVER_NAME or Blackijecky]
  --bind            IP      TCP address        [default: env BJ_BIND_IP or 0.0.0.0]
  --port            PORT    TCP port, 0 = any  [default: env BJ_TCP_PORT or 0]
  --discovery-port  PORT    UDP offer port     [default: env BJ_DISCOVERY_PORT or 13122]
  --broadcast       IP      Broadcast address  [default: env BJ_BROADCAST_ADDR or 255.255.255.255]
  --timeout         SECS    Socket timeout     [default: env BJ_IO_TIMEOUT_SECS or 30]
  --grace           SECS    Shutdown grace     [default: env BJ_SHUTDOWN_GRACE_SECS or 5]
  --seed            N       Deck seed          [default: env BJ_DECK_SEED]

FLAGS:
  -h, --help                Print help information

ENVIRONMENT:
  RUST_LOG                  Log filter [default: info]
  (Variables may also be set in a .env file)
";

/// Best guess at the address other hosts on the LAN reach us by. Connecting
/// a UDP socket sends nothing but makes the OS pick the outbound interface.
fn lan_ip() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        name: pargs.opt_value_from_str("--name")?,
        bind_ip: pargs.opt_value_from_str("--bind")?,
        tcp_port: pargs.opt_value_from_str("--port")?,
        discovery_port: pargs.opt_value_from_str("--discovery-port")?,
        broadcast_addr: pargs.opt_value_from_str("--broadcast")?,
        io_timeout_secs: pargs.opt_value_from_str("--timeout")?,
        shutdown_grace_secs: pargs.opt_value_from_str("--grace")?,
        deck_seed: pargs.opt_value_from_str("--seed")?,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        warn!("ignoring unused arguments: {remaining:?}");
    }

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    let server = Server::bind(config.bind_addr(), config.blackjack_config())
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    let tcp_port = server.local_addr()?.port();
    info!(
        "{} listening on {} (LAN address {}:{tcp_port})",
        config.name,
        server.local_addr()?,
        lan_ip()
    );
    if let Some(seed) = config.deck_seed {
        info!("dealing reproducible decks from seed {seed}");
    }

    // Catching signals for a graceful exit.
    let shutdown = server.shutdown_handle();
    set_handler(move || {
        info!("shutting down");
        if let Err(error) = shutdown.shutdown() {
            error!("failed to wake the server: {error}");
        }
    })?;

    let broadcaster = Broadcaster::new(
        &Offer::new(tcp_port, &config.name),
        config.broadcast_target(),
    )?
    .spawn()?;

    let result = server.run();
    broadcaster.stop();
    Ok(result?)
}
