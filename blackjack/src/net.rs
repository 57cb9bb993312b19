//! Networking layer for client-server communication.
//!
//! Gameplay runs over TCP with fixed-width binary frames; servers announce
//! themselves with UDP broadcasts. Everything here is blocking; the server
//! uses `mio` only to watch its listening socket.

/// Blocking TCP client that plays a session through a [`client::Table`].
pub mod client;

/// UDP offer broadcaster and listener.
pub mod discovery;

/// Session error types.
pub mod errors;

/// Wire frames: offers, requests, and payloads.
pub mod messages;

/// Multi-threaded TCP server with a `mio` accept loop.
pub mod server;

/// Dealer side of one connection.
pub mod session;

/// Frame reads and writes over byte streams.
pub mod utils;
