//! LAN discovery over UDP broadcast.
//!
//! Servers announce themselves with an [`Offer`] once per interval;
//! clients collect the offers they hear into an [`OfferBook`].

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    fmt, io,
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use super::messages::{OFFER_LEN, Offer};

/// Well-known port offers are broadcast to.
pub const OFFER_UDP_PORT: u16 = 13122;

pub const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Time between offers, and the listener's receive timeout.
pub const OFFER_INTERVAL: Duration = Duration::from_secs(1);

/// A server heard on the network.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiscoveredServer {
    /// Sender IP with the advertised TCP port.
    pub addr: SocketAddr,
    pub name: String,
}

impl fmt::Display for DiscoveredServer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} @ {}", self.name, self.addr)
    }
}

/// Append-only, thread-safe list of discovered servers.
#[derive(Clone, Debug, Default)]
pub struct OfferBook(Arc<Mutex<Vec<DiscoveredServer>>>);

impl OfferBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server unless one with the same address is already listed.
    /// Returns whether it was new.
    pub fn insert(&self, server: DiscoveredServer) -> bool {
        let mut servers = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if servers.iter().any(|known| known.addr == server.addr) {
            return false;
        }
        servers.push(server);
        true
    }

    /// Copy of the servers discovered so far, in discovery order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DiscoveredServer> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically broadcasts one server's offer.
pub struct Broadcaster {
    socket: UdpSocket,
    target: SocketAddr,
    frame: [u8; OFFER_LEN],
    interval: Duration,
}

impl Broadcaster {
    pub fn new(offer: &Offer, target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            target,
            frame: offer.encode(),
            interval: OFFER_INTERVAL,
        })
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start broadcasting on a background thread.
    pub fn spawn(self) -> io::Result<BroadcastHandle> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("offer-broadcaster".to_string())
            .spawn(move || {
                info!("broadcasting offers to {}", self.target);
                loop {
                    if let Err(error) = self.socket.send_to(&self.frame, self.target) {
                        warn!("couldn't broadcast offer: {error}");
                    }
                    match stop_rx.recv_timeout(self.interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("broadcaster stopped");
            })?;
        Ok(BroadcastHandle { stop_tx, handle })
    }
}

/// Owns a running broadcaster. Dropping it also stops the broadcaster.
pub struct BroadcastHandle {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl BroadcastHandle {
    pub fn stop(self) {
        // A send error means the thread is already gone.
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            warn!("broadcaster panicked");
        }
    }
}

/// Collects offers heard on a UDP port.
pub struct OfferListener {
    socket: UdpSocket,
    book: OfferBook,
}

impl OfferListener {
    /// Bind the offer port with address and port reuse enabled, so several
    /// clients on one host can listen at once.
    pub fn bind(port: u16) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;
        let socket: UdpSocket = socket.into();
        socket.set_read_timeout(Some(OFFER_INTERVAL))?;
        Ok(Self {
            socket,
            book: OfferBook::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    #[must_use]
    pub fn book(&self) -> OfferBook {
        self.book.clone()
    }

    /// Wait up to one interval for a datagram and record it if it's a
    /// valid offer.
    pub fn listen_once(&self) -> io::Result<Option<DiscoveredServer>> {
        // Room for one byte more than an offer so oversized datagrams are
        // still read whole.
        let mut buf = [0; OFFER_LEN + 1];
        let (len, sender) = match self.socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let offer = match Offer::decode(&buf[..len]) {
            Ok(offer) => offer,
            Err(error) => {
                debug!("discarding datagram from {sender}: {error}");
                return Ok(None);
            }
        };
        let server = DiscoveredServer {
            addr: SocketAddr::new(sender.ip(), offer.tcp_port),
            name: offer.server_name,
        };
        if self.book.insert(server.clone()) {
            info!("discovered {server}");
        }
        Ok(Some(server))
    }

    /// Start listening on a background thread.
    pub fn spawn(self) -> io::Result<ListenerHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let book = self.book();
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("offer-listener".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::SeqCst) {
                    if let Err(error) = self.listen_once() {
                        warn!("couldn't receive offers: {error}");
                        thread::sleep(OFFER_INTERVAL);
                    }
                }
                debug!("listener stopped");
            })?;
        Ok(ListenerHandle { stop, book, handle })
    }
}

/// Owns a running listener and shares its book.
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    book: OfferBook,
    handle: JoinHandle<()>,
}

impl ListenerHandle {
    #[must_use]
    pub fn book(&self) -> OfferBook {
        self.book.clone()
    }

    /// Stop listening. Returns within one interval.
    pub fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        if self.handle.join().is_err() {
            warn!("listener panicked");
        }
    }
}
