//! Multi-threaded blackjack server.
//!
//! A `mio` poller watches the listening socket and a waker used for
//! shutdown. Every accepted connection gets its own worker thread that owns
//! the session until it ends; workers share nothing but the stop flag.

use log::{debug, error, info, warn};
use mio::{Events, Interest, Poll, Token, Waker};
use rand::{SeedableRng, rngs::StdRng};
use std::{
    collections::HashMap,
    io,
    net::{Shutdown, SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use super::{session, utils::IO_TIMEOUT};
use crate::game::entities::Deck;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);

/// How often the accept loop wakes to reap finished workers.
const REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Default time in-flight sessions get to finish their round on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Server tuning that is shared read-only by every worker.
#[derive(Clone, Debug)]
pub struct BlackjackConfig {
    /// Read and write timeout for gameplay sockets.
    pub io_timeout: Duration,
    pub shutdown_grace: Duration,
    /// Seed for reproducible shuffles. Each session derives its own RNG
    /// from it.
    pub deck_seed: Option<u64>,
}

impl Default for BlackjackConfig {
    fn default() -> Self {
        Self {
            io_timeout: IO_TIMEOUT,
            shutdown_grace: SHUTDOWN_GRACE,
            deck_seed: None,
        }
    }
}

type DeckSource = Arc<dyn Fn() -> Deck + Send + Sync>;

/// Stops a running [`Server`] from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Stop accepting connections and let sessions wind down.
    pub fn shutdown(&self) -> io::Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        self.waker.wake()
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

struct Worker {
    stream: TcpStream,
    handle: JoinHandle<()>,
}

/// Reports a worker's exit to the accept loop however the worker ends.
struct ExitNotice {
    id: usize,
    tx: Sender<usize>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        // The accept loop may already be gone during teardown.
        let _ = self.tx.send(self.id);
    }
}

pub struct Server {
    listener: TcpListener,
    /// Poll registration of `listener`; both handles share one socket.
    _registered: mio::net::TcpListener,
    poll: Poll,
    config: BlackjackConfig,
    stop: Arc<AtomicBool>,
    waker: Arc<Waker>,
    decks: Option<DeckSource>,
}

impl Server {
    /// Bind the listening socket. Port 0 picks an ephemeral port; see
    /// [`Server::local_addr`].
    pub fn bind(addr: SocketAddr, config: BlackjackConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let poll = Poll::new()?;
        let mut registered = mio::net::TcpListener::from_std(listener.try_clone()?);
        poll.registry()
            .register(&mut registered, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);
        Ok(Self {
            listener,
            _registered: registered,
            poll,
            config,
            stop: Arc::new(AtomicBool::new(false)),
            waker,
            decks: None,
        })
    }

    /// Deal every round from decks built by `source` instead of shuffling.
    #[must_use]
    pub fn with_deck_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Deck + Send + Sync + 'static,
    {
        self.decks = Some(Arc::new(source));
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: self.stop.clone(),
            waker: self.waker.clone(),
        }
    }

    /// Accept connections until shut down, then give in-flight sessions
    /// the grace period to finish before closing their sockets.
    pub fn run(mut self) -> io::Result<()> {
        let (exit_tx, exit_rx) = mpsc::channel();
        let mut workers: HashMap<usize, Worker> = HashMap::new();
        let mut next_id = 0;
        let mut events = Events::with_capacity(16);

        info!("accepting connections on {}", self.local_addr()?);
        while !self.stop.load(Ordering::SeqCst) {
            if let Err(error) = self.poll.poll(&mut events, Some(REAP_INTERVAL)) {
                if error.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(error);
            }

            for event in &events {
                if event.token() == LISTENER {
                    self.accept_all(&mut workers, &mut next_id, &exit_tx);
                }
            }
            reap(&mut workers, &exit_rx);
        }

        self.drain(workers, &exit_rx);
        Ok(())
    }

    fn accept_all(
        &self,
        workers: &mut HashMap<usize, Worker>,
        next_id: &mut usize,
        exit_tx: &Sender<usize>,
    ) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let id = *next_id;
                    *next_id += 1;
                    match self.spawn_worker(id, stream, peer, exit_tx.clone()) {
                        Ok(worker) => {
                            workers.insert(id, worker);
                        }
                        Err(error) => error!("couldn't start session for {peer}: {error}"),
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    error!("accept failed: {error}");
                    return;
                }
            }
        }
    }

    fn spawn_worker(
        &self,
        id: usize,
        stream: TcpStream,
        peer: SocketAddr,
        exit_tx: Sender<usize>,
    ) -> io::Result<Worker> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.config.io_timeout))?;
        stream.set_write_timeout(Some(self.config.io_timeout))?;
        let mut worker_stream = stream.try_clone()?;

        let seed = self.config.deck_seed;
        let next_deck: Box<dyn FnMut() -> Deck + Send> = match (&self.decks, seed) {
            (Some(source), _) => {
                let source = source.clone();
                Box::new(move || source())
            }
            (None, Some(seed)) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(id as u64));
                Box::new(move || Deck::shuffled(&mut rng))
            }
            (None, None) => Box::new(Deck::new),
        };
        let stop = self.stop.clone();

        debug!("session {id}: accepted {peer}");
        let handle = thread::Builder::new()
            .name(format!("session-{id}"))
            .spawn(move || {
                let _notice = ExitNotice { id, tx: exit_tx };
                if let Err(error) = session::serve(&mut worker_stream, peer, next_deck, &stop) {
                    debug!("session {id} with {peer} ended: {error}");
                }
                if let Err(error) = worker_stream.shutdown(Shutdown::Both) {
                    debug!("session {id} socket already closed: {error}");
                }
            })?;
        Ok(Worker { stream, handle })
    }

    fn drain(&self, mut workers: HashMap<usize, Worker>, exit_rx: &Receiver<usize>) {
        info!(
            "shutting down; waiting up to {:?} for {} sessions",
            self.config.shutdown_grace,
            workers.len()
        );
        let deadline = Instant::now() + self.config.shutdown_grace;
        while !workers.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match exit_rx.recv_timeout(remaining) {
                Ok(id) => join(id, workers.remove(&id)),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }

        for (id, worker) in workers.drain() {
            warn!("session {id} still running after grace period; closing it");
            if let Err(error) = worker.stream.shutdown(Shutdown::Both) {
                debug!("session {id} socket already closed: {error}");
            }
            join(id, Some(worker));
        }
        info!("server stopped");
    }
}

fn reap(workers: &mut HashMap<usize, Worker>, exit_rx: &Receiver<usize>) {
    while let Ok(id) = exit_rx.try_recv() {
        join(id, workers.remove(&id));
    }
}

fn join(id: usize, worker: Option<Worker>) {
    if let Some(Err(_)) = worker.map(|worker| worker.handle.join()) {
        error!("session {id} panicked");
    }
}
