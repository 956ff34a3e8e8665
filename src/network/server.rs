//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.
//!
//! A connection goes to an idle pool worker when there is one and otherwise
//! gets its own thread, so a busy pool never delays a new client. The total
//! stays capped by `max_connections`.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};

use super::Connection;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{NimbusError, Result};
use crate::protocol::{encode_error, write_response};

/// How often the accept loop and expiry sweep check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for NimbusKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,

    /// Connections accepted and not yet closed
    active: Arc<AtomicUsize>,
}

/// Cloneable handle that stops a running server from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Server {
    /// Bind the listen address from `config`
    ///
    /// Binding to port 0 picks a free port; see [`Server::local_addr`].
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            NimbusError::Connectivity(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Threads still serving a connection finish it on their own once
    /// `run` returns.
    pub fn run(&self) -> Result<()> {
        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.worker_threads);
        let idle = Arc::new(AtomicUsize::new(self.config.worker_threads));

        for id in 0..self.config.worker_threads {
            self.spawn_worker(id, receiver.clone(), Arc::clone(&idle))?;
        }
        drop(receiver);

        let sweeper = self.spawn_expiry_sweep()?;

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                        tracing::warn!("Rejecting {}: connection limit reached", addr);
                        reject(stream);
                        continue;
                    }

                    tracing::debug!("Accepted connection from {}", addr);
                    self.active.fetch_add(1, Ordering::SeqCst);

                    // Never queue behind a busy worker
                    if claim_worker(&idle) {
                        if sender.send(stream).is_err() {
                            self.active.fetch_sub(1, Ordering::SeqCst);
                            return Err(NimbusError::Server("worker pool has shut down".into()));
                        }
                    } else {
                        self.spawn_dedicated(stream, addr);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down server");
        drop(sender);
        if let Some(handle) = sweeper {
            let _ = handle.join();
        }

        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// A handle for stopping the server while `run` blocks
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn spawn_worker(
        &self,
        id: usize,
        receiver: Receiver<TcpStream>,
        idle: Arc<AtomicUsize>,
    ) -> Result<()> {
        let engine = Arc::clone(&self.engine);
        let active = Arc::clone(&self.active);
        let timeouts = self.timeouts();

        thread::Builder::new()
            .name(format!("nimbuskv-worker-{}", id))
            .spawn(move || {
                for stream in receiver.iter() {
                    serve(stream, &engine, timeouts);
                    active.fetch_sub(1, Ordering::SeqCst);
                    idle.fetch_add(1, Ordering::SeqCst);
                }
                tracing::trace!("Worker {} exiting", id);
            })?;

        Ok(())
    }

    /// Serve one connection on its own thread while every worker is busy
    fn spawn_dedicated(&self, stream: TcpStream, addr: SocketAddr) {
        let engine = Arc::clone(&self.engine);
        let active = Arc::clone(&self.active);
        let timeouts = self.timeouts();

        let spawned = thread::Builder::new()
            .name(format!("nimbuskv-conn-{}", addr))
            .spawn(move || {
                serve(stream, &engine, timeouts);
                active.fetch_sub(1, Ordering::SeqCst);
            });

        if let Err(e) = spawned {
            tracing::warn!("Dropping {}: failed to spawn connection thread: {}", addr, e);
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn timeouts(&self) -> (u64, u64) {
        (self.config.read_timeout_ms, self.config.write_timeout_ms)
    }

    fn spawn_expiry_sweep(&self) -> Result<Option<JoinHandle<()>>> {
        let interval_ms = self.config.expiry_scan_interval_ms;
        if interval_ms == 0 {
            return Ok(None);
        }

        let interval = Duration::from_millis(interval_ms);
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = thread::Builder::new()
            .name("nimbuskv-expiry".into())
            .spawn(move || {
                let mut last_scan = Instant::now();
                while !shutdown.load(Ordering::SeqCst) {
                    thread::sleep(POLL_INTERVAL);
                    if last_scan.elapsed() < interval {
                        continue;
                    }
                    let evicted = engine.evict_expired();
                    if evicted > 0 {
                        tracing::info!("Evicted {} expired records", evicted);
                    }
                    last_scan = Instant::now();
                }
            })?;

        Ok(Some(handle))
    }
}

/// Take one idle worker, if any
fn claim_worker(idle: &AtomicUsize) -> bool {
    idle.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn serve(stream: TcpStream, engine: &Arc<Engine>, timeouts: (u64, u64)) {
    if let Err(e) = handle_stream(stream, engine, timeouts) {
        tracing::warn!("Connection closed with error: {}", e);
    }
}

fn handle_stream(
    stream: TcpStream,
    engine: &Arc<Engine>,
    (read_timeout_ms, write_timeout_ms): (u64, u64),
) -> Result<()> {
    // Accepted sockets may inherit the listener's non-blocking mode
    stream.set_nonblocking(false)?;

    let mut connection = Connection::new(stream, Arc::clone(engine))?;
    connection.set_timeouts(read_timeout_ms, write_timeout_ms)?;
    connection.handle()
}

fn reject(mut stream: TcpStream) {
    let _ = stream.set_nonblocking(false);
    let err = NimbusError::Server("too many connections".into());
    let _ = write_response(&mut stream, &encode_error(&err));
}
