//! TCP Server
//!
//! Accepts connections and dispatches them to a pool of worker threads,
//! spilling over to per-connection threads when every worker is busy.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Sender, TrySendError};
use crossbeam::thread::{self as scoped, Scope};

use crate::config::Config;
use crate::error::{LogError, Result};
use crate::service::LogService;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for proglog
pub struct Server {
    config: Config,
    service: LogService,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
}

/// Cloneable handle that stops a running server
#[derive(Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Ask the server to stop accepting and return from `run`
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, service: LogService) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            LogError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            service,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Number of connections currently being served or queued
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    /// Start the server (blocking)
    ///
    /// Accepted connections go to an idle pooled worker when one is waiting,
    /// and to a thread of their own otherwise, so a connection never queues
    /// behind another. Returns once shutdown is requested and every
    /// connection has finished.
    pub fn run(&self) -> Result<()> {
        tracing::info!(
            "Listening on {} with {} pooled workers",
            self.local_addr()?,
            self.config.worker_threads
        );

        scoped::scope(|scope| {
            // Zero capacity: a send only succeeds into an idle worker
            let (tx, rx) = channel::bounded::<TcpStream>(0);

            for id in 0..self.config.worker_threads {
                let rx = rx.clone();
                let spawned = scope
                    .builder()
                    .name(format!("proglog-worker-{}", id))
                    .spawn(move |_| {
                        for stream in rx.iter() {
                            self.serve(stream);
                        }
                    });
                if let Err(e) = spawned {
                    tracing::warn!("Failed to spawn worker {}: {}", id, e);
                }
            }

            self.accept_loop(scope, &tx);

            tracing::info!("Shutting down, waiting for connections");
            drop(tx);
        })
        .map_err(|_| LogError::Network("connection thread panicked".to_string()))
    }

    fn accept_loop<'s>(&'s self, scope: &Scope<'s>, tx: &Sender<TcpStream>) {
        while !self.shutdown.load(Ordering::Acquire) {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    continue;
                }
            };

            if self.active_connections.load(Ordering::Acquire) >= self.config.max_connections {
                tracing::warn!("Rejecting {}: connection limit reached", peer);
                continue;
            }
            if let Err(e) = stream.set_nonblocking(false) {
                tracing::warn!("Dropping {}: {}", peer, e);
                continue;
            }
            self.active_connections.fetch_add(1, Ordering::AcqRel);

            let stream = match tx.try_send(stream) {
                Ok(()) => continue,
                Err(TrySendError::Full(stream)) | Err(TrySendError::Disconnected(stream)) => {
                    stream
                }
            };

            // Every pooled worker is busy
            let spawned = scope
                .builder()
                .name(format!("proglog-conn-{}", peer))
                .spawn(move |_| self.serve(stream));
            if let Err(e) = spawned {
                tracing::warn!("Dropping {}: failed to spawn connection thread: {}", peer, e);
                self.active_connections.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }

    fn serve(&self, stream: TcpStream) {
        let result = Connection::new(stream, self.service.clone()).and_then(|mut conn| {
            conn.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;
            conn.handle()
        });
        if let Err(e) = result {
            tracing::debug!("Connection ended with error: {}", e);
        }
        self.active_connections.fetch_sub(1, Ordering::AcqRel);
    }
}
