//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use super::Connection;
use crate::config::NodeConfig;
use crate::engine::Engine;
use crate::error::Result;

/// How often the accept loop checks the shutdown flag
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for a store node
pub struct Server {
    config: NodeConfig,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listen address from the config
    pub fn bind(config: NodeConfig, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        // Non-blocking accept so the loop can observe shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops `run` when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Start the server (blocking)
    ///
    /// Returns after shutdown is signalled and every worker has finished
    /// its current session.
    pub fn run(&self) -> Result<()> {
        let workers = self.config.max_connections.max(1);
        let (sender, receiver) = channel::bounded::<TcpStream>(workers);

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let receiver = receiver.clone();
                let engine = Arc::clone(&self.engine);
                let config = self.config.clone();
                thread::Builder::new()
                    .name(format!("keystore-worker-{}", id))
                    .spawn(move || worker_loop(receiver, engine, config))
            })
            .collect::<std::io::Result<Vec<_>>>()?;
        drop(receiver);

        tracing::info!(
            "Store node listening on {} ({} workers)",
            self.local_addr()?,
            workers
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::trace!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    if sender.send(stream).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Error accepting connection: {}", e);
                }
            }
        }

        drop(sender);
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }
}

/// Serve connections from the queue until the channel closes
fn worker_loop(receiver: Receiver<TcpStream>, engine: Arc<Engine>, config: NodeConfig) {
    for stream in receiver.iter() {
        let mut connection = match Connection::new(stream, Arc::clone(&engine)) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("Failed to set up connection: {}", e);
                continue;
            }
        };

        if let Err(e) = connection.set_timeouts(config.read_timeout_ms, config.write_timeout_ms) {
            tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
            continue;
        }

        if let Err(e) = connection.handle() {
            tracing::debug!("Session with {} ended: {}", connection.peer_addr(), e);
        }
    }
}
