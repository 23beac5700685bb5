//! Connection Handler
//!
//! Handles individual client sessions on the store node.

use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{PksError, Result};
use crate::protocol::{encode_response, read_request, write_response, Request, Response};
use crate::store::BackendFault;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,

    /// Keyspace selected by the session
    keyspace: Option<String>,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
            keyspace: None,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses.
    /// Returns when the client disconnects, goes idle past the read
    /// timeout, or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let request = match read_request(&mut self.reader) {
                Ok(request) => request,
                Err(PksError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(PksError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Closing idle connection from {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = write_response(&mut self.writer, &Response::invalid(e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received {:?} from {}", request.kind(), self.peer_addr);

            let response = self.execute(request);

            if let Err(e) = self.send(&response) {
                if let PksError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Frame and send a response
    ///
    /// A response that cannot be framed (a scan larger than the payload
    /// limit) is replaced by a fault so the client always gets a reply.
    fn send(&mut self, response: &Response) -> Result<()> {
        let bytes = match encode_response(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Cannot frame response to {}: {}", self.peer_addr, e);
                encode_response(&Response::Fault(BackendFault::Other(format!(
                    "result too large: {}",
                    e
                ))))?
            }
        };
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Execute a request and return a response
    fn execute(&mut self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::SetKeyspace { keyspace } => {
                if self.engine.has_keyspace(&keyspace) {
                    self.keyspace = Some(keyspace);
                    Response::Ok
                } else {
                    Response::invalid(format!("Keyspace {} does not exist", keyspace))
                }
            }
            Request::BatchMutate { mutations, .. } => match &self.keyspace {
                Some(keyspace) => match self.engine.batch_mutate(keyspace, mutations) {
                    Ok(()) => Response::Ok,
                    Err(fault) => Response::Fault(fault),
                },
                None => Response::invalid("You have not set a keyspace for this session"),
            },
            Request::GetRangeSlices {
                column_family,
                columns,
                range,
                ..
            } => match &self.keyspace {
                Some(keyspace) => {
                    match self
                        .engine
                        .range_slices(keyspace, &column_family, &columns, &range)
                    {
                        Ok(slices) => Response::Slices(slices),
                        Err(fault) => Response::Fault(fault),
                    }
                }
                None => Response::invalid("You have not set a keyspace for this session"),
            },
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
