//! Networked store client
//!
//! Talks to a `keystore-node` over the framed wire protocol. Connections
//! are pooled; each one has the configured keyspace selected when it is
//! opened.
//!
//! ## Failure policy
//! - A refused or reset connection is `Unavailable`
//! - A read/write/connect timeout is `TimedOut`
//! - A pooled connection that turns out to be dead (the node closes idle
//!   sessions) is replaced once by a fresh connection; fresh connections
//!   are never retried

use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;

use super::{BackendFault, ConsistencyLevel, KeySlice, KeyStore, RowMutation, StoreResult};
use crate::error::{PksError, Result};
use crate::protocol::{read_response, write_request, Request, Response};
use crate::rowkey::KeyRange;

/// Idle connections kept for reuse
const MAX_IDLE_CONNECTIONS: usize = 16;

/// Pooled client for a store node
pub struct RemoteStore {
    addr: String,
    keyspace: String,
    timeout: Duration,
    idle: Mutex<Vec<StoreConnection>>,
}

impl RemoteStore {
    /// Connect to the node at `addr` and select `keyspace`
    ///
    /// Fails if the node is unreachable or does not serve the keyspace, so
    /// misconfiguration surfaces at startup.
    pub fn connect(addr: &str, keyspace: &str, timeout: Duration) -> Result<Self> {
        let connection = StoreConnection::open(addr, keyspace, timeout)?;
        tracing::info!("Connected to store node {} (keyspace {})", addr, keyspace);

        Ok(Self {
            addr: addr.to_string(),
            keyspace: keyspace.to_string(),
            timeout,
            idle: Mutex::new(vec![connection]),
        })
    }

    /// Round-trip a ping to the node
    pub fn ping(&self) -> StoreResult<()> {
        match self.call(&Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn idle_connections(&self) -> usize {
        self.idle.lock().len()
    }

    fn call(&self, request: &Request) -> StoreResult<Response> {
        let pooled = self.idle.lock().pop();
        if let Some(mut connection) = pooled {
            match connection.roundtrip(request) {
                Ok(response) => {
                    self.release(connection);
                    return Ok(response);
                }
                Err(e) => {
                    let fault = fault_from_error(&e);
                    if fault == BackendFault::TimedOut {
                        return Err(fault);
                    }
                    tracing::debug!("Pooled store connection failed ({}); reconnecting", e);
                }
            }
        }

        let mut connection = StoreConnection::open(&self.addr, &self.keyspace, self.timeout)?;
        match connection.roundtrip(request) {
            Ok(response) => {
                self.release(connection);
                Ok(response)
            }
            Err(e) => Err(fault_from_error(&e)),
        }
    }

    fn release(&self, connection: StoreConnection) {
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(connection);
        }
    }
}

impl KeyStore for RemoteStore {
    fn batch_mutate(
        &self,
        mutations: &[RowMutation],
        consistency: ConsistencyLevel,
    ) -> StoreResult<()> {
        let request = Request::BatchMutate {
            mutations: mutations.to_vec(),
            consistency,
        };
        match self.call(&request)? {
            Response::Ok => Ok(()),
            Response::Fault(fault) => Err(fault),
            other => Err(unexpected(&other)),
        }
    }

    fn range_scan(
        &self,
        column_family: &str,
        columns: &[Vec<u8>],
        range: &KeyRange,
        consistency: ConsistencyLevel,
    ) -> StoreResult<Vec<KeySlice>> {
        let request = Request::GetRangeSlices {
            column_family: column_family.to_string(),
            columns: columns.to_vec(),
            range: range.clone(),
            consistency,
        };
        match self.call(&request)? {
            Response::Slices(slices) => Ok(slices),
            Response::Fault(fault) => Err(fault),
            other => Err(unexpected(&other)),
        }
    }
}

/// One session with the node
struct StoreConnection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl StoreConnection {
    /// Connect to the first reachable address and select the keyspace
    fn open(addr: &str, keyspace: &str, timeout: Duration) -> StoreResult<Self> {
        let addrs = addr
            .to_socket_addrs()
            .map_err(|e| BackendFault::Other(format!("cannot resolve {}: {}", addr, e)))?;

        let mut last_fault = BackendFault::Unavailable;
        for socket_addr in addrs {
            match TcpStream::connect_timeout(&socket_addr, timeout) {
                Ok(stream) => {
                    let mut connection = Self::setup(stream, timeout).map_err(|e| fault_from_io(&e))?;
                    connection.select_keyspace(keyspace)?;
                    return Ok(connection);
                }
                Err(e) => {
                    tracing::debug!("Connecting to {} failed: {}", socket_addr, e);
                    last_fault = fault_from_io(&e);
                }
            }
        }
        Err(last_fault)
    }

    fn setup(stream: TcpStream, timeout: Duration) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    fn select_keyspace(&mut self, keyspace: &str) -> StoreResult<()> {
        let request = Request::SetKeyspace {
            keyspace: keyspace.to_string(),
        };
        match self.roundtrip(&request) {
            Ok(Response::Ok) => Ok(()),
            Ok(Response::Fault(fault)) => Err(fault),
            Ok(other) => Err(unexpected(&other)),
            Err(e) => Err(fault_from_error(&e)),
        }
    }

    fn roundtrip(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        read_response(&mut self.reader)
    }
}

fn fault_from_io(e: &io::Error) -> BackendFault {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => BackendFault::TimedOut,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected
        | ErrorKind::UnexpectedEof
        | ErrorKind::AddrNotAvailable => BackendFault::Unavailable,
        _ => BackendFault::Other(e.to_string()),
    }
}

fn fault_from_error(e: &PksError) -> BackendFault {
    match e {
        PksError::Io(io_err) => fault_from_io(io_err),
        PksError::Backend(fault) => fault.clone(),
        other => BackendFault::Other(other.to_string()),
    }
}

fn unexpected(response: &Response) -> BackendFault {
    BackendFault::Other(format!("unexpected response {:?}", response.status()))
}
