//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Kind (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! The kind byte is a [`RequestKind`](super::RequestKind) for requests and a [`Status`] for
//! responses. Payloads are the bincode encoding of the variant's fields.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;

use super::{Request, Response, Status};
use crate::error::{PksError, Result};
use crate::rowkey::KeyRange;
use crate::store::{BackendFault, ConsistencyLevel, KeySlice, RowMutation};

/// Header size: 1 byte kind/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let payload = match request {
        Request::SetKeyspace { keyspace } => bincode::serialize(keyspace)?,
        Request::BatchMutate {
            mutations,
            consistency,
        } => bincode::serialize(&(mutations, consistency))?,
        Request::GetRangeSlices {
            column_family,
            columns,
            range,
            consistency,
        } => bincode::serialize(&(column_family, columns, range, consistency))?,
        Request::Ping => Vec::new(),
    };

    frame(request.kind() as u8, &payload)
}

/// Decode a request from bytes
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (kind, payload) = split_frame(bytes)?;

    match kind {
        0x01 => Ok(Request::SetKeyspace {
            keyspace: deserialize(payload)?,
        }),
        0x02 => {
            let (mutations, consistency): (Vec<RowMutation>, ConsistencyLevel) =
                deserialize(payload)?;
            Ok(Request::BatchMutate {
                mutations,
                consistency,
            })
        }
        0x03 => {
            let (column_family, columns, range, consistency): (
                String,
                Vec<Vec<u8>>,
                KeyRange,
                ConsistencyLevel,
            ) = deserialize(payload)?;
            Ok(Request::GetRangeSlices {
                column_family,
                columns,
                range,
                consistency,
            })
        }
        0x04 => {
            expect_empty("PING request", payload)?;
            Ok(Request::Ping)
        }
        _ => Err(PksError::Protocol(format!(
            "Unknown request kind: 0x{:02x}",
            kind
        ))),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let payload = match response {
        Response::Ok | Response::Pong => Vec::new(),
        Response::Slices(slices) => bincode::serialize(slices)?,
        Response::Fault(fault) => bincode::serialize(fault)?,
    };

    frame(response.status() as u8, &payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status, payload) = split_frame(bytes)?;

    match status {
        s if s == Status::Ok as u8 => {
            expect_empty("OK response", payload)?;
            Ok(Response::Ok)
        }
        s if s == Status::Slices as u8 => {
            let slices: Vec<KeySlice> = deserialize(payload)?;
            Ok(Response::Slices(slices))
        }
        s if s == Status::Fault as u8 => {
            let fault: BackendFault = deserialize(payload)?;
            Ok(Response::Fault(fault))
        }
        s if s == Status::Pong as u8 => {
            expect_empty("PONG response", payload)?;
            Ok(Response::Pong)
        }
        _ => Err(PksError::Protocol(format!(
            "Unknown response status: 0x{:02x}",
            status
        ))),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let message = read_frame(reader)?;
    decode_request(&message)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader)?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Framing helpers
// =============================================================================

/// Build a message: kind (1) + payload_len (4) + payload
fn frame(kind: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(PksError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    Ok(message)
}

/// Validate a message and split it into kind and payload
fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(PksError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = payload_len(&bytes[..HEADER_SIZE])?;
    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(PksError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Read header then payload from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = payload_len(&header)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

fn payload_len(header: &[u8]) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(PksError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

fn deserialize<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(payload)?)
}

fn expect_empty(what: &str, payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(PksError::Protocol(format!(
            "{}: unexpected payload of {} bytes",
            what,
            payload.len()
        )))
    }
}
