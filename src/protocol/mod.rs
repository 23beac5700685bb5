//! Protocol Module
//!
//! Wire protocol between the key server and a store node.
//!
//! ## Protocol Format (V1 - Framed bincode)
//!
//! ### Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Kind (1) │ Len (4)  │     Payload (bincode)       │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Requests
//! - 0x01: SET_KEYSPACE     - Payload: keyspace
//! - 0x02: BATCH_MUTATE     - Payload: (mutations, consistency)
//! - 0x03: GET_RANGE_SLICES - Payload: (family, columns, range, consistency)
//! - 0x04: PING             - Payload: empty
//!
//! ### Responses
//! - 0x00: OK     - Payload: empty
//! - 0x01: SLICES - Payload: key slices
//! - 0x02: FAULT  - Payload: backend fault
//! - 0x03: PONG   - Payload: empty

mod request;
mod response;
mod codec;

pub use request::{Request, RequestKind};
pub use response::{Response, Status};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
