//! Request definitions
//!
//! Represents requests from store clients.

use crate::rowkey::KeyRange;
use crate::store::{ConsistencyLevel, RowMutation};

/// Request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    SetKeyspace = 0x01,
    BatchMutate = 0x02,
    GetRangeSlices = 0x03,
    Ping = 0x04,
}

/// A parsed request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Select the keyspace for the rest of the session
    SetKeyspace { keyspace: String },

    /// Apply a batch of row mutations
    BatchMutate {
        mutations: Vec<RowMutation>,
        consistency: ConsistencyLevel,
    },

    /// Scan a row-key range of one column family
    GetRangeSlices {
        column_family: String,
        columns: Vec<Vec<u8>>,
        range: KeyRange,
        consistency: ConsistencyLevel,
    },

    /// Ping (health check)
    Ping,
}

impl Request {
    /// Get the request kind
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::SetKeyspace { .. } => RequestKind::SetKeyspace,
            Request::BatchMutate { .. } => RequestKind::BatchMutate,
            Request::GetRangeSlices { .. } => RequestKind::GetRangeSlices,
            Request::Ping => RequestKind::Ping,
        }
    }
}
