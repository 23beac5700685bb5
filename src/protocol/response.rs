//! Response definitions
//!
//! Represents responses to store clients.

use crate::store::{BackendFault, KeySlice};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Slices = 0x01,
    Fault = 0x02,
    Pong = 0x03,
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Request applied
    Ok,

    /// Rows matched by a range scan
    Slices(Vec<KeySlice>),

    /// Request rejected or failed on the node
    Fault(BackendFault),

    /// Reply to ping
    Pong,
}

impl Response {
    /// Get the status code
    pub fn status(&self) -> Status {
        match self {
            Response::Ok => Status::Ok,
            Response::Slices(_) => Status::Slices,
            Response::Fault(_) => Status::Fault,
            Response::Pong => Status::Pong,
        }
    }

    /// Create a FAULT response for an invalid request
    pub fn invalid(why: impl Into<String>) -> Self {
        Response::Fault(BackendFault::InvalidRequest(why.into()))
    }
}
