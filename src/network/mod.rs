//! Network Module
//!
//! TCP server and client handling for the store node.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections (crossbeam channel)
//! - Requests routed through Engine

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
