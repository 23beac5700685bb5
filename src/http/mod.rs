//! HTTP Module
//!
//! The HKP-style front end: form parsing, routing onto [`PksHandler`]
//! operations, and the connection loop.
//!
//! [`PksHandler`]: crate::pks::PksHandler

mod form;
mod router;
mod server;

pub use form::FormValues;
pub use router::{handle_request, operation, MAX_FORM_BODY, PKS_PREFIX};
pub use server::serve;
