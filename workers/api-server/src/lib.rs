//! The HTTP server fronting the matcher node
//!
//! Handlers are thin: they parse and validate wire types, forward work onto
//! the owning worker's job queue, and read the shared stores. No handler
//! writes the book or a match record directly

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod error;
mod http;
mod router;
pub mod worker;

pub use error::ApiServerError;
pub use worker::{ApiServer, ApiServerConfig};
