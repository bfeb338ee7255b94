//! Kronos Client
//!
//! Sender side of the relay network:
//!
//! - [`OnionBuilder`] wraps a message in one sealed layer per hop
//! - [`RelayClient`] talks to a single relay's HTTP interface
//! - [`Circuit`] fetches every hop's key, chains the next-hop pointers and
//!   sends onions through the first hop

mod builder;
mod circuit;
mod http;

pub use builder::OnionBuilder;
pub use circuit::{Circuit, CircuitHop};
pub use http::RelayClient;

use thiserror::Error;

use kronos_core::{ErrorEnvelope, NodeId};
use kronos_crypto::{KeyError, OnionError};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No key known for node {0}")]
    MissingKey(NodeId),

    #[error("Route is empty")]
    EmptyRoute,

    #[error("Onion error: {0}")]
    Onion(#[from] OnionError),

    #[error("Invalid key from relay: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A relay answered with an error envelope
    #[error("Relay {} reported {:?}: {}", .0.error.node, .0.error.kind, .0.error.message)]
    Relay(ErrorEnvelope),

    #[error("Unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;
