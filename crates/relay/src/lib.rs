//! Kronos Relay
//!
//! Relay node logic: peel one sealed layer per hop, forward the remainder to
//! the configured next hop, or, at the terminal hop, persist the plaintext
//! and fan it out to live subscribers.
//!
//! ## HTTP interface
//!
//! - `GET /` - node id, next hop, subscriber count
//! - `GET /public-key` - node id and base64 layer public key
//! - `POST /config` - replace the next-hop pointer
//! - `POST /forward` - peel and forward/deliver an onion packet
//! - `GET /posts`, `POST /posts` - list the delivery store, direct write
//! - `GET /ws` - WebSocket stream of delivered messages
//! - `GET /analyse` - sentiment aggregate over the delivery store

mod fanout;
mod hop;
mod node;
mod sentiment;
mod server;

pub use fanout::{Broadcaster, DEFAULT_SUBSCRIBER_CAPACITY};
pub use hop::{HopError, HopResponse, HttpNextHop, NextHop, DEFAULT_FORWARD_TIMEOUT};
pub use node::{ForwardOutcome, RelayNode};
pub use sentiment::{
    aggregate_sentiment, HttpSentimentScorer, LexiconScorer, Sentiment, SentimentError,
    SentimentScorer,
};
pub use server::{router, serve, AppState};

use thiserror::Error;

use kronos_core::ErrorKind;
use kronos_store::StoreError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("No next hop configured")]
    NoRoute,

    #[error("Downstream failure: {0}")]
    Downstream(#[from] HopError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::DecodeFailure(_) => ErrorKind::DecodeFailure,
            RelayError::NoRoute => ErrorKind::NoRoute,
            RelayError::Downstream(_) => ErrorKind::DownstreamFailure,
            RelayError::Store(_) => ErrorKind::StoreFailure,
            RelayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
