//! Kronos Core Types
//!
//! This crate defines the data structures shared by every Kronos relay,
//! sender, and store: node identities, onion layer contents, delivered
//! messages, and the JSON bodies of the relay HTTP interface.

mod error;
mod message;
mod onion;
mod types;
mod wire;

pub use error::*;
pub use message::*;
pub use onion::*;
pub use types::*;
pub use wire::*;
