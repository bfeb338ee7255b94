//! Kronos Delivery Store
//!
//! Append-only log of delivered messages, one JSON document per line.
//!
//! ## Write discipline
//!
//! A single writer task owns the file handle and the id generator. Every
//! [`DeliveryStore::append`] call, whether it comes from terminal delivery or
//! from the direct-write path, is queued to that task, so concurrent writers
//! never interleave or lose entries.
//!
//! ## Tolerant reads
//!
//! [`DeliveryStore::list`] parses every line independently and drops lines
//! that fail to parse, so one corrupt entry never fails the listing.

mod ids;
mod log;

pub use ids::IdGenerator;
pub use log::{parse_log, DeliveryStore, DEFAULT_QUEUE_CAPACITY};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store writer has shut down")]
    WriterClosed,
}

pub type Result<T> = std::result::Result<T, StoreError>;
