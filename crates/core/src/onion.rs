//! Onion layer types
//!
//! Each layer of an onion packet decrypts to an [`OnionLayer`]: a routing
//! marker telling the peeling relay what to do next, plus the still-sealed
//! remainder (or the plaintext, at the terminal hop). The route itself is
//! never carried in the clear.

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Routing decision revealed by peeling one layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMarker {
    /// Forward the payload to the node with this id
    Next(NodeId),
    /// This hop is the last one; the payload is the plaintext
    Terminal,
}

impl RoutingMarker {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoutingMarker::Terminal)
    }
}

/// Decrypted onion layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnionLayer {
    pub marker: RoutingMarker,
    /// Sealed layer for the next hop, or the plaintext when `marker` is terminal
    pub payload: Vec<u8>,
}

impl OnionLayer {
    pub fn new(marker: RoutingMarker, payload: Vec<u8>) -> Self {
        Self { marker, payload }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
