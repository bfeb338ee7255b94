//! Relay node forwarding state machine
//!
//! Each `forward` call is one run of `Idle -> PeelLayer -> {Forward | Deliver}
//! -> Idle`; nothing survives between calls except the next-hop pointer.
//! A node learns only its own routing marker: the id of the next hop, or
//! that it is terminal.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use kronos_core::{DeliveredMessage, DeliveredResponse, NewMessage, NodeId, RoutingMarker};
use kronos_crypto::{encode_public_key, LayerPeeler};
use kronos_store::{DeliveryStore, StoreError};

use crate::fanout::Broadcaster;
use crate::hop::{HopError, HopResponse, NextHop};
use crate::{RelayError, Result};

/// Result of a successful state machine run
#[derive(Debug, Clone)]
pub enum ForwardOutcome {
    /// This node was terminal; the message is stored and fanned out
    Delivered(DeliveredMessage),
    /// The next hop replied; its reply is passed back unchanged
    Relayed(HopResponse),
}

pub struct RelayNode {
    id: NodeId,
    peeler: Arc<dyn LayerPeeler>,
    next_hop: RwLock<Option<String>>,
    hop: Arc<dyn NextHop>,
    store: DeliveryStore,
    fanout: Broadcaster,
}

impl RelayNode {
    pub fn new(
        id: NodeId,
        peeler: Arc<dyn LayerPeeler>,
        hop: Arc<dyn NextHop>,
        store: DeliveryStore,
        fanout: Broadcaster,
    ) -> Self {
        Self {
            id,
            peeler,
            next_hop: RwLock::new(None),
            hop,
            store,
            fanout,
        }
    }

    pub fn with_next_hop(self, next_hop: Option<String>) -> Self {
        self.set_next_hop(next_hop);
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Base64 public key clients seal this node's layers to
    pub fn public_key_base64(&self) -> String {
        encode_public_key(&self.peeler.public_key())
    }

    pub fn next_hop(&self) -> Option<String> {
        self.next_hop.read().clone()
    }

    /// Replace the next-hop pointer (last writer wins).
    ///
    /// Blank addresses clear the pointer. Returns the stored value.
    pub fn set_next_hop(&self, next_hop: Option<String>) -> Option<String> {
        let next_hop = next_hop
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        info!("[{}] Next hop set to {:?}", self.id, next_hop);
        *self.next_hop.write() = next_hop.clone();
        next_hop
    }

    pub fn store(&self) -> &DeliveryStore {
        &self.store
    }

    pub fn fanout(&self) -> &Broadcaster {
        &self.fanout
    }

    /// Peel one layer and either deliver or forward the remainder
    pub async fn forward(&self, packet: &[u8]) -> Result<ForwardOutcome> {
        debug!("[{}] PeelLayer: {} byte packet", self.id, packet.len());

        let layer = self.peeler.peel(packet).map_err(|e| {
            warn!("[{}] Failed to peel layer: {}", self.id, e);
            RelayError::DecodeFailure(e.to_string())
        })?;

        match layer.marker {
            RoutingMarker::Terminal => self.deliver(layer.payload).await.map(ForwardOutcome::Delivered),
            RoutingMarker::Next(next) => self.relay(&next, &layer.payload).await.map(ForwardOutcome::Relayed),
        }
    }

    async fn deliver(&self, plaintext: Vec<u8>) -> Result<DeliveredMessage> {
        info!("[{}] Final destination reached", self.id);

        let text = String::from_utf8(plaintext).map_err(|_| {
            warn!("[{}] Terminal payload is not valid UTF-8", self.id);
            RelayError::DecodeFailure("terminal payload is not valid UTF-8".to_string())
        })?;

        let message = self.store.append(NewMessage::from_plaintext(&text)).await?;
        self.fanout.publish(&message);
        Ok(message)
    }

    async fn relay(&self, next: &NodeId, remainder: &[u8]) -> Result<HopResponse> {
        let Some(url) = self.next_hop() else {
            warn!("[{}] Marker names {} but no next hop is configured", self.id, next);
            return Err(RelayError::NoRoute);
        };

        info!("[{}] Forwarding to {} at {}", self.id, next, url);
        let reply = self.hop.forward(&url, remainder).await.map_err(|e| {
            warn!("[{}] Next hop failed: {}", self.id, e);
            RelayError::Downstream(e)
        })?;

        if !reply.is_json() {
            warn!("[{}] Next hop {} answered {} with a non-JSON body", self.id, url, reply.status);
            return Err(RelayError::Downstream(HopError::InvalidReply {
                url,
                status: reply.status,
            }));
        }
        if !reply.is_success() {
            debug!("[{}] Relaying downstream status {}", self.id, reply.status);
        }
        Ok(reply)
    }

    /// Run `forward` and render the outcome as the JSON reply our caller gets
    pub async fn forward_reply(&self, packet: &[u8]) -> HopResponse {
        match self.forward(packet).await {
            Ok(ForwardOutcome::Delivered(message)) => {
                let id = message.id;
                let body = DeliveredResponse {
                    status: "delivered".to_string(),
                    message,
                };
                match serde_json::to_vec(&body) {
                    Ok(body) => HopResponse { status: 200, body },
                    Err(e) => {
                        error!("[{}] Failed to encode reply for message {}: {}", self.id, id, e);
                        self.error_reply(&RelayError::Store(StoreError::Serialize(e)))
                    }
                }
            }
            Ok(ForwardOutcome::Relayed(reply)) => reply,
            Err(e) => self.error_reply(&e),
        }
    }

    /// Error envelope attributed to this node
    pub fn error_reply(&self, err: &RelayError) -> HopResponse {
        let kind = err.kind();
        let envelope = serde_json::json!({
            "error": {
                "kind": kind.as_str(),
                "node": self.id.as_str(),
                "message": err.to_string(),
            }
        });
        HopResponse {
            status: kind.http_status(),
            body: envelope.to_string().into_bytes(),
        }
    }
}
