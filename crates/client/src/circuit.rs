//! Circuit setup: key fetch plus next-hop chaining

use tracing::{debug, info, warn};

use kronos_core::{DeliveredMessage, NodeId};

use crate::builder::OnionBuilder;
use crate::http::RelayClient;
use crate::{ClientError, Result};

/// One hop of a circuit: the id the route uses and where the relay listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitHop {
    pub id: NodeId,
    pub url: String,
}

impl CircuitHop {
    pub fn new(id: impl Into<NodeId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// An ordered chain of relays with keys fetched and next hops configured
#[derive(Debug, Clone)]
pub struct Circuit {
    client: RelayClient,
    hops: Vec<CircuitHop>,
    builder: OnionBuilder,
}

impl Circuit {
    /// Fetch each hop's key, then point every hop at its successor.
    ///
    /// The last hop's next-hop pointer is cleared.
    pub async fn establish(client: RelayClient, hops: Vec<CircuitHop>) -> Result<Self> {
        if hops.is_empty() {
            return Err(ClientError::EmptyRoute);
        }

        let mut builder = OnionBuilder::new();
        for hop in &hops {
            let (reported, key) = client.public_key(&hop.url).await?;
            if reported != hop.id {
                warn!("{} reports id {} but route calls it {}", hop.url, reported, hop.id);
            }
            builder.add_node_key(hop.id.clone(), key);
        }

        for (i, hop) in hops.iter().enumerate() {
            let next = hops.get(i + 1).map(|h| h.url.as_str());
            client.configure(&hop.url, next).await?;
            debug!("Configured {} -> {:?}", hop.id, next);
        }

        info!("Circuit established over {} hop(s)", hops.len());
        Ok(Self { client, hops, builder })
    }

    pub fn hops(&self) -> &[CircuitHop] {
        &self.hops
    }

    pub fn builder(&self) -> &OnionBuilder {
        &self.builder
    }

    /// Wrap `message` for the circuit and hand it to the first hop
    pub async fn send(&self, message: &[u8]) -> Result<DeliveredMessage> {
        let route: Vec<NodeId> = self.hops.iter().map(|h| h.id.clone()).collect();
        let onion = self.builder.build(message, &route)?;
        self.client.forward(&self.hops[0].url, &onion).await
    }
}
