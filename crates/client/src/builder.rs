//! Sender-side onion construction

use std::collections::HashMap;

use tracing::debug;

use kronos_core::{NodeId, PublicKey};
use kronos_crypto::build_onion;

use crate::{ClientError, Result};

/// Builds onions from a registry of known node keys
#[derive(Debug, Clone, Default)]
pub struct OnionBuilder {
    keys: HashMap<NodeId, PublicKey>,
}

impl OnionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the layer key for `node`
    pub fn add_node_key(&mut self, node: NodeId, key: PublicKey) {
        self.keys.insert(node, key);
    }

    pub fn knows(&self, node: &NodeId) -> bool {
        self.keys.contains_key(node)
    }

    /// Wrap `message` for `route`, first hop first.
    ///
    /// Fails with `MissingKey` for the first route member without a key,
    /// before any layer is sealed.
    pub fn build(&self, message: &[u8], route: &[NodeId]) -> Result<Vec<u8>> {
        if route.is_empty() {
            return Err(ClientError::EmptyRoute);
        }

        let hops = route
            .iter()
            .map(|node| {
                self.keys
                    .get(node)
                    .map(|key| (node.clone(), *key))
                    .ok_or_else(|| ClientError::MissingKey(node.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let onion = build_onion(message, &hops)?;
        debug!("Built {} byte onion over {} hop(s)", onion.len(), hops.len());
        Ok(onion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kronos_core::RoutingMarker;
    use kronos_crypto::{peel_onion_layer, NodeKeypair};

    fn registry(n: usize) -> (OnionBuilder, Vec<(NodeId, NodeKeypair)>) {
        let mut builder = OnionBuilder::new();
        let nodes: Vec<_> = (1..=n)
            .map(|i| (NodeId::new(format!("node{}", i)), NodeKeypair::generate()))
            .collect();
        for (id, keys) in &nodes {
            builder.add_node_key(id.clone(), keys.public_key_bytes());
        }
        (builder, nodes)
    }

    #[test]
    fn test_build_peels_in_route_order() {
        let (builder, nodes) = registry(3);
        let route: Vec<NodeId> = nodes.iter().map(|(id, _)| id.clone()).collect();

        let mut packet = builder.build(b"hello", &route).unwrap();
        for (i, (_, keys)) in nodes.iter().enumerate() {
            let layer = peel_onion_layer(keys, &packet).unwrap();
            if i + 1 < nodes.len() {
                assert_eq!(layer.marker, RoutingMarker::Next(nodes[i + 1].0.clone()));
            } else {
                assert_eq!(layer.marker, RoutingMarker::Terminal);
                assert_eq!(layer.payload, b"hello");
            }
            packet = layer.payload;
        }
    }

    #[test]
    fn test_missing_key_names_node() {
        let (builder, _) = registry(2);
        let route = vec![NodeId::from("node1"), NodeId::from("node9"), NodeId::from("node2")];

        match builder.build(b"hello", &route) {
            Err(ClientError::MissingKey(node)) => assert_eq!(node, NodeId::from("node9")),
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_route() {
        let (builder, _) = registry(1);
        assert!(matches!(builder.build(b"hello", &[]), Err(ClientError::EmptyRoute)));
    }

    #[test]
    fn test_add_node_key_replaces() {
        let mut builder = OnionBuilder::new();
        let old = NodeKeypair::generate();
        let new = NodeKeypair::generate();
        builder.add_node_key(NodeId::from("node1"), old.public_key_bytes());
        builder.add_node_key(NodeId::from("node1"), new.public_key_bytes());

        let packet = builder.build(b"x", &[NodeId::from("node1")]).unwrap();
        assert!(peel_onion_layer(&old, &packet).is_err());
        assert!(peel_onion_layer(&new, &packet).is_ok());
    }
}
