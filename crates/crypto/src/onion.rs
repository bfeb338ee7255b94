//! Onion packet construction and peeling
//!
//! A packet for route `[n1, .., nk]` is built inside-out: the innermost layer
//! holds the plaintext behind a terminal marker and is sealed for `nk`; every
//! outer layer holds the next node's id and the sealed inner packet, sealed
//! for its own node. Peeling once with a node's keypair opens exactly one
//! layer.

use thiserror::Error;

use kronos_core::{NodeId, OnionLayer, PublicKey, RoutingMarker};

use crate::encrypt::{open_sealed, seal_for_node, EncryptError};
use crate::keys::NodeKeypair;

#[derive(Error, Debug)]
pub enum OnionError {
    #[error("Route is empty")]
    EmptyRoute,
    #[error("Layer encryption failed: {0}")]
    Seal(#[source] EncryptError),
    #[error("Layer could not be opened: {0}")]
    Open(#[source] EncryptError),
    #[error("Malformed layer: {0}")]
    Malformed(String),
}

/// Capability to open the onion layer addressed to one node
///
/// The forwarding state machine depends only on this trait, so the layer
/// scheme can change without touching it.
pub trait LayerPeeler: Send + Sync {
    /// Public half of the key material layers are sealed to
    fn public_key(&self) -> PublicKey;

    /// Open one layer, exposing its marker and the remainder
    fn peel(&self, packet: &[u8]) -> Result<OnionLayer, OnionError>;
}

impl LayerPeeler for NodeKeypair {
    fn public_key(&self) -> PublicKey {
        self.public_key_bytes()
    }

    fn peel(&self, packet: &[u8]) -> Result<OnionLayer, OnionError> {
        peel_onion_layer(self, packet)
    }
}

/// Build an onion packet carrying `plaintext` along `route`.
///
/// `route` lists each hop's id and layer public key, first hop first.
pub fn build_onion(plaintext: &[u8], route: &[(NodeId, PublicKey)]) -> Result<Vec<u8>, OnionError> {
    let Some(last) = route.len().checked_sub(1) else {
        return Err(OnionError::EmptyRoute);
    };

    let mut current = plaintext.to_vec();
    for i in (0..=last).rev() {
        let marker = if i == last {
            RoutingMarker::Terminal
        } else {
            RoutingMarker::Next(route[i + 1].0.clone())
        };

        let layer_bytes = OnionLayer::new(marker, current)
            .to_bytes()
            .map_err(|e| OnionError::Malformed(e.to_string()))?;

        current = seal_for_node(&route[i].1, &layer_bytes).map_err(OnionError::Seal)?;
    }

    Ok(current)
}

/// Peel one onion layer with this node's keypair
pub fn peel_onion_layer(keypair: &NodeKeypair, packet: &[u8]) -> Result<OnionLayer, OnionError> {
    let opened = open_sealed(keypair, packet).map_err(OnionError::Open)?;
    OnionLayer::from_bytes(&opened).map_err(|e| OnionError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_route(n: usize) -> (Vec<NodeKeypair>, Vec<(NodeId, PublicKey)>) {
        let keys: Vec<NodeKeypair> = (0..n).map(|_| NodeKeypair::generate()).collect();
        let route = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (NodeId::new(format!("node{}", i + 1)), k.public_key_bytes()))
            .collect();
        (keys, route)
    }

    /// Peel in hop order; returns the plaintext and the number of peels it took
    fn peel_all(keys: &[NodeKeypair], packet: Vec<u8>) -> (Vec<u8>, usize) {
        let mut current = packet;
        for (i, key) in keys.iter().enumerate() {
            let layer = key.peel(&current).unwrap();
            match layer.marker {
                RoutingMarker::Terminal => return (layer.payload, i + 1),
                RoutingMarker::Next(next) => {
                    assert_eq!(next, NodeId::new(format!("node{}", i + 2)));
                    current = layer.payload;
                }
            }
        }
        panic!("terminal marker never observed");
    }

    #[test]
    fn test_onion_1_hop() {
        let (keys, route) = make_route(1);
        let packet = build_onion(b"hello", &route).unwrap();

        let layer = keys[0].peel(&packet).unwrap();
        assert!(layer.marker.is_terminal());
        assert_eq!(layer.payload, b"hello");
    }

    #[test]
    fn test_onion_3_hops() {
        let (keys, route) = make_route(3);
        let packet = build_onion(b"hello", &route).unwrap();

        let l1 = keys[0].peel(&packet).unwrap();
        assert_eq!(l1.marker, RoutingMarker::Next(NodeId::from("node2")));

        let l2 = keys[1].peel(&l1.payload).unwrap();
        assert_eq!(l2.marker, RoutingMarker::Next(NodeId::from("node3")));

        let l3 = keys[2].peel(&l2.payload).unwrap();
        assert!(l3.marker.is_terminal());
        assert_eq!(l3.payload, b"hello");
    }

    #[test]
    fn test_empty_route_rejected() {
        assert!(matches!(build_onion(b"x", &[]), Err(OnionError::EmptyRoute)));
    }

    #[test]
    fn test_wrong_key_cannot_peel() {
        let (_keys, route) = make_route(2);
        let packet = build_onion(b"hello", &route).unwrap();

        let wrong = NodeKeypair::generate();
        assert!(matches!(wrong.peel(&packet), Err(OnionError::Open(_))));
    }

    #[test]
    fn test_second_hop_cannot_peel_first_layer() {
        let (keys, route) = make_route(3);
        let packet = build_onion(b"hello", &route).unwrap();

        assert!(keys[1].peel(&packet).is_err());
        assert!(keys[2].peel(&packet).is_err());
    }

    #[test]
    fn test_garbage_packet_fails() {
        let key = NodeKeypair::generate();
        assert!(key.peel(&[7u8; 10]).is_err());
        assert!(key.peel(&[7u8; 200]).is_err());
    }

    #[test]
    fn test_peeler_exposes_public_key() {
        let key = NodeKeypair::generate();
        assert_eq!(LayerPeeler::public_key(&key), key.public_key_bytes());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_peeling_in_order_recovers_plaintext(
            hops in 1usize..6,
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let (keys, route) = make_route(hops);
            let packet = build_onion(&plaintext, &route).unwrap();

            let (recovered, peels) = peel_all(&keys, packet);
            prop_assert_eq!(recovered, plaintext);
            prop_assert_eq!(peels, hops);
        }

        #[test]
        fn prop_foreign_key_never_yields_marker(
            hops in 1usize..4,
            plaintext in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let (_keys, route) = make_route(hops);
            let packet = build_onion(&plaintext, &route).unwrap();

            let outsider = NodeKeypair::generate();
            prop_assert!(outsider.peel(&packet).is_err());
        }
    }
}
