#![allow(dead_code)] // Each test binary uses a different subset

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use kronos_client::CircuitHop;
use kronos_core::NodeId;
use kronos_crypto::NodeKeypair;
use kronos_relay::{router, serve, AppState, Broadcaster, HttpNextHop, LexiconScorer, RelayNode};
use kronos_store::DeliveryStore;

pub struct TestRelay {
    pub id: NodeId,
    pub url: String,
    pub ws_url: String,
    pub node: Arc<RelayNode>,
}

impl TestRelay {
    pub fn hop(&self) -> CircuitHop {
        CircuitHop::new(self.id.clone(), self.url.clone())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

/// Start one relay on an ephemeral localhost port
pub async fn spawn_relay(id: &str, dir: &Path) -> TestRelay {
    let store = DeliveryStore::open(dir.join(format!("{}.jsonl", id))).await.unwrap();
    let hop = HttpNextHop::new(Duration::from_secs(5)).unwrap();
    let node = Arc::new(RelayNode::new(
        NodeId::from(id),
        Arc::new(NodeKeypair::generate()),
        Arc::new(hop),
        store,
        Broadcaster::default(),
    ));

    let app = router(AppState::new(node.clone(), Arc::new(LexiconScorer)), &[]);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, app));

    TestRelay {
        id: NodeId::from(id),
        url: format!("http://{}", addr),
        ws_url: format!("ws://{}/ws", addr),
        node,
    }
}

/// Start `n` relays named node1..nodeN
pub async fn spawn_relays(n: usize, dir: &Path) -> Vec<TestRelay> {
    let mut relays = Vec::with_capacity(n);
    for i in 1..=n {
        relays.push(spawn_relay(&format!("node{}", i), dir).await);
    }
    relays
}

pub fn hops(relays: &[TestRelay]) -> Vec<CircuitHop> {
    relays.iter().map(TestRelay::hop).collect()
}
