//! Kronos CLI
//!
//! Runs a relay node and drives relays from the sender side.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kronos_client::{Circuit, CircuitHop, RelayClient};
use kronos_core::{Author, NodeId};
use kronos_crypto::{hash, NodeKeypair};
use kronos_relay::{
    router, serve, AppState, Broadcaster, HttpNextHop, HttpSentimentScorer, LexiconScorer,
    RelayNode, SentimentScorer,
};
use kronos_settings::{default_settings_path, Settings};
use kronos_store::DeliveryStore;

/// Kronos - layered-forwarding message relay
#[derive(Parser)]
#[command(name = "kronos")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a relay node
    Node(NodeArgs),

    /// Set up a circuit and send one message through it
    Send {
        /// Route hop as `id=url`, first hop first (repeatable)
        #[arg(long = "hop", required = true)]
        hops: Vec<String>,

        /// Message text
        message: String,
    },

    /// Write a message straight into a relay's store
    Post {
        /// Relay base URL
        #[arg(long, default_value = "http://localhost:3000")]
        node: String,

        /// Author name
        #[arg(long)]
        author: Option<String>,

        /// Post without an author even if one is given
        #[arg(long)]
        anonymous: bool,

        /// Message text
        content: String,
    },

    /// Print a relay's delivered messages
    List {
        #[arg(long, default_value = "http://localhost:3000")]
        node: String,
    },

    /// Print a relay's id and next hop
    Info {
        #[arg(long, default_value = "http://localhost:3000")]
        node: String,
    },
}

#[derive(clap::Args)]
struct NodeArgs {
    /// Settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node id
    #[arg(long)]
    id: Option<String>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Delivery store path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Initial next hop URL
    #[arg(long)]
    next_hop: Option<String>,

    /// Per-hop forward timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// External sentiment classifier URL
    #[arg(long)]
    sentiment_endpoint: Option<String>,
}

impl NodeArgs {
    fn into_settings(self) -> Result<Settings> {
        let path = self.config.unwrap_or_else(default_settings_path);
        let mut settings = Settings::load_from(&path)
            .with_context(|| format!("Failed to load settings from {:?}", path))?;

        if let Some(id) = self.id {
            settings.node.id = id;
        }
        if let Some(listen) = self.listen {
            settings.node.listen_addr = listen;
        }
        if let Some(store) = self.store {
            settings.store.path = store;
        }
        if self.next_hop.is_some() {
            settings.node.next_hop = self.next_hop;
        }
        if let Some(timeout) = self.timeout {
            settings.node.forward_timeout_secs = timeout;
        }
        if self.sentiment_endpoint.is_some() {
            settings.sentiment.endpoint = self.sentiment_endpoint;
        }
        Ok(settings)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info,kronos=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Node(args) => {
            run_node(args.into_settings()?).await?;
        }
        Commands::Send { hops, message } => {
            send(&hops, &message).await?;
        }
        Commands::Post {
            node,
            author,
            anonymous,
            content,
        } => {
            post(&node, &content, author, anonymous).await?;
        }
        Commands::List { node } => {
            list(&node).await?;
        }
        Commands::Info { node } => {
            node_info(&node).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Relay node
// ============================================================================

async fn run_node(settings: Settings) -> Result<()> {
    let keys = NodeKeypair::generate();
    let fingerprint = hex::encode(&hash(&keys.public_key_bytes())[..8]);
    info!("Starting relay {} (key {})", settings.node.id, fingerprint);

    let store = DeliveryStore::open_with_capacity(&settings.store.path, settings.store.queue_capacity)
        .await
        .with_context(|| format!("Failed to open store {:?}", settings.store.path))?;

    let hop = HttpNextHop::new(settings.node.forward_timeout())?;
    let node = RelayNode::new(
        NodeId::new(settings.node.id.clone()),
        Arc::new(keys),
        Arc::new(hop),
        store,
        Broadcaster::new(settings.node.subscriber_capacity),
    )
    .with_next_hop(settings.node.next_hop.clone());

    let scorer: Arc<dyn SentimentScorer> = match &settings.sentiment.endpoint {
        Some(endpoint) => {
            info!("Scoring sentiment via {}", endpoint);
            Arc::new(HttpSentimentScorer::new(endpoint.clone(), settings.node.forward_timeout())?)
        }
        None => Arc::new(LexiconScorer),
    };

    let app = router(AppState::new(Arc::new(node), scorer), &settings.server.cors_origins);
    let listener = TcpListener::bind(&settings.node.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.node.listen_addr))?;

    info!("Relay running. Press Ctrl+C to stop.");
    tokio::select! {
        result = serve(listener, app) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down relay {}", settings.node.id),
    }

    Ok(())
}

// ============================================================================
// Sender commands
// ============================================================================

fn parse_hop(spec: &str) -> Result<CircuitHop> {
    match spec.split_once('=') {
        Some((id, url)) if !id.is_empty() && !url.is_empty() => Ok(CircuitHop::new(id, url)),
        _ => bail!("Invalid hop {:?}, expected id=url", spec),
    }
}

async fn send(hops: &[String], message: &str) -> Result<()> {
    let hops = hops.iter().map(|h| parse_hop(h)).collect::<Result<Vec<_>>>()?;
    info!("Sending through {} hop(s)", hops.len());

    let circuit = Circuit::establish(RelayClient::new(), hops).await?;
    let delivered = circuit.send(message.as_bytes()).await?;

    println!("Delivered message {}", delivered.id);
    println!("{}", serde_json::to_string_pretty(&delivered)?);
    Ok(())
}

async fn post(node: &str, content: &str, author: Option<String>, anonymous: bool) -> Result<()> {
    let author = match (author, anonymous) {
        (Some(_), true) => {
            warn!("--anonymous given, dropping author");
            None
        }
        (author, _) => author.map(Author::named),
    };

    let post = RelayClient::new().create_post(node, content, author).await?;
    println!("Created message {}", post.id);
    Ok(())
}

async fn list(node: &str) -> Result<()> {
    let messages = RelayClient::new().list_posts(node).await?;
    if messages.is_empty() {
        println!("No messages");
        return Ok(());
    }

    for message in messages {
        let who = message
            .author
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("anonymous");
        println!("[{}] {} {}: {}", message.id, message.timestamp.to_rfc3339(), who, message.content);
    }
    Ok(())
}

async fn node_info(node: &str) -> Result<()> {
    let info = RelayClient::new().info(node).await?;
    println!("Node:        {}", info.node_id);
    println!("Next hop:    {}", info.next_node.as_deref().unwrap_or("(none)"));
    println!("Subscribers: {}", info.subscribers);
    Ok(())
}
