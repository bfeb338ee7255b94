//! JSON bodies of the relay HTTP interface
//!
//! Shared between the relay server and the sender-side client so both ends
//! agree on field names.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::message::{Author, DeliveredMessage};
use crate::types::NodeId;

/// `GET /public-key`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub node_id: NodeId,
    /// Base64 X25519 public key
    pub key: String,
}

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfoResponse {
    pub node_id: NodeId,
    pub next_node: Option<String>,
    pub subscribers: usize,
}

/// `POST /config`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRequest {
    #[serde(default)]
    pub next_node_url: Option<String>,
}

/// Reply to `POST /config`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub status: String,
    pub next_node: Option<String>,
}

/// `POST /forward`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// Base64 onion packet
    pub data: String,
}

/// Successful terminal reply to `POST /forward`, relayed back up the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredResponse {
    pub status: String,
    pub message: DeliveredMessage,
}

/// `POST /posts`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Reply to `POST /posts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub post: DeliveredMessage,
}

/// `GET /posts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPostsResponse {
    pub messages: Vec<DeliveredMessage>,
}

/// `GET /analyse`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummary {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub total_posts: usize,
}

/// Error body returned by every relay endpoint
///
/// `node` names the hop that produced the error. Intermediate hops relay a
/// downstream envelope unchanged, so the caller always sees the failing hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub node: NodeId,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, node: NodeId, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                kind,
                node,
                message: message.into(),
            },
        }
    }
}
