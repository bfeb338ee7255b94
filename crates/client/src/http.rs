//! HTTP client for a single relay

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use tracing::debug;

use kronos_core::{
    Author, ConfigRequest, ConfigResponse, CreatePostRequest, CreatePostResponse, DeliveredMessage,
    DeliveredResponse, ErrorEnvelope, ForwardRequest, ListPostsResponse, NodeId, NodeInfoResponse,
    PublicKey, PublicKeyResponse, SentimentSummary,
};
use kronos_crypto::decode_public_key;

use crate::{ClientError, Result};

#[derive(Debug, Clone, Default)]
pub struct RelayClient {
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// `GET {url}/public-key`, decoded
    pub async fn public_key(&self, url: &str) -> Result<(NodeId, PublicKey)> {
        let resp: PublicKeyResponse = read(self.http.get(endpoint(url, "public-key")).send().await?).await?;
        let key = decode_public_key(&resp.key)?;
        debug!("Fetched key for {} from {}", resp.node_id, url);
        Ok((resp.node_id, key))
    }

    /// `POST {url}/config`; `None` clears the next hop
    pub async fn configure(&self, url: &str, next_node_url: Option<&str>) -> Result<ConfigResponse> {
        let body = ConfigRequest {
            next_node_url: next_node_url.map(str::to_string),
        };
        read(self.http.post(endpoint(url, "config")).json(&body).send().await?).await
    }

    /// `POST {url}/forward` with the base64-encoded onion
    pub async fn forward(&self, url: &str, onion: &[u8]) -> Result<DeliveredMessage> {
        let body = ForwardRequest {
            data: BASE64.encode(onion),
        };
        let resp: DeliveredResponse = read(self.http.post(endpoint(url, "forward")).json(&body).send().await?).await?;
        Ok(resp.message)
    }

    pub async fn list_posts(&self, url: &str) -> Result<Vec<DeliveredMessage>> {
        let resp: ListPostsResponse = read(self.http.get(endpoint(url, "posts")).send().await?).await?;
        Ok(resp.messages)
    }

    /// Direct write, bypassing the relay chain
    pub async fn create_post(&self, url: &str, content: &str, author: Option<Author>) -> Result<DeliveredMessage> {
        let body = CreatePostRequest {
            content: content.to_string(),
            is_anonymous: author.is_none(),
            author,
        };
        let resp: CreatePostResponse = read(self.http.post(endpoint(url, "posts")).json(&body).send().await?).await?;
        Ok(resp.post)
    }

    pub async fn info(&self, url: &str) -> Result<NodeInfoResponse> {
        read(self.http.get(url.trim_end_matches('/')).send().await?).await
    }

    pub async fn analyse(&self, url: &str) -> Result<SentimentSummary> {
        read(self.http.get(endpoint(url, "analyse")).send().await?).await
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Decode a success body, or turn an error reply into `ClientError`
async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(|_| ClientError::UnexpectedResponse {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
        Ok(envelope) => Err(ClientError::Relay(envelope)),
        Err(_) => Err(ClientError::UnexpectedResponse {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }),
    }
}
