//! Transport to the next hop

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

use kronos_core::ForwardRequest;

/// Default per-hop request timeout
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum HopError {
    #[error("Next hop {0} timed out")]
    Timeout(String),

    #[error("Next hop {url} unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Next hop {url} answered {status} with a non-JSON body")]
    InvalidReply { url: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),
}

/// Raw reply of the next hop, relayed to our caller unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HopResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body is a JSON document (relay replies always are)
    pub fn is_json(&self) -> bool {
        serde_json::from_slice::<serde::de::IgnoredAny>(&self.body).is_ok()
    }
}

/// Hands a packet to the next relay and waits for its reply.
///
/// Any HTTP reply, success or error, is returned as `Ok`; only failing to
/// obtain a reply at all is an `Err`.
#[async_trait]
pub trait NextHop: Send + Sync {
    async fn forward(&self, next_url: &str, packet: &[u8]) -> Result<HopResponse, HopError>;
}

/// `POST {next_url}/forward` with a base64 body
#[derive(Debug, Clone)]
pub struct HttpNextHop {
    client: reqwest::Client,
}

impl HttpNextHop {
    pub fn new(timeout: Duration) -> Result<Self, HopError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HopError::ClientInit)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NextHop for HttpNextHop {
    async fn forward(&self, next_url: &str, packet: &[u8]) -> Result<HopResponse, HopError> {
        let url = format!("{}/forward", next_url.trim_end_matches('/'));
        let body = ForwardRequest {
            data: BASE64.encode(packet),
        };

        let to_hop_error = |source: reqwest::Error| {
            if source.is_timeout() {
                HopError::Timeout(next_url.to_string())
            } else {
                HopError::Unreachable {
                    url: next_url.to_string(),
                    source,
                }
            }
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(to_hop_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(to_hop_error)?.to_vec();

        Ok(HopResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_response_success_range() {
        let ok = HopResponse { status: 200, body: vec![] };
        let err = HopResponse { status: 500, body: vec![] };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }

    #[test]
    fn test_hop_response_is_json() {
        let envelope = HopResponse { status: 500, body: br#"{"error":{}}"#.to_vec() };
        let empty = HopResponse { status: 404, body: vec![] };
        let html = HopResponse { status: 404, body: b"<h1>Not Found</h1>".to_vec() };
        assert!(envelope.is_json());
        assert!(!empty.is_json());
        assert!(!html.is_json());
    }

    #[tokio::test]
    async fn test_unreachable_hop_is_error() {
        // Bind then drop so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let hop = HttpNextHop::new(Duration::from_secs(2)).unwrap();
        let result = hop.forward(&format!("http://{}", addr), b"packet").await;
        assert!(matches!(result, Err(HopError::Unreachable { .. }) | Err(HopError::Timeout(_))));
    }

    #[test]
    fn test_hop_error_display() {
        let err = HopError::Timeout("http://localhost:3002".to_string());
        assert_eq!(err.to_string(), "Next hop http://localhost:3002 timed out");
    }
}
