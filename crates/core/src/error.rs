use serde::{Deserialize, Serialize};

/// Failure classes of the forwarding chain, as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A relay could not peel its layer
    DecodeFailure,
    /// Non-terminal relay with no next hop configured
    NoRoute,
    /// The next hop could not be reached or timed out
    DownstreamFailure,
    /// The terminal relay could not persist the message
    StoreFailure,
    /// Malformed request body
    InvalidRequest,
}

impl ErrorKind {
    /// HTTP status a relay answers with for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::DecodeFailure | ErrorKind::InvalidRequest => 400,
            ErrorKind::NoRoute | ErrorKind::StoreFailure => 500,
            ErrorKind::DownstreamFailure => 502,
        }
    }

    /// Wire name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DecodeFailure => "decode_failure",
            ErrorKind::NoRoute => "no_route",
            ErrorKind::DownstreamFailure => "downstream_failure",
            ErrorKind::StoreFailure => "store_failure",
            ErrorKind::InvalidRequest => "invalid_request",
        }
    }
}
