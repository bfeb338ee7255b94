//! HTTP surface of a relay node

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use kronos_core::{
    ConfigRequest, ConfigResponse, CreatePostRequest, CreatePostResponse, ForwardRequest,
    ListPostsResponse, NewMessage, NodeInfoResponse, PublicKeyResponse, SentimentSummary,
};

use crate::node::RelayNode;
use crate::sentiment::{aggregate_sentiment, SentimentScorer};
use crate::RelayError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<RelayNode>,
    pub scorer: Arc<dyn SentimentScorer>,
}

impl AppState {
    pub fn new(node: Arc<RelayNode>, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self { node, scorer }
    }

    fn error(&self, error: RelayError) -> ApiError {
        ApiError {
            node: self.node.clone(),
            error,
        }
    }
}

/// A handler failure rendered as this node's error envelope
struct ApiError {
    node: Arc<RelayNode>,
    error: RelayError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let reply = self.node.error_reply(&self.error);
        raw_json(reply.status, reply.body)
    }
}

fn raw_json(status: u16, body: Vec<u8>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Build the node's router.
///
/// `cors_origins` lists allowed browser origins; `"*"` allows any.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(node_info))
        .route("/public-key", get(public_key))
        .route("/config", post(configure))
        .route("/forward", post(forward))
        .route("/posts", get(list_posts).post(create_post))
        .route("/ws", get(subscribe))
        .route("/analyse", get(analyse))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Serve `router` on an already bound listener until the task is dropped
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Relay listening on {}", addr);
    }
    axum::serve(listener, router).await
}

async fn node_info(State(state): State<AppState>) -> Json<NodeInfoResponse> {
    Json(NodeInfoResponse {
        node_id: state.node.id().clone(),
        next_node: state.node.next_hop(),
        subscribers: state.node.fanout().subscriber_count(),
    })
}

async fn public_key(State(state): State<AppState>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        node_id: state.node.id().clone(),
        key: state.node.public_key_base64(),
    })
}

async fn configure(
    State(state): State<AppState>,
    body: Result<Json<ConfigRequest>, JsonRejection>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let Json(request) = body.map_err(|e| state.error(RelayError::InvalidRequest(e.body_text())))?;
    let next_node = state.node.set_next_hop(request.next_node_url);
    Ok(Json(ConfigResponse {
        status: "configured".to_string(),
        next_node,
    }))
}

async fn forward(
    State(state): State<AppState>,
    body: Result<Json<ForwardRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| state.error(RelayError::InvalidRequest(e.body_text())))?;
    let packet = BASE64
        .decode(request.data.trim())
        .map_err(|e| state.error(RelayError::DecodeFailure(format!("invalid base64: {}", e))))?;

    let reply = state.node.forward_reply(&packet).await;
    Ok(raw_json(reply.status, reply.body))
}

async fn list_posts(State(state): State<AppState>) -> Result<Json<ListPostsResponse>, ApiError> {
    let messages = state
        .node
        .store()
        .list()
        .await
        .map_err(|e| state.error(e.into()))?;
    Ok(Json(ListPostsResponse { messages }))
}

async fn create_post(
    State(state): State<AppState>,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePostResponse>), ApiError> {
    let Json(request) = body.map_err(|e| state.error(RelayError::InvalidRequest(e.body_text())))?;
    if request.content.trim().is_empty() {
        return Err(state.error(RelayError::InvalidRequest("content must not be empty".to_string())));
    }

    let draft = NewMessage {
        content: request.content,
        author: request.author,
        is_anonymous: request.is_anonymous,
    };
    let post = state
        .node
        .store()
        .append(draft)
        .await
        .map_err(|e| state.error(e.into()))?;

    debug!("[{}] Direct write stored message {}", state.node.id(), post.id);
    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "created".to_string(),
            post,
        }),
    ))
}

async fn analyse(State(state): State<AppState>) -> Result<Json<SentimentSummary>, ApiError> {
    let messages = state
        .node
        .store()
        .list()
        .await
        .map_err(|e| state.error(e.into()))?;
    let summary = aggregate_sentiment(&messages, state.scorer.as_ref()).await;
    Ok(Json(summary))
}

async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before the upgrade completes so no delivery slips between
    let rx = state.node.fanout().subscribe();
    let node_id = state.node.id().clone();
    ws.on_upgrade(move |socket| async move {
        info!("[{}] Subscriber connected", node_id);
        push_deliveries(socket, rx).await;
        info!("[{}] Subscriber disconnected", node_id);
    })
}

async fn push_deliveries(mut socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Dropping subscriber that lagged {} message(s)", missed);
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}
