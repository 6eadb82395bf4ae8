use super::ServerError;
use super::handler::McpHandler;
use crate::rpc::{RpcRequest, RpcResponse, SESSION_HEADER};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MCP_PATH: &str = "/mcp";

/// Open sessions kept before the oldest is forgotten.
const MAX_SESSIONS: usize = 1024;

struct HttpState {
    handler: McpHandler,
    sessions: Mutex<SessionRegistry>,
}

/// Session ids issued on `initialize`, oldest first.
#[derive(Debug, Default)]
struct SessionRegistry {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SessionRegistry {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn insert(&mut self, id: String) {
        while self.order.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.ids.remove(&oldest) {
                debug!(session = %oldest, "Evicting idle HTTP MCP session");
            }
        }
        if self.ids.insert(id.clone()) {
            self.order.push_back(id);
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn remove(&mut self, id: &str) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.order.retain(|known| known != id);
        true
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Builds the streamable-HTTP router serving `handler` at `/mcp`.
pub fn router(handler: McpHandler) -> Router {
    let state = Arc::new(HttpState {
        handler,
        sessions: Mutex::new(SessionRegistry::with_capacity(MAX_SESSIONS)),
    });
    Router::new()
        .route(
            MCP_PATH,
            post(handle_post)
                .get(method_not_allowed)
                .delete(handle_delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds all interfaces on `port` and serves until the listener fails.
pub async fn serve(handler: McpHandler, port: u16) -> Result<(), ServerError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Starting lean-mcp server on http://{addr}{MCP_PATH}");
    axum::serve(listener, router(handler).into_make_service())
        .await
        .map_err(ServerError::Serve)
}

async fn handle_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "Rejecting unparsable HTTP JSON-RPC body");
            return (
                StatusCode::BAD_REQUEST,
                Json(RpcResponse::parse_error(format!("Parse error: {err}"))),
            )
                .into_response();
        }
    };
    let id = value.get("id").cloned();
    let request: RpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RpcResponse::invalid_request(id, format!("Invalid request: {err}"))),
            )
                .into_response();
        }
    };

    if let Some(session) = session_id(&headers) {
        if !state.sessions.lock().await.contains(session) {
            debug!(session, "Request carries an unknown session id");
        }
    }

    let is_initialize = request.method == "initialize";
    let Some(response) = state.handler.handle(request).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    let mut reply = Json(response).into_response();
    if is_initialize {
        let session = Uuid::new_v4().to_string();
        if let Ok(header) = HeaderValue::from_str(&session) {
            reply.headers_mut().insert(SESSION_HEADER, header);
        }
        info!(session = %session, "Opened HTTP MCP session");
        state.sessions.lock().await.insert(session);
    }
    reply
}

async fn handle_delete(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> StatusCode {
    let Some(session) = session_id(&headers) else {
        return StatusCode::BAD_REQUEST;
    };
    if state.sessions.lock().await.remove(session) {
        info!(session, "Closed HTTP MCP session");
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
}
