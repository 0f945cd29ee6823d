use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    event::RelayEvent,
    registry::{Frame, PeerId, Relay},
};
use crate::{
    auth::middleware::{authenticate, header_token, AuthUser},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Upgrade handler for `/ws`. With `require_token` set, the token comes from
/// the auth header or, for browsers that cannot set headers, `?token=`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = if state.config.relay.require_token {
        let token = header_token(&headers).or(params.token.as_deref());
        let AuthUser(id) = authenticate(&state, token)?;
        Some(id)
    } else {
        None
    };

    let relay = Arc::clone(&state.relay);
    let event: Arc<str> = state.config.relay.event.as_str().into();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, relay, event, user)))
}

async fn handle_socket(
    socket: WebSocket,
    relay: Arc<Relay>,
    event: Arc<str>,
    user: Option<Uuid>,
) {
    let (peer, mut outbound) = relay.add();
    info!(peer, user_id = ?user, peers = relay.len(), "client connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if sender.send(Message::Text(frame.to_string())).await.is_err() {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => relay_text(&relay, peer, &event, text),
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(peer, error = %e, "websocket transport error");
                        break;
                    }
                }
            }
        }
    }

    relay.remove(peer);
    info!(peer, peers = relay.len(), "client disconnected");
}

/// Rebroadcasts `text` untouched when it is a well-formed `name` event.
fn relay_text(relay: &Relay, peer: PeerId, name: &str, text: String) {
    let event = match RelayEvent::parse(&text) {
        Ok(ev) => ev,
        Err(e) => {
            warn!(peer, error = %e, "ignoring malformed frame");
            return;
        }
    };

    if !event.is(name) {
        debug!(peer, event = %event.event, "ignoring unknown event");
        return;
    }

    info!(peer, data = event.data_text(), "message received");
    let delivered = relay.broadcast(Frame::from(text));
    debug!(peer, delivered, "message broadcast");
}
