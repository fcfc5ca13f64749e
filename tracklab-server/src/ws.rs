use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::header,
    http::HeaderMap,
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracklab_collab::EventKind;

use crate::{Router, ServerContext, ServerError, ServerResult};

#[derive(Debug, Deserialize)]
struct GatewayQuery {
    token: Option<String>,
}

/// Messages clients send over the gateway
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientMessage {
    JoinProject {
        project_id: i64,
    },
    LeaveProject {
        project_id: i64,
    },
    ProjectUpdate {
        project_id: i64,
        #[serde(default)]
        payload: Value,
    },
    TrackUpdate {
        project_id: i64,
        #[serde(default)]
        payload: Value,
    },
    CursorUpdate {
        project_id: i64,
        #[serde(default)]
        payload: Value,
    },
    PlaybackSync {
        project_id: i64,
        #[serde(default)]
        payload: Value,
    },
    AudioStream {
        project_id: i64,
        #[serde(default)]
        payload: Value,
    },
    ChatMessage {
        project_id: i64,
        #[serde(default)]
        payload: Value,
    },
}

/// Upgrades to a gateway connection. Browsers can't set headers on a
/// WebSocket handshake, so the token is also accepted as a query parameter.
pub(crate) async fn gateway(
    State(context): State<ServerContext>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ServerResult<Response> {
    let header_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|x| x.to_str().ok())
        .and_then(|x| x.strip_prefix("Bearer "))
        .map(str::to_string);

    let token = query
        .token
        .or(header_token)
        .ok_or(ServerError::Unauthorized)?;

    // The session only gates the upgrade; events are tagged with a
    // connection-scoped id, not the account id
    let _ = context.collab.auth.session(&token).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, context)))
}

async fn handle_socket(socket: WebSocket, context: ServerContext) {
    let (session_id, mut events) = context.collab.relay.register();
    let (mut sink, mut stream) = socket.split();

    // Forward relay events to the client
    let forward = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };

            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Ok(parsed) = serde_json::from_str::<ClientMessage>(&text) else {
            continue;
        };

        match parsed {
            ClientMessage::JoinProject { project_id } => {
                context.collab.relay.join(&session_id, project_id)
            }
            ClientMessage::LeaveProject { project_id } => {
                context.collab.relay.leave(&session_id, project_id)
            }
            ClientMessage::ProjectUpdate {
                project_id,
                payload,
            } => context
                .collab
                .relay
                .publish(&session_id, project_id, EventKind::ProjectUpdate(payload)),
            ClientMessage::TrackUpdate {
                project_id,
                payload,
            } => context
                .collab
                .relay
                .publish(&session_id, project_id, EventKind::TrackUpdate(payload)),
            ClientMessage::CursorUpdate {
                project_id,
                payload,
            } => context
                .collab
                .relay
                .publish(&session_id, project_id, EventKind::CursorUpdate(payload)),
            ClientMessage::PlaybackSync {
                project_id,
                payload,
            } => context
                .collab
                .relay
                .publish(&session_id, project_id, EventKind::PlaybackSync(payload)),
            ClientMessage::AudioStream {
                project_id,
                payload,
            } => context
                .collab
                .relay
                .publish(&session_id, project_id, EventKind::AudioStream(payload)),
            ClientMessage::ChatMessage {
                project_id,
                payload,
            } => context
                .collab
                .relay
                .publish(&session_id, project_id, EventKind::ChatMessage(payload)),
        }
    }

    context.collab.relay.disconnect(&session_id);
    forward.abort();
}

pub fn router() -> Router {
    Router::new().route("/gateway", get(gateway))
}
