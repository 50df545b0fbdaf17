//! WebSocket connection handlers.
//!
//! Each connection runs two tasks linked by the participant's bounded
//! outbound queue: a reader that feeds inbound frames to the use cases, and
//! a writer (`pusher_loop`) that drains the queue and keeps the socket alive
//! with pings.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use hiroba_shared::limits::{MAX_FRAME_BYTES, sanitize_token};
use serde::Deserialize;
use tokio::{sync::mpsc, time::Instant};

use crate::{config::Keepalive, domain::ParticipantSession, ui::state::AppState};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.origin_policy.allows(origin) {
        tracing::warn!("Rejecting WebSocket upgrade from origin {:?}", origin);
        return StatusCode::FORBIDDEN.into_response();
    }

    let token = sanitize_token(query.token.as_deref());
    if query.token.is_some() && token.is_none() {
        tracing::debug!("Ignoring unusable identity token, connecting anonymously");
    }

    ws.max_message_size(MAX_FRAME_BYTES)
        .max_frame_size(MAX_FRAME_BYTES)
        .on_failed_upgrade(|e| tracing::warn!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_socket(socket, state, token))
}

/// Write one message, giving up after `limit`.
async fn write_with_deadline(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    limit: Duration,
) -> bool {
    matches!(
        tokio::time::timeout(limit, sink.send(message)).await,
        Ok(Ok(()))
    )
}

/// Spawns the writer: drains the outbound queue into the socket.
///
/// A ping goes out whenever a whole ping period passes without any
/// application data. When the queue closes (the participant was
/// unregistered) a close frame is sent and the task ends.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sink: SplitSink<WebSocket, Message>,
    timings: Keepalive,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = timings.ping_period;
        let limit = timings.write_timeout;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    let Some(payload) = outbound else {
                        let _ = write_with_deadline(&mut sink, Message::Close(None), limit).await;
                        break;
                    };
                    if !write_with_deadline(&mut sink, Message::Text(payload.into()), limit).await {
                        break;
                    }
                    keepalive.reset();
                }
                _ = keepalive.tick() => {
                    if !write_with_deadline(&mut sink, Message::Ping(Bytes::new()), limit).await {
                        break;
                    }
                }
            }
        }
    })
}

/// Reads frames until the peer closes, errors, or stays silent for the idle
/// timeout. Any inbound frame, pongs included, resets the deadline.
async fn reader_loop(
    mut stream: SplitStream<WebSocket>,
    mut session: ParticipantSession,
    state: Arc<AppState>,
) {
    let idle_timeout = state.keepalive.idle_timeout;
    loop {
        let message = match tokio::time::timeout(idle_timeout, stream.next()).await {
            Ok(Some(Ok(message))) => message,
            Ok(Some(Err(e))) => {
                tracing::debug!("WebSocket error from '{}': {}", session.id, e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::info!("'{}' idle for {:?}, dropping connection", session.id, idle_timeout);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                state
                    .handle_message_usecase
                    .execute(&mut session, text.as_str())
                    .await;
            }
            Message::Close(_) => {
                tracing::debug!("'{}' requested close", session.id);
                break;
            }
            Message::Pong(_) | Message::Ping(_) | Message::Binary(_) => {}
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, token: Option<String>) {
    let (sink, stream) = socket.split();

    let pending = state.connect_participant_usecase.prepare(token).await;
    let session = pending.session;
    let id = session.id.clone();
    let token = session.token.clone();
    let name = session.name.clone();

    // The writer must be draining before the welcome is queued.
    let mut send_task = pusher_loop(pending.outbound_rx, sink, state.keepalive);

    if let Err(e) = state
        .connect_participant_usecase
        .admit(&session, pending.outbound)
        .await
    {
        tracing::warn!("Failed to admit '{}': {}", id, e);
        state
            .disconnect_participant_usecase
            .execute(&id, token.as_deref())
            .await;
        send_task.abort();
        return;
    }

    let mut recv_task = tokio::spawn(reader_loop(stream, session, state.clone()));

    let reader_finished = tokio::select! {
        _ = &mut recv_task => true,
        _ = &mut send_task => {
            recv_task.abort();
            false
        }
    };

    state
        .disconnect_participant_usecase
        .execute(&id, token.as_deref())
        .await;
    tracing::info!("{} ({}) left", name, id);

    // Unregistering closed the queue; let the writer say goodbye.
    if reader_finished
        && tokio::time::timeout(state.keepalive.write_timeout, &mut send_task)
            .await
            .is_err()
    {
        send_task.abort();
    }
}
