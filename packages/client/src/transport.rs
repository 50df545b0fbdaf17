//! Reconnecting WebSocket link to the presence hub.
//!
//! ```text
//! Idle → Connecting → Open → RetryPending → Connecting → … → Stopped
//! ```
//!
//! A single background task owns the socket. It reconnects with
//! [`Backoff`] after every close or failed attempt and stops only when
//! [`PresenceTransport::stop`] is called.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use hiroba_shared::{
    limits::IDLE_TIMEOUT,
    protocol::{ClientMessage, ServerMessage},
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use crate::{
    backoff::{BASE_BACKOFF, Backoff, MAX_BACKOFF},
    error::ClientError,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receives every inbound frame that decodes into a [`ServerMessage`].
pub type MessageCallback = Arc<dyn Fn(ServerMessage) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Connecting,
    Open,
    RetryPending,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Hub endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    /// Identity token attached to every attempt
    pub token: Option<String>,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Close and reconnect after this long without any inbound frame
    pub idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".to_string(),
            token: None,
            base_backoff: BASE_BACKOFF,
            max_backoff: MAX_BACKOFF,
            idle_timeout: IDLE_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            ..Self::default()
        }
    }
}

/// What the orchestrator needs from a link to the hub.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceTransport: Send + Sync {
    /// Queue a message for the hub. Returns `false` (and drops the message)
    /// unless the link is open.
    fn send(&self, message: ClientMessage) -> bool;

    /// Close the link for good. Idempotent.
    async fn stop(&self);
}

/// Builds the connect URL with the token as a query parameter.
pub fn connect_url(base: &str, token: Option<&str>) -> String {
    match token {
        Some(token) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{base}{separator}token={}", encode_query_value(token))
        }
        None => base.to_string(),
    }
}

fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn is_stopped(stopped: &watch::Receiver<bool>) -> bool {
    *stopped.borrow()
}

async fn wait_stopped(stopped: &mut watch::Receiver<bool>) {
    // An Err means the transport itself is gone, which is as final as a stop.
    let _ = stopped.wait_for(|stopped| *stopped).await;
}

struct Shared {
    config: TransportConfig,
    state: watch::Sender<TransportState>,
    stopped: watch::Sender<bool>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl Shared {
    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<String>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `next` unless the transport has already stopped.
    fn set_state(&self, next: TransportState) {
        self.state.send_if_modified(|state| {
            if *state == TransportState::Stopped || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    async fn run(self: Arc<Self>, on_message: MessageCallback) {
        let mut stopped = self.stopped.subscribe();
        let mut backoff = Backoff::new(self.config.base_backoff, self.config.max_backoff);
        let url = connect_url(&self.config.url, self.config.token.as_deref());

        while !is_stopped(&stopped) {
            self.set_state(TransportState::Connecting);
            tracing::debug!("Connecting to {}", self.config.url);

            let attempt = tokio::select! {
                result = connect_async(url.as_str()) => result,
                _ = wait_stopped(&mut stopped) => break,
            };

            match attempt {
                Ok((socket, _)) => {
                    backoff.reset();
                    tracing::info!("Connected to {}", self.config.url);

                    match self.drive(socket, &on_message, &mut stopped).await {
                        Ok(()) => break,
                        Err(e) => tracing::warn!("Connection lost: {}", e),
                    }
                }
                Err(e) => tracing::warn!("Connection attempt failed: {}", ClientError::from(e)),
            }

            if is_stopped(&stopped) {
                break;
            }
            let delay = backoff.next_delay(&mut rand::rng());
            self.set_state(TransportState::RetryPending);
            tracing::info!("Reconnecting in {:.1}s", delay.as_secs_f64());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_stopped(&mut stopped) => break,
            }
        }

        self.state.send_replace(TransportState::Stopped);
        tracing::debug!("Transport loop finished");
    }

    /// Pumps one open socket. `Ok` means the transport was stopped; any
    /// error means the session was lost and a retry should follow.
    async fn drive(
        &self,
        socket: Socket,
        on_message: &MessageCallback,
        stopped: &mut watch::Receiver<bool>,
    ) -> Result<(), ClientError> {
        let (mut sink, mut stream) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        *self.outbound() = Some(tx);
        self.set_state(TransportState::Open);

        // Only inbound frames push the deadline back.
        let idle = tokio::time::sleep(self.config.idle_timeout);
        tokio::pin!(idle);

        let result = loop {
            tokio::select! {
                _ = &mut idle => {
                    break Err(ClientError::IdleTimeout(self.config.idle_timeout));
                }
                frame = stream.next() => {
                    let message = match frame {
                        None | Some(Ok(Message::Close(_))) => break Err(ClientError::Closed),
                        Some(Err(e)) => break Err(e.into()),
                        Some(Ok(message)) => message,
                    };
                    idle.as_mut()
                        .reset(tokio::time::Instant::now() + self.config.idle_timeout);
                    match message {
                        Message::Text(text) => match ServerMessage::decode(text.as_str()) {
                            Ok(message) => on_message(message),
                            Err(e) => tracing::debug!("Discarding frame from server: {}", e),
                        },
                        // flush the pong tungstenite queued for this ping
                        Message::Ping(_) => {
                            if let Err(e) = sink.flush().await {
                                break Err(e.into());
                            }
                        }
                        _ => {}
                    }
                }
                Some(payload) = rx.recv() => {
                    if let Err(e) = sink.send(Message::text(payload)).await {
                        break Err(e.into());
                    }
                }
                _ = wait_stopped(stopped) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break Ok(());
                }
            }
        };

        *self.outbound() = None;
        result
    }
}

/// [`PresenceTransport`] over a WebSocket that reconnects on its own.
pub struct ReconnectingTransport {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectingTransport {
    pub fn new(config: TransportConfig) -> Self {
        let (state, _) = watch::channel(TransportState::Idle);
        let (stopped, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                config,
                state,
                stopped,
                outbound: Mutex::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Spawn the connection loop. Only the first call on an idle transport
    /// has any effect.
    pub fn start(&self, on_message: MessageCallback) {
        let mut started = false;
        self.shared.state.send_if_modified(|state| {
            if *state != TransportState::Idle {
                return false;
            }
            *state = TransportState::Connecting;
            started = true;
            true
        });
        if !started {
            tracing::warn!("Transport already started or stopped");
            return;
        }

        let handle = tokio::spawn(self.shared.clone().run(on_message));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub fn state(&self) -> TransportState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TransportState> {
        self.shared.state.subscribe()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }
}

#[async_trait]
impl PresenceTransport for ReconnectingTransport {
    fn send(&self, message: ClientMessage) -> bool {
        if self.state() != TransportState::Open {
            return false;
        }
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Failed to encode outbound message: {}", e);
                return false;
            }
        };
        match self.shared.outbound().as_ref() {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    async fn stop(&self) {
        if self.shared.stopped.send_replace(true) {
            return;
        }
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        *self.shared.outbound() = None;
        self.shared.state.send_replace(TransportState::Stopped);
        tracing::info!("Transport stopped");
    }
}
