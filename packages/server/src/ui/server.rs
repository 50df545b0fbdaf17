//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use hiroba_shared::time::{Clock, SystemClock};
use tower_http::trace::TraceLayer;

use crate::{
    config::{HubConfig, Keepalive, OriginPolicy},
    error::ServerError,
    hub::ConnectionHub,
    usecase::{ConnectParticipantUseCase, DisconnectParticipantUseCase, HandleMessageUseCase},
};

use super::{
    handler::{health_check, presence, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket presence server
///
/// This struct encapsulates the server's dependencies and provides methods to
/// run it.
///
/// # Example
///
/// ```ignore
/// let server = Server::assemble(&HubConfig::default(), OriginPolicy::default());
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    hub: Arc<ConnectionHub>,
    origin_policy: OriginPolicy,
    keepalive: Keepalive,
    connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    handle_message_usecase: Arc<HandleMessageUseCase>,
    disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
}

impl Server {
    /// Create a new Server instance
    pub fn new(
        hub: Arc<ConnectionHub>,
        origin_policy: OriginPolicy,
        keepalive: Keepalive,
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        handle_message_usecase: Arc<HandleMessageUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    ) -> Self {
        Self {
            hub,
            origin_policy,
            keepalive,
            connect_participant_usecase,
            handle_message_usecase,
            disconnect_participant_usecase,
        }
    }

    /// Wire the hub and use cases in dependency order:
    /// hub → use cases → server.
    pub fn assemble(hub_config: &HubConfig, origin_policy: OriginPolicy) -> Self {
        let hub = Arc::new(ConnectionHub::new(hub_config));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

        let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
            hub.clone(),
            hub_config.outbound_queue_capacity,
        ));
        let handle_message_usecase = Arc::new(HandleMessageUseCase::new(hub.clone(), clock));
        let disconnect_participant_usecase =
            Arc::new(DisconnectParticipantUseCase::new(hub.clone()));

        Self::new(
            hub,
            origin_policy,
            hub_config.keepalive,
            connect_participant_usecase,
            handle_message_usecase,
            disconnect_participant_usecase,
        )
    }

    /// Build the router with all endpoints and shared state attached.
    pub fn router(self) -> Router {
        let app_state = Arc::new(AppState {
            hub: self.hub,
            origin_policy: self.origin_policy,
            keepalive: self.keepalive,
            connect_participant_usecase: self.connect_participant_usecase,
            handle_message_usecase: self.handle_message_usecase,
            disconnect_participant_usecase: self.disconnect_participant_usecase,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/presence", get(presence))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the server on `host:port` until Ctrl+C / SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), ServerError> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;

        tracing::info!(
            "Presence server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(
        self,
        listener: tokio::net::TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
