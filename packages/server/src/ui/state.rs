//! Server state shared by every handler.

use std::sync::Arc;

use crate::{
    config::{Keepalive, OriginPolicy},
    hub::ConnectionHub,
    usecase::{ConnectParticipantUseCase, DisconnectParticipantUseCase, HandleMessageUseCase},
};

/// Shared application state
pub struct AppState {
    /// Live participant registry (read-only access for the HTTP endpoints)
    pub hub: Arc<ConnectionHub>,
    /// Origins allowed to open the WebSocket
    pub origin_policy: OriginPolicy,
    /// Ping, idle and write timings for every socket
    pub keepalive: Keepalive,
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    pub handle_message_usecase: Arc<HandleMessageUseCase>,
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
}
