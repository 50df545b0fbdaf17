//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{health_check, presence};
pub use websocket::websocket_handler;
