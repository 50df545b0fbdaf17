//! Error types for the presence client.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Handshake or socket failure
    #[error("Connection error: {0}")]
    Connection(#[source] Box<tungstenite::Error>),

    /// The server ended the session
    #[error("Server closed the connection")]
    Closed,

    /// Nothing arrived from the server within the liveness window
    #[error("No frame from server for {0:?}")]
    IdleTimeout(Duration),

    /// The identity token file could not be read or written
    #[error("Token file '{path}': {source}")]
    TokenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<tungstenite::Error> for ClientError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Connection(Box::new(e))
    }
}
