//! Runtime configuration for the presence server.

use std::time::Duration;

use hiroba_shared::limits::{IDLE_TIMEOUT, OUTBOUND_QUEUE_CAPACITY, PING_PERIOD, WRITE_TIMEOUT};

/// Default number of identities remembered before LRU eviction kicks in.
pub const DEFAULT_IDENTITY_CAPACITY: usize = 10_000;

/// Tunables for the connection hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum remembered identities; `0` keeps every identity forever.
    pub identity_capacity: usize,
    /// Capacity of each participant's outbound queue.
    pub outbound_queue_capacity: usize,
    pub keepalive: Keepalive,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            identity_capacity: DEFAULT_IDENTITY_CAPACITY,
            outbound_queue_capacity: OUTBOUND_QUEUE_CAPACITY,
            keepalive: Keepalive::default(),
        }
    }
}

/// Socket liveness timings used by every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    /// Ping a connection after this long without outbound data. Must be non-zero.
    pub ping_period: Duration,
    /// Drop a connection after this long without any inbound frame.
    pub idle_timeout: Duration,
    /// Upper bound for a single socket write.
    pub write_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            ping_period: PING_PERIOD,
            idle_timeout: IDLE_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
        }
    }
}

/// Origins allowed to open the WebSocket.
///
/// An empty list admits every origin. Requests without an `Origin` header
/// (non-browser clients) are always admitted.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(_) if self.allowed.is_empty() => true,
            Some(origin) => self.allowed.iter().any(|o| o == origin),
        }
    }
}
