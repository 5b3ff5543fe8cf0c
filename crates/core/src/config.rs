//! Timeout and proxy settings consumed by both channels.
//!
//! All values are supplied by the calling layer; nothing here is persisted
//! across process restarts.

use std::time::Duration;

/// Per-call and per-connection timeouts.
///
/// Send and read are independent: a caller first waits up to `send` for the
/// socket write to complete, then up to `read` for its reply to be resolved.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Establishing the TCP/TLS/websocket connection
    pub connect: Duration,
    /// Writing one frame to the socket
    pub send: Duration,
    /// Waiting for the reply to one request
    pub read: Duration,
    /// Interval between BLCP heartbeats
    pub heartbeat: Duration,
    /// Reading the reply of an auxiliary HTTPS call
    pub http_read: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            send: Duration::from_secs(3),
            read: Duration::from_secs(8),
            heartbeat: Duration::from_secs(5),
            http_read: Duration::from_secs(12),
        }
    }
}

/// Proxy settings forwarded to the HTTP client.
///
/// The raw-socket channels do not go through the proxy.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Proxy url such as `http://127.0.0.1:8080`, or None for a direct
    /// connection
    pub url: Option<String>,
}

/// Bundle of everything a channel needs besides the account
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Timeouts applied to this channel's calls
    pub timeouts: TimeoutConfig,
    /// Proxy applied to auxiliary HTTPS calls
    pub proxy: ProxyConfig,
}
