//! Error types of the library.
//!
//! Every public send-and-wait call resolves to exactly one of four kinds:
//! a transport failure (fatal to the current connection attempt), a protocol
//! failure (the offending frame was dropped, the connection lives), a server
//! rejection (well-formed reply carrying a nonzero error code), or a timeout
//! (the caller's entry was cancelled, the connection is untouched). Nothing
//! is retried and no default value is substituted at this layer.

use err_derive::Error;

/// Convenience alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// This is the primary error type of the library
#[derive(Debug, Error)]
pub enum Error {
    /// A socket, TLS, HTTP or handshake failure. Fatal to the current
    /// connection attempt; the caller decides whether to reconnect.
    #[error(display = "Transport error")]
    Transport(#[error(source)] TransportError),

    /// A malformed or unparseable frame. The frame was dropped; the
    /// connection and its dispatcher keep running.
    #[error(display = "Protocol error")]
    Protocol(#[error(source)] ProtocolError),

    /// A well-formed response carrying a nonzero business error code
    #[error(display = "Server error {}: {}", code, msg)]
    Server {
        /// The error code reported by the server
        code: i32,
        /// The message accompanying the code
        msg: String,
    },

    /// No resolution arrived before the caller's deadline
    #[error(display = "Timeout")]
    Timeout,
}

/// Failures of the underlying socket, TLS session or HTTP exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// An IO error such as the stream being dropped
    #[error(display = "I/O error")]
    Io(#[error(source)] std::io::Error),

    /// An error raised by the websocket layer
    #[error(display = "Websocket error")]
    WebSocket(#[error(source)] Box<tokio_tungstenite::tungstenite::Error>),

    /// An error raised by the HTTP client
    #[error(display = "HTTP error")]
    Http(#[error(source)] reqwest::Error),

    /// The configured host is not a valid TLS server name
    #[error(display = "Invalid TLS server name")]
    ServerName,

    /// The remote host did not resolve to any address
    #[error(display = "Failed to resolve remote address")]
    AddrResolution,

    /// A handshake step failed; the attempt is over and must be restarted
    /// from the beginning by the caller
    #[error(display = "Handshake failed during {}: {}", stage, detail)]
    Handshake {
        /// The handshake step that failed
        stage: &'static str,
        /// What went wrong
        detail: String,
    },

    /// The connection was closed while requests were still in flight
    #[error(display = "Dropped connection")]
    ConnectionClosed,

    /// The channel is not connected; call `ensure_ready` first
    #[error(display = "Connection is not ready")]
    NotReady,

    /// The pending-request registry is at capacity
    #[error(display = "Too many requests in flight")]
    Saturated,
}

/// Failures to frame, parse or decode wire data
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Error raised while deserializing a websocket frame
    #[error(display = "Frame deserialization error")]
    WsDeserialization(#[error(source)] crate::wsmsg::de::Error),

    /// Error raised while serializing a websocket frame
    #[error(display = "Frame serialization error")]
    WsSerialization(#[error(source)] crate::wsmsg::ser::Error),

    /// Error raised while deserializing a BLCP frame
    #[error(display = "BLCP deserialization error")]
    BlcpDeserialization(#[error(source)] crate::blcp::de::Error),

    /// Error raised while serializing a BLCP frame
    #[error(display = "BLCP serialization error")]
    BlcpSerialization(#[error(source)] crate::blcp::ser::Error),

    /// Error raised while decoding an RPC body
    #[error(display = "Body decode error")]
    Body(#[error(source)] crate::blcp::body::Error),

    /// A reply arrived that does not fit the exchange it answers
    #[error(display = "Unexpected reply: {}", _0)]
    UnexpectedReply(&'static str),
}

impl From<std::io::Error> for Error {
    fn from(k: std::io::Error) -> Self {
        Error::Transport(TransportError::Io(k))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(k: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(TransportError::WebSocket(Box::new(k)))
    }
}

impl From<reqwest::Error> for Error {
    fn from(k: reqwest::Error) -> Self {
        Error::Transport(TransportError::Http(k))
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}

impl From<crate::wsmsg::de::Error> for Error {
    fn from(k: crate::wsmsg::de::Error) -> Self {
        Error::Protocol(ProtocolError::WsDeserialization(k))
    }
}

impl From<crate::wsmsg::ser::Error> for Error {
    fn from(k: crate::wsmsg::ser::Error) -> Self {
        Error::Protocol(ProtocolError::WsSerialization(k))
    }
}

impl From<crate::blcp::de::Error> for Error {
    fn from(k: crate::blcp::de::Error) -> Self {
        Error::Protocol(ProtocolError::BlcpDeserialization(k))
    }
}

impl From<crate::blcp::ser::Error> for Error {
    fn from(k: crate::blcp::ser::Error) -> Self {
        Error::Protocol(ProtocolError::BlcpSerialization(k))
    }
}

impl From<crate::blcp::body::Error> for Error {
    fn from(k: crate::blcp::body::Error) -> Self {
        Error::Protocol(ProtocolError::Body(k))
    }
}
