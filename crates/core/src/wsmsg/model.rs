use crate::crypto::ecb::WsCipher;
use std::sync::Arc;

/// Always set; the servers reject frames without it
pub(super) const FLAG_MARKER: u8 = 0x08;
/// The payload is gzip compressed
pub(super) const FLAG_COMPRESS: u8 = 0x40;
/// The payload is AES-ECB encrypted
pub(super) const FLAG_ENCRYPT: u8 = 0x80;

/// The cmd of the client registration handshake
pub const CMD_REGISTER: u32 = 1001;

/// One frame of the websocket channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsFrame {
    /// The remote method selector
    pub cmd: u32,
    /// The correlation tag matching a response to its request
    pub req_id: u32,
    /// The body, already stripped of compression and encryption
    pub payload: Vec<u8>,
}

/// Per-frame encoding options
#[derive(Debug, Clone, Copy)]
pub struct SendOpts {
    /// gzip the payload before encryption
    pub compress: bool,
    /// AES-ECB encrypt the payload
    pub encrypt: bool,
}

impl Default for SendOpts {
    fn default() -> Self {
        // The official client encrypts everything except the registration
        Self {
            compress: false,
            encrypt: true,
        }
    }
}

impl SendOpts {
    /// The options used by the registration handshake: plaintext,
    /// uncompressed
    pub fn plaintext() -> Self {
        Self {
            compress: false,
            encrypt: false,
        }
    }
}

/// The per-connection frame context: the session cipher, keyed once at
/// handshake and immutable afterwards.
#[derive(Debug, Clone)]
pub struct WsContext {
    pub(super) cipher: Arc<WsCipher>,
}

impl WsContext {
    /// Builds the context around a session cipher
    pub fn new(cipher: Arc<WsCipher>) -> Self {
        Self { cipher }
    }
}
