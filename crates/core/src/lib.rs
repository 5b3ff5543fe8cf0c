#![warn(missing_docs)]
//! # Barlink-Core
//!
//! Barlink-Core is a rust library implementing the wire protocols of the
//! Baidu Tieba IM backends: the 9-byte-header frame format spoken over the
//! `im.tieba.baidu.com` websocket and the `lcp\x01` framed RPC protocol
//! (BLCP) spoken over a TLS socket to `common.lcs.baidu.com`.
//!
//! The two channel managers are [`ws_protocol::WsClient`] and
//! [`blcp_protocol::BlcpClient`]. Both are payload-agnostic: callers hand
//! them a serialized request body and a method selector and get the raw
//! response body back. Framing, encryption and request/response correlation
//! happen here; building and interpreting the bodies is the caller's job.
//!
//! A session starts from an [`account::Account`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use barlink_core::account::Account;
//! use barlink_core::ws_protocol::WsClient;
//!
//! # async fn demo() -> barlink_core::Result<()> {
//! let account = Account::new("A".repeat(192), String::new()).unwrap();
//! let client = WsClient::new(Arc::new(account), Default::default());
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

/// Contains the account credential and device identity containers
pub mod account;
/// Contains low level BLCP structures and formats
pub mod blcp;
/// Contains the high level interface for the BLCP channel
pub mod blcp_protocol;
/// Contains the timeout and proxy configuration consumed by the channels
pub mod config;
/// Contains the cipher, signing and fingerprint primitives
pub mod crypto;
/// Contains the error types of the library
pub mod errors;
/// Contains the high level interface for the IM websocket channel
pub mod ws_protocol;
/// Contains low level structures and formats for the websocket frames
pub mod wsmsg;

mod correlator;
mod notify;

pub use errors::{Error, ProtocolError, Result, TransportError};
