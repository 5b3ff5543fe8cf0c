//! High level interface for the IM websocket channel.
//!
//! The channel upgrades a plain websocket to `im.tieba.baidu.com:8000`,
//! then runs the cmd=1001 registration handshake, which both authenticates
//! the session and transports the frame-cipher key material. After that
//! every call is a correlated send/receive of one frame.
//!
//! Reconnection is never automatic: a mid-session failure leaves the
//! client disconnected and the caller decides when to call `connect()`
//! again (`ensure_ready()` is the idempotent form). A caller that detects
//! a stale connection at send time may do exactly one `ensure_ready()` and
//! resend once; this layer will not loop.

use crate::account::Account;
use crate::config::ClientConfig;
use crate::correlator::ReqIdGen;
use crate::wsmsg::model::{SendOpts, WsFrame};
use crate::{Error, Result, TransportError};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{
    HeaderValue, SEC_WEBSOCKET_EXTENSIONS, SEC_WEBSOCKET_PROTOCOL,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

mod connection;
mod register;

pub use connection::WsEvent;
pub use register::WsMsgGroup;
pub(crate) use connection::{WsConnection, WsSource};

/// The client version reported during registration
pub const MAIN_VERSION: &str = "12.68.1.0";

pub(crate) const WS_HOST: &str = "im.tieba.baidu.com";
pub(crate) const WS_PORT: u16 = 8000;

/// This is the primary struct for interacting with the IM websocket
/// channel
pub struct WsClient {
    account: Arc<Account>,
    config: ClientConfig,
    req_ids: ReqIdGen,
    conn: Mutex<Option<Arc<WsConnection>>>,
}

impl WsClient {
    /// Creates a client; no connection is opened yet
    pub fn new(account: Arc<Account>, config: ClientConfig) -> Self {
        Self {
            account,
            config,
            req_ids: ReqIdGen::new(),
            conn: Mutex::new(None),
        }
    }

    /// Opens the websocket and runs the registration handshake.
    ///
    /// Returns the message groups the server reported. Any previous
    /// connection is torn down first.
    pub async fn connect(&self) -> Result<Vec<WsMsgGroup>> {
        let stream = self.open_socket().await?;
        self.install(stream).await
    }

    /// Connects only when no live connection exists. Idempotent.
    pub async fn ensure_ready(&self) -> Result<()> {
        {
            let guard = self.conn.lock().await;
            if let Some(conn) = &*guard {
                if conn.is_alive() {
                    return Ok(());
                }
            }
        }
        self.connect().await.map(|_| ())
    }

    /// Sends a payload under `cmd` and waits for the matching response
    /// payload.
    ///
    /// The payload is not inspected or validated here; this layer only
    /// frames, encrypts and correlates it.
    pub async fn send(&self, payload: Vec<u8>, cmd: u32, opts: SendOpts) -> Result<Vec<u8>> {
        let conn = self.ready_conn().await?;
        let req_id = self.req_ids.next() as u32;
        let frame = WsFrame {
            cmd,
            req_id,
            payload,
        };
        let reply = conn
            .send_and_wait(
                frame,
                opts,
                self.config.timeouts.send,
                self.config.timeouts.read,
            )
            .await?;
        Ok(reply.payload)
    }

    /// The next server-pushed event
    pub async fn next_event(&self) -> Result<WsEvent> {
        let conn = self.ready_conn().await?;
        Ok(conn.next_event().await)
    }

    /// Cancels the dispatcher, closes the socket, and releases every
    /// pending request with a cancellation error
    pub async fn close(&self) {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.shutdown().await;
        }
    }

    async fn open_socket(&self) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        let mut request = format!("ws://{}:{}/", WS_HOST, WS_PORT)
            .into_client_request()
            .map_err(Error::from)?;
        let headers = request.headers_mut();
        headers.insert(
            SEC_WEBSOCKET_EXTENSIONS,
            HeaderValue::from_static("im_version=2.3"),
        );
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("chat"));

        let (stream, _response) = tokio::time::timeout(
            self.config.timeouts.connect,
            tokio_tungstenite::connect_async(request),
        )
        .await??;
        Ok(stream)
    }

    /// Adopts a freshly upgraded websocket and registers on it
    pub(crate) async fn install<S>(&self, stream: WebSocketStream<S>) -> Result<Vec<WsMsgGroup>>
    where
        S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let mut guard = self.conn.lock().await;
        if let Some(old) = guard.take() {
            old.shutdown().await;
        }

        let (sink, source) = WsSource::new(stream, self.account.cipher()).split();
        let conn = WsConnection::new(sink, source);

        let req_id = self.req_ids.next() as u32;
        match register::register_client(&conn, &self.account, req_id, &self.config.timeouts).await
        {
            Ok(groups) => {
                *guard = Some(conn);
                Ok(groups)
            }
            Err(e) => {
                conn.shutdown().await;
                Err(e)
            }
        }
    }

    async fn ready_conn(&self) -> Result<Arc<WsConnection>> {
        let guard = self.conn.lock().await;
        match &*guard {
            Some(conn) if conn.is_alive() => Ok(conn.clone()),
            _ => Err(Error::Transport(TransportError::NotReady)),
        }
    }
}
