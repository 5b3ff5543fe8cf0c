//! High level interface for the BLCP channel.
//!
//! BLCP is the raw-socket RPC protocol of the IM backend, spoken over TLS
//! to a fixed host. A connection is only usable after a four-step handshake
//! (token fetch, LCM login, profile exchange, credential exchange); the
//! [`BlcpClient`] drives those steps as an explicit state machine and then
//! keeps the socket alive with a fire-and-forget heartbeat.
//!
//! Reconnection is never automatic: any mid-session failure leaves the
//! client `Disconnected` and the caller decides when to run `connect()`
//! again. `ensure_ready()` is the idempotent form that only does work when
//! the channel is not `Ready`.

use crate::account::Account;
use crate::blcp::model::BlcpFrame;
use crate::config::ClientConfig;
use crate::correlator::random_correlation_id;
use crate::{Error, Result, TransportError};
use log::*;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

mod chatroom;
mod connection;
mod heartbeat;
mod login;
mod token;

pub use connection::BlcpEvent;
pub use chatroom::message_key;
pub(crate) use connection::{BlcpConnection, TlsSource};

/// The IM app id of the Tieba client
pub const CHAT_APPID: u64 = 414766;
/// The host app version reported during login
pub const CHAT_VERSION: &str = "12.68.1.0";
/// The IM SDK version reported during login
pub const CHAT_SDK_VERSION: u64 = 3460016;

pub(crate) const LOGIN_FROM: &str = "1008550l";
pub(crate) const BLCP_HOST: &str = "common.lcs.baidu.com";
pub(crate) const BLCP_PORT: u16 = 443;
pub(crate) const IM_HOST: &str = "pim.baidu.com";

/// The handshake state machine.
///
/// Progress is strictly forward; any failure is terminal for the attempt
/// and resets to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlcpStatus {
    /// No connection
    Disconnected,
    /// Opening TCP + TLS
    Connecting,
    /// Fetching the short-lived LCM token over HTTPS
    AwaitingToken,
    /// LCM login in flight
    LoggingIn,
    /// Secondary login in flight
    ProfileExchange,
    /// Exchanging the long-lived credential for the session identity
    CredentialExchange,
    /// The channel is usable
    Ready,
}

/// The session identity the credential exchange yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// Origin id used when joining rooms
    pub trigger_id: i64,
    /// The account's IM user key
    pub uk: i64,
    /// The account's BDUK
    pub bduk: String,
    /// Server-side login id
    pub login_id: i64,
}

/// This is the primary struct for interacting with the BLCP channel
pub struct BlcpClient {
    account: Arc<Account>,
    config: ClientConfig,
    http: reqwest::Client,
    status: StdMutex<BlcpStatus>,
    session: StdMutex<Option<SessionUser>>,
    conn: Mutex<Option<Arc<BlcpConnection>>>,
    heartbeat: StdMutex<Option<JoinHandle<()>>>,
}

impl BlcpClient {
    /// Creates a client; no connection is opened yet
    pub fn new(account: Arc<Account>, config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeouts.http_read);
        if let Some(url) = &config.proxy.url {
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }
        let http = builder.build()?;

        Ok(Self {
            account,
            config,
            http,
            status: StdMutex::new(BlcpStatus::Disconnected),
            session: StdMutex::new(None),
            conn: Mutex::new(None),
            heartbeat: StdMutex::new(None),
        })
    }

    /// The current handshake state
    pub fn status(&self) -> BlcpStatus {
        *self.status.lock().unwrap()
    }

    fn set_status(&self, status: BlcpStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// The session identity, once `Ready`
    pub fn session(&self) -> Option<SessionUser> {
        self.session.lock().unwrap().clone()
    }

    pub(crate) fn account(&self) -> &Account {
        &self.account
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Opens the socket and runs the whole handshake sequence.
    ///
    /// Every step failure is terminal for this attempt; the client drops
    /// back to `Disconnected` and the caller restarts the sequence.
    pub async fn connect(&self) -> Result<()> {
        self.close().await;
        self.set_status(BlcpStatus::Connecting);

        let result = async {
            let source = tokio::time::timeout(
                self.config.timeouts.connect,
                TlsSource::new(BLCP_HOST, BLCP_PORT),
            )
            .await??;
            let (sink, stream) = source.split();
            let conn = BlcpConnection::new(sink, stream);

            self.set_status(BlcpStatus::AwaitingToken);
            let token = token::generate_lcm_token(
                &self.http,
                self.account.identity().cuid_galaxy2(),
            )
            .await?;

            self.install(conn, &token).await
        }
        .await;

        if result.is_err() {
            self.set_status(BlcpStatus::Disconnected);
        }
        result
    }

    /// Adopts `conn` and drives the login steps on it
    pub(crate) async fn install(&self, conn: Arc<BlcpConnection>, token: &str) -> Result<()> {
        let mut guard = self.conn.lock().await;
        if let Some(old) = guard.take() {
            old.shutdown().await;
        }
        *guard = Some(conn.clone());
        drop(guard);

        let result = self.login_sequence(&conn, token).await;
        if result.is_err() {
            self.stop_heartbeat();
            self.conn.lock().await.take();
            conn.shutdown().await;
            self.set_status(BlcpStatus::Disconnected);
        }
        result
    }

    async fn login_sequence(&self, conn: &Arc<BlcpConnection>, token: &str) -> Result<()> {
        let timeouts = &self.config.timeouts;

        self.set_status(BlcpStatus::LoggingIn);
        login::lcm_login(conn, &self.account, token, timeouts).await?;

        self.set_status(BlcpStatus::ProfileExchange);
        login::profile_login(conn, &self.account, timeouts).await?;

        self.set_status(BlcpStatus::CredentialExchange);
        let session = login::credential_login(conn, &self.account, timeouts).await?;
        debug!("BLCP session established for uk {}", session.uk);
        *self.session.lock().unwrap() = Some(session);

        self.set_status(BlcpStatus::Ready);
        self.restart_heartbeat(conn.clone()).await;
        Ok(())
    }

    /// Connects only when the channel is not already `Ready` with a live
    /// dispatcher. Idempotent.
    pub async fn ensure_ready(&self) -> Result<()> {
        if self.status() == BlcpStatus::Ready {
            let guard = self.conn.lock().await;
            if let Some(conn) = &*guard {
                if conn.is_alive() {
                    return Ok(());
                }
            }
        }
        self.connect().await
    }

    /// Sends a payload to `(service_id, method_id)` and waits for the
    /// matching response body.
    ///
    /// The payload is not inspected; a nonzero RPC error in the response
    /// meta surfaces as [`Error::Server`]. Requires `Ready`.
    pub async fn send(&self, payload: Vec<u8>, service_id: i64, method_id: i64) -> Result<Vec<u8>> {
        let conn = self.ready_conn().await?;
        let correlation_id = random_correlation_id();
        let frame =
            BlcpFrame::new_request(service_id, method_id, correlation_id, false, payload);

        let timeouts = &self.config.timeouts;
        let reply = conn
            .send_and_wait(frame, timeouts.send, timeouts.read)
            .await?;
        if let Some((code, msg)) = reply.response_error() {
            return Err(Error::Server { code, msg });
        }
        Ok(reply.body)
    }

    /// The next server-pushed event, e.g. a chatroom message
    pub async fn next_event(&self) -> Result<BlcpEvent> {
        let conn = self.ready_conn().await?;
        Ok(conn.next_event().await)
    }

    /// Cancels the heartbeat and dispatcher, closes the socket, and
    /// releases every pending request with a cancellation error
    pub async fn close(&self) {
        self.stop_heartbeat();
        if let Some(conn) = self.conn.lock().await.take() {
            conn.shutdown().await;
        }
        *self.session.lock().unwrap() = None;
        self.set_status(BlcpStatus::Disconnected);
    }

    pub(crate) async fn ready_conn(&self) -> Result<Arc<BlcpConnection>> {
        if self.status() != BlcpStatus::Ready {
            return Err(Error::Transport(TransportError::NotReady));
        }
        let guard = self.conn.lock().await;
        match &*guard {
            Some(conn) if conn.is_alive() => Ok(conn.clone()),
            _ => Err(Error::Transport(TransportError::NotReady)),
        }
    }

    pub(crate) async fn restart_heartbeat(&self, conn: Arc<BlcpConnection>) {
        self.stop_heartbeat();
        let handle = heartbeat::start(
            conn,
            self.config.timeouts.heartbeat,
            self.config.timeouts.send,
        );
        *self.heartbeat.lock().unwrap() = Some(handle);
    }

    fn stop_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::connection::BlcpConnection;
    use super::*;
    use crate::blcp::codex::BlcpCodex;
    use crate::blcp::model::*;
    use crate::blcp::proto::*;
    use assert_matches::assert_matches;
    use futures::{SinkExt, StreamExt};
    use prost::Message;
    use serde_json::json;
    use tokio::io::DuplexStream;
    use tokio_util::codec::Framed;

    fn response_frame(correlation_id: u64, service_id: i64, method_id: i64, body: Vec<u8>) -> BlcpFrame {
        BlcpFrame {
            meta: RpcMeta {
                response: Some(RpcResponseMeta {
                    service_id,
                    method_id,
                    log_id: correlation_id as i64,
                    error_code: 0,
                    error_text: "success".to_string(),
                    event_list: vec![],
                }),
                correlation_id: correlation_id as i64,
                ..Default::default()
            },
            body,
        }
    }

    fn notify_frame(service_id: i64, method_id: i64, body: Vec<u8>) -> BlcpFrame {
        BlcpFrame {
            meta: RpcMeta {
                notify: Some(RpcNotifyMeta {
                    service_id,
                    method_id,
                    log_id: 0,
                    event_list: vec![],
                }),
                correlation_id: 0,
                ..Default::default()
            },
            body,
        }
    }

    fn lcm_ok(correlation_id: u64) -> Vec<u8> {
        RpcData {
            lcm_response: Some(LcmResponse {
                log_id: correlation_id as i64,
                error_code: 0,
                error_msg: "success".to_string(),
                next_interval_ms: 5000,
                server_info: String::new(),
            }),
            ..Default::default()
        }
        .encode_to_vec()
    }

    /// A server that walks a client through the whole handshake, echoes
    /// business calls, and pushes one chatroom event after a join
    async fn fake_server(io: DuplexStream, fail_profile: bool) {
        let mut framed = Framed::new(io, BlcpCodex::new());
        while let Some(Ok(frame)) = framed.next().await {
            let (service_id, method_id) = frame.service_method();
            let correlation_id = frame.correlation_id();
            let reply = match (service_id, method_id) {
                (SERVICE_LCM, METHOD_LCM_HEARTBEAT) => continue,
                (SERVICE_LCM, METHOD_LCM_LOGIN) => {
                    response_frame(correlation_id, service_id, method_id, lcm_ok(correlation_id))
                }
                (SERVICE_PROFILE, METHOD_PROFILE_LOGIN) => {
                    let body = if fail_profile {
                        json!({"errno": "110", "errmsg": "sample rejected"})
                    } else {
                        json!({"errno": "0"})
                    };
                    response_frame(
                        correlation_id,
                        service_id,
                        method_id,
                        serde_json::to_vec(&body).unwrap(),
                    )
                }
                (SERVICE_ACCOUNT, METHOD_ACCOUNT_LOGIN) => {
                    let body = json!({
                        "err_code": 0,
                        "trigger_id": [4242i64],
                        "uk": 999i64,
                        "bd_uid": "plaDyZeEkNoyvjK1_bmdIw",
                        "login_id": 7i64,
                    });
                    response_frame(
                        correlation_id,
                        service_id,
                        method_id,
                        serde_json::to_vec(&body).unwrap(),
                    )
                }
                (SERVICE_CHATROOM, METHOD_CHATROOM_JOIN) => {
                    let ok = response_frame(
                        correlation_id,
                        service_id,
                        method_id,
                        serde_json::to_vec(&json!({"err_code": 0})).unwrap(),
                    );
                    framed.send(ok).await.unwrap();
                    // A heartbeat ack (filtered) then a room message
                    framed
                        .send(notify_frame(SERVICE_LCM, METHOD_LCM_HEARTBEAT, vec![]))
                        .await
                        .unwrap();
                    framed
                        .send(notify_frame(
                            SERVICE_CHATROOM,
                            1,
                            serde_json::to_vec(&json!({"content": "hello"})).unwrap(),
                        ))
                        .await
                        .unwrap();
                    continue;
                }
                _ => response_frame(correlation_id, service_id, method_id, frame.body.clone()),
            };
            framed.send(reply).await.unwrap();
        }
    }

    fn test_client() -> BlcpClient {
        let account = Arc::new(crate::account::Account::new(String::new(), String::new()).unwrap());
        BlcpClient::new(account, ClientConfig::default()).unwrap()
    }

    fn duplex_conn() -> (Arc<BlcpConnection>, DuplexStream) {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let framed = Framed::new(client_io, BlcpCodex::new());
        let (sink, stream) = StreamExt::split(framed);
        let conn = BlcpConnection::new(Box::new(sink), Box::new(stream));
        (conn, server_io)
    }

    #[tokio::test]
    async fn test_handshake_reaches_ready() {
        let client = test_client();
        let (conn, server_io) = duplex_conn();
        tokio::spawn(fake_server(server_io, false));

        client.install(conn, "lcm-token").await.unwrap();
        assert_eq!(client.status(), BlcpStatus::Ready);

        let session = client.session().unwrap();
        assert_eq!(session.trigger_id, 4242);
        assert_eq!(session.uk, 999);
        assert_eq!(session.bduk, "plaDyZeEkNoyvjK1_bmdIw");

        // A business call goes through without renegotiating anything
        let reply = client
            .send(b"\"business\"".to_vec(), 9, 9)
            .await
            .unwrap();
        assert_eq!(reply, b"\"business\"");

        client.close().await;
        assert_eq!(client.status(), BlcpStatus::Disconnected);
        assert_eq!(client.session(), None);
    }

    #[tokio::test]
    async fn test_handshake_step_failure_is_terminal() {
        let client = test_client();
        let (conn, server_io) = duplex_conn();
        tokio::spawn(fake_server(server_io, true));

        let e = client.install(conn, "lcm-token").await;
        assert_matches!(
            e,
            Err(Error::Transport(TransportError::Handshake {
                stage: "ProfileExchange",
                ..
            }))
        );
        assert_eq!(client.status(), BlcpStatus::Disconnected);
        // Not ready: sends are refused rather than queued
        assert_matches!(
            client.send(vec![], 9, 9).await,
            Err(Error::Transport(TransportError::NotReady))
        );
    }

    #[tokio::test]
    async fn test_join_chatroom_and_events() {
        let client = test_client();
        let (conn, server_io) = duplex_conn();
        tokio::spawn(fake_server(server_io, false));

        client.install(conn, "lcm-token").await.unwrap();
        // join triggers a push; the heartbeat ack in between is filtered
        client.join_chatroom(8710).await.unwrap();

        let event = client.next_event().await.unwrap();
        let notify = event.meta.notify.as_ref().unwrap();
        assert_eq!(notify.service_id, SERVICE_CHATROOM);
        assert_eq!(event.body, serde_json::to_vec(&json!({"content": "hello"})).unwrap());
    }

    #[tokio::test]
    async fn test_send_requires_ready() {
        let client = test_client();
        assert_matches!(
            client.send(vec![], 1, 1).await,
            Err(Error::Transport(TransportError::NotReady))
        );
        assert_matches!(
            client.next_event().await,
            Err(Error::Transport(TransportError::NotReady))
        );
    }
}
