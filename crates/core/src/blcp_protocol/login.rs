//! The three RPC steps of the BLCP handshake.
//!
//! Each step sends one request and checks one reply. The first failure is
//! terminal for the whole attempt: there is no per-step retry, the caller
//! restarts the sequence from `connect()`.

use super::connection::BlcpConnection;
use super::{SessionUser, CHAT_APPID, CHAT_SDK_VERSION, CHAT_VERSION, LOGIN_FROM};
use crate::account::Account;
use crate::blcp::body::{decode_body, LcmBody};
use crate::blcp::model::*;
use crate::blcp::proto::{LcmCommon, LcmRequest, RpcData};
use crate::config::TimeoutConfig;
use crate::correlator::{random_correlation_id, unix_millis};
use crate::crypto::bduk::enuid;
use crate::{Error, Result, TransportError};
use prost::Message;
use serde::Deserialize;
use serde_json::json;

fn handshake_error(stage: &'static str, detail: impl Into<String>) -> Error {
    Error::Transport(TransportError::Handshake {
        stage,
        detail: detail.into(),
    })
}

/// Checks the RPC-level response meta before a step looks at its body
fn check_rpc(reply: &BlcpFrame) -> Result<()> {
    if let Some((code, msg)) = reply.response_error() {
        return Err(Error::Server { code, msg });
    }
    Ok(())
}

async fn exchange(
    conn: &BlcpConnection,
    frame: BlcpFrame,
    timeouts: &TimeoutConfig,
) -> Result<BlcpFrame> {
    let reply = conn
        .send_and_wait(frame, timeouts.send, timeouts.read)
        .await?;
    check_rpc(&reply)?;
    Ok(reply)
}

/// Step one: the LCM login carrying the short-lived token
pub(crate) async fn lcm_login(
    conn: &BlcpConnection,
    account: &Account,
    token: &str,
    timeouts: &TimeoutConfig,
) -> Result<()> {
    let correlation_id = random_correlation_id();
    let body = RpcData {
        lcm_request: Some(LcmRequest {
            log_id: correlation_id as i64,
            token: token.to_string(),
            common: Some(LcmCommon {
                cuid: account.identity().cuid_galaxy2().to_string(),
                device: "android".to_string(),
                app_id: CHAT_APPID.to_string(),
                app_version: CHAT_VERSION.to_string(),
                sdk_version: CHAT_SDK_VERSION.to_string(),
                network: "wifi".to_string(),
                ..Default::default()
            }),
            timestamp: unix_millis(),
            action: 0,
            start_type: -1,
            conn_type: 1,
        }),
        ..Default::default()
    };
    let frame = BlcpFrame::new_request(
        SERVICE_LCM,
        METHOD_LCM_LOGIN,
        correlation_id,
        true,
        body.encode_to_vec(),
    );

    let reply = exchange(conn, frame, timeouts).await?;
    match decode_body(&reply.meta, &reply.body)? {
        LcmBody::Proto(RpcData {
            lcm_response: Some(response),
            ..
        }) => {
            if response.error_code != 0 || response.error_msg != "success" {
                return Err(Error::Server {
                    code: response.error_code,
                    msg: response.error_msg,
                });
            }
            Ok(())
        }
        _ => Err(handshake_error(
            "LoggingIn",
            "expected an LCM response envelope",
        )),
    }
}

/// Step two: the secondary login reporting client parameters
pub(crate) async fn profile_login(
    conn: &BlcpConnection,
    account: &Account,
    timeouts: &TimeoutConfig,
) -> Result<()> {
    let identity = account.identity();
    let ua = format!("900_1600_android_{}_240", CHAT_VERSION);
    let body = json!({
        "params": {
            "appname": "tieba",
            "sid": account.sample_id(),
            "ua": ua,
            "uid": enuid(identity.cuid_galaxy2()),
            "cfrom": LOGIN_FROM,
            "from": LOGIN_FROM,
            "network": "1_-1",
            "p_sv": "32",
            "mps": "",
            "mpv": "1",
            "c3_aid": identity.c3_aid(),
            "type_id": "0",
        },
        "filter": {
            "aps": {"cpu_abi": "armeabi-v7a"},
            "command": {"step": "0"},
        },
    });

    let correlation_id = random_correlation_id();
    let frame = BlcpFrame::new_request(
        SERVICE_PROFILE,
        METHOD_PROFILE_LOGIN,
        correlation_id,
        false,
        serde_json::to_vec(&body).expect("static json"),
    );

    let reply = exchange(conn, frame, timeouts).await?;
    let reply = match decode_body(&reply.meta, &reply.body)? {
        LcmBody::Json(reply) => reply,
        LcmBody::Proto(_) => {
            return Err(handshake_error("ProfileExchange", "expected a JSON body"))
        }
    };
    let parsed: ProfileReply = serde_json::from_value(reply.clone())
        .map_err(|_| handshake_error("ProfileExchange", format!("unrecognized reply: {}", reply)))?;
    if parsed.errno != "0" {
        return Err(handshake_error(
            "ProfileExchange",
            format!("profile login refused: {}", reply),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ProfileReply {
    errno: String,
}

/// Step three: exchange the long-lived credential for the session identity
pub(crate) async fn credential_login(
    conn: &BlcpConnection,
    account: &Account,
    timeouts: &TimeoutConfig,
) -> Result<SessionUser> {
    let identity = account.identity();
    let client_identifier = json!({"zid": "", "version_code": ""});
    let body = json!({
        "method": METHOD_ACCOUNT_LOGIN,
        "appid": CHAT_APPID,
        "device_id": format!("android_{}", identity.cuid_galaxy2()),
        "account_type": 1,
        "token": account.bduss(),
        "version": 4,
        "sdk_version": CHAT_SDK_VERSION,
        "app_version": CHAT_VERSION,
        "app_open_type": 0,
        "client_identifier": client_identifier.to_string(),
        "tail": 0,
        "timeout": 10,
        "cookie": "",
        "device_info": {
            "app_version": CHAT_VERSION,
            "os_version": "32",
            "platform": "android",
            "appid": CHAT_APPID.to_string(),
            "from": LOGIN_FROM,
            "cfrom": LOGIN_FROM,
        },
        "rpc": json!({"rpc_retry_time": 0}).to_string(),
        "user_type": 0,
        "client_logid": unix_millis() * 1000,
    });

    let correlation_id = random_correlation_id();
    let frame = BlcpFrame::new_request(
        SERVICE_ACCOUNT,
        METHOD_ACCOUNT_LOGIN,
        correlation_id,
        false,
        serde_json::to_vec(&body).expect("static json"),
    );

    let reply = exchange(conn, frame, timeouts).await?;
    let reply = match decode_body(&reply.meta, &reply.body)? {
        LcmBody::Json(reply) => reply,
        LcmBody::Proto(_) => {
            return Err(handshake_error("CredentialExchange", "expected a JSON body"))
        }
    };
    let parsed: CredentialReply = serde_json::from_value(reply.clone()).map_err(|_| {
        handshake_error(
            "CredentialExchange",
            format!("unrecognized reply: {}", reply),
        )
    })?;

    if parsed.err_code != 0 {
        return Err(handshake_error(
            "CredentialExchange",
            format!("credential exchange refused: {}", reply),
        ));
    }
    let trigger_id = *parsed.trigger_id.first().ok_or_else(|| {
        handshake_error(
            "CredentialExchange",
            format!("session identity missing from reply: {}", reply),
        )
    })?;

    Ok(SessionUser {
        trigger_id,
        uk: parsed.uk,
        bduk: parsed.bd_uid,
        login_id: parsed.login_id,
    })
}

#[derive(Debug, Deserialize)]
struct CredentialReply {
    err_code: i64,
    #[serde(default)]
    trigger_id: Vec<i64>,
    #[serde(default)]
    uk: i64,
    #[serde(default)]
    bd_uid: String,
    #[serde(default)]
    login_id: i64,
}
