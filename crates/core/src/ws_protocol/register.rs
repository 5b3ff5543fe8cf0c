//! The cmd=1001 client registration handshake.
//!
//! The first frame on a fresh websocket, sent uncompressed and unencrypted
//! because it is what transports the key material: the session's websocket
//! password rides inside, RSA-wrapped under the embedded public key. The
//! server answers with the account's message groups and from then on both
//! ends speak AES.

use super::connection::WsConnection;
use super::MAIN_VERSION;
use crate::account::Account;
use crate::config::TimeoutConfig;
use crate::correlator::unix_millis;
use crate::crypto::handshake::seal_ws_password;
use crate::wsmsg::model::{SendOpts, WsFrame, CMD_REGISTER};
use crate::{Error, ProtocolError, Result};
use prost::Message;

#[derive(Clone, PartialEq, ::prost::Message)]
struct UpdateClientInfoReqData {
    #[prost(string, tag = "1")]
    bduss: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    device: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "3")]
    secret_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "4")]
    stoken: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct UpdateClientInfoReqIdl {
    #[prost(message, optional, tag = "1")]
    data: ::core::option::Option<UpdateClientInfoReqData>,
    #[prost(string, tag = "2")]
    cuid: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct RegisterError {
    #[prost(int32, tag = "1")]
    errorno: i32,
    #[prost(string, tag = "2")]
    errmsg: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct GroupInfo {
    #[prost(int64, tag = "1")]
    group_id: i64,
    #[prost(int32, tag = "2")]
    group_type: i32,
    #[prost(int64, tag = "3")]
    last_msg_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct UpdateClientInfoResData {
    #[prost(message, repeated, tag = "1")]
    group_info: ::prost::alloc::vec::Vec<GroupInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct UpdateClientInfoResIdl {
    #[prost(message, optional, tag = "1")]
    error: ::core::option::Option<RegisterError>,
    #[prost(message, optional, tag = "2")]
    data: ::core::option::Option<UpdateClientInfoResData>,
}

/// A message group the server reported during registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsMsgGroup {
    /// Group id
    pub group_id: i64,
    /// Group kind discriminator
    pub group_type: i32,
    /// The newest message id in the group
    pub last_msg_id: i64,
}

pub(crate) fn pack_register(account: &Account) -> Vec<u8> {
    let identity = account.identity();
    let device = serde_json::json!({
        "cuid": identity.cuid(),
        "_client_version": MAIN_VERSION,
        "_msg_status": "1",
        "cuid_galaxy2": identity.cuid_galaxy2(),
        "_client_type": "2",
        "timestamp": unix_millis().to_string(),
    });

    let req = UpdateClientInfoReqIdl {
        data: Some(UpdateClientInfoReqData {
            bduss: account.bduss().to_string(),
            device: device.to_string(),
            secret_key: seal_ws_password(account.ws_password()),
            stoken: account.stoken().to_string(),
        }),
        cuid: format!("{}|com.baidu.tieba{}", identity.cuid(), MAIN_VERSION),
    };
    req.encode_to_vec()
}

pub(crate) fn parse_register(body: &[u8]) -> Result<Vec<WsMsgGroup>> {
    let res = UpdateClientInfoResIdl::decode(body)
        .map_err(|_| Error::Protocol(ProtocolError::UnexpectedReply("registration reply")))?;

    if let Some(error) = res.error {
        if error.errorno != 0 {
            return Err(Error::Server {
                code: error.errorno,
                msg: error.errmsg,
            });
        }
    }

    let groups = res
        .data
        .map(|data| {
            data.group_info
                .into_iter()
                .map(|info| WsMsgGroup {
                    group_id: info.group_id,
                    group_type: info.group_type,
                    last_msg_id: info.last_msg_id,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(groups)
}

/// Runs the registration exchange on a fresh connection
pub(crate) async fn register_client(
    conn: &WsConnection,
    account: &Account,
    req_id: u32,
    timeouts: &TimeoutConfig,
) -> Result<Vec<WsMsgGroup>> {
    let frame = WsFrame {
        cmd: CMD_REGISTER,
        req_id,
        payload: pack_register(account),
    };
    let reply = conn
        .send_and_wait(frame, SendOpts::plaintext(), timeouts.send, timeouts.read)
        .await?;
    parse_register(&reply.payload)
}
