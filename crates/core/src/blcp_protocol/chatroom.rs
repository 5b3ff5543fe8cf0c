//! Chatroom membership.
//!
//! Joining a room is a normal correlated RPC with a freshly generated
//! message key. On success the client does a best-effort fetch of the
//! room's recent history over HTTPS (failures are swallowed, the room is
//! joined either way) and (re)starts the heartbeat task.

use super::{BlcpClient, CHAT_APPID, CHAT_SDK_VERSION, CHAT_VERSION, IM_HOST};
use crate::blcp::body::{decode_body, LcmBody};
use crate::blcp::model::{BlcpFrame, METHOD_CHATROOM_JOIN, SERVICE_CHATROOM};
use crate::correlator::{random_correlation_id, unix_millis};
use crate::crypto::sign::sign_sorted;
use crate::{Error, Result, TransportError};
use log::*;
use rand::Rng;
use serde_json::json;

/// A fresh message key for a join request
pub(crate) fn fresh_msg_key() -> String {
    format!("k{}", unix_millis() * 100)
}

/// The message key attached to an outgoing chatroom message
pub fn message_key(bduk: &str) -> String {
    format!(
        "{}{}{}",
        bduk,
        unix_millis() * 1000,
        rand::thread_rng().gen::<i64>()
    )
}

/// Signs a JSON object in place with the IM REST `sign` parameter
fn signed(mut body: serde_json::Value) -> serde_json::Value {
    let sign = sign_sorted(body.as_object().expect("params are an object"));
    body["sign"] = json!(sign);
    body
}

impl BlcpClient {
    /// Joins a chatroom.
    ///
    /// Requires `Ready`. On success the recent history is fetched
    /// best-effort and the heartbeat task restarts.
    pub async fn join_chatroom(&self, chatroom_id: i64) -> Result<()> {
        let conn = self.ready_conn().await?;
        let session = self
            .session()
            .ok_or(Error::Transport(TransportError::NotReady))?;

        let body = json!({
            "method": METHOD_CHATROOM_JOIN,
            "mcast_id": chatroom_id,
            "appid": CHAT_APPID,
            "uk": session.uk,
            "origin_id": session.trigger_id,
            "msg_key": fresh_msg_key(),
            "sdk_version": CHAT_SDK_VERSION,
            "is_reliable": false,
            "client_logid": unix_millis() * 1000,
            "rpc": json!({"rpc_retry_time": 0}).to_string(),
        });

        let correlation_id = random_correlation_id();
        let frame = BlcpFrame::new_request(
            SERVICE_CHATROOM,
            METHOD_CHATROOM_JOIN,
            correlation_id,
            false,
            serde_json::to_vec(&body).expect("static json"),
        );

        let timeouts = &self.config().timeouts;
        let reply = conn
            .send_and_wait(frame, timeouts.send, timeouts.read)
            .await?;
        if let Some((code, msg)) = reply.response_error() {
            return Err(Error::Server { code, msg });
        }
        match decode_body(&reply.meta, &reply.body)? {
            LcmBody::Json(reply)
                if reply.get("err_code").and_then(|code| code.as_i64()) == Some(0) => {}
            LcmBody::Json(reply) => {
                let code = reply
                    .get("err_code")
                    .and_then(|code| code.as_i64())
                    .unwrap_or(-1) as i32;
                let msg = reply
                    .get("err_msg")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or("join refused")
                    .to_string();
                return Err(Error::Server { code, msg });
            }
            LcmBody::Proto(_) => {
                return Err(Error::Protocol(crate::ProtocolError::UnexpectedReply(
                    "join reply was not JSON",
                )))
            }
        }

        // The room is joined; history is nice to have but not load-bearing
        if let Err(e) = self.fetch_mcast_msg(chatroom_id).await {
            debug!("Historical message fetch failed: {:?}", e);
        }

        self.restart_heartbeat(conn).await;
        Ok(())
    }

    /// Fetches the recent history of a chatroom over HTTPS
    pub async fn fetch_mcast_msg(&self, room_id: i64) -> Result<serde_json::Value> {
        let identity = self.account().identity();
        let ext_info = json!({
            "last_callback_msg_id": 0, "cast_id": 0, "local_ts": 0, "latest_msg_id": 0,
        });
        let body = signed(json!({
            "appid": CHAT_APPID,
            "mcast_id": room_id,
            "msgid_begin": 0,
            "msgid_end": i64::MAX,
            "count": -60,
            "category": 4,
            "app_version": CHAT_VERSION,
            "sdk_version": CHAT_SDK_VERSION,
            "device_id": identity.cuid_galaxy2(),
            "device_type": 2,
            "from_action": 1,
            "ext_info": ext_info.to_string(),
            "timestamp": unix_millis() / 1000,
            "account_type": 1,
        }));

        self.im_rest_call("/rest/3.0/im/fetch_mcast_msg_client", &body)
            .await
    }

    /// Announces chatroom entry over HTTPS, as the official client does
    pub async fn enter_chatroom(&self, room_id: i64) -> Result<serde_json::Value> {
        let identity = self.account().identity();
        let body = signed(json!({
            "appid": CHAT_APPID,
            "room_id": room_id,
            "app_version": CHAT_VERSION,
            "cuid": identity.cuid_galaxy2(),
            "device_id": identity.cuid_galaxy2(),
            "sdk_version": CHAT_SDK_VERSION,
            "timestamp": unix_millis() / 1000,
            "account_type": 1,
        }));

        self.im_rest_call("/rest/3.0/im/chatroom/enter_chatroom_client", &body)
            .await
    }

    /// Lists the account's joined chat groups over HTTPS.
    ///
    /// This endpoint predates the signed-JSON ones: the body is a form and
    /// the signature is MD5 over timestamp, BDUSS and appid concatenated.
    pub async fn get_joined_groups(&self) -> Result<serde_json::Value> {
        let timestamp = unix_millis() / 1000;
        let sign = format!(
            "{:x}",
            md5::compute(format!("{}{}{}", timestamp, self.account().bduss(), CHAT_APPID))
        );
        let form = [
            ("method", "get_joined_groups".to_string()),
            ("appid", CHAT_APPID.to_string()),
            ("timestamp", timestamp.to_string()),
            ("sign", sign),
        ];

        let reply = self
            .http()
            .post(format!("https://{}/rest/2.0/im/groupchat", IM_HOST))
            .header("User-Agent", "okhttp/3.11.0")
            .header("Cookie", format!("BDUSS={}", self.account().bduss()))
            .form(&form)
            .send()
            .await?
            .json()
            .await?;
        Ok(reply)
    }

    async fn im_rest_call(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let reply = self
            .http()
            .post(format!("https://{}{}", IM_HOST, path))
            .header("User-Agent", "okhttp/3.11.0")
            .header("Cookie", format!("BDUSS={}", self.account().bduss()))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_msg_key_shape() {
        let key = fresh_msg_key();
        assert!(key.starts_with('k'));
        assert!(key.len() > 10);
    }

    #[test]
    fn test_signed_adds_sign() {
        let body = signed(json!({"appid": CHAT_APPID, "room_id": 42}));
        let sign = body["sign"].as_str().unwrap();
        assert_eq!(sign.len(), 32);
    }

    #[test]
    fn test_message_key_contains_bduk() {
        assert!(message_key("plaDyZeEkNoyvjK1_bmdIw").starts_with("plaDyZeEkNoyvjK1_bmdIw"));
    }
}
