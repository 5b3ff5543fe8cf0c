//! Fetching the short-lived LCM token.
//!
//! A BLCP session cannot log in without this token, obtained out-of-band
//! over HTTPS. The request is authenticated by a deterministic MD5 over
//! appid, cuid, platform and timestamp. A failed fetch is a hard error;
//! an empty token would only push the failure into the login RPC.

use super::{CHAT_APPID, CHAT_VERSION, IM_HOST};
use crate::{Error, Result, TransportError};
use serde_json::json;

pub(crate) fn token_sign(appid: u64, cuid: &str, timestamp_ms: i64) -> String {
    let input = format!("{}{}android{}", appid, cuid, timestamp_ms);
    format!("{:x}", md5::compute(input.as_bytes()))
}

pub(crate) async fn generate_lcm_token(
    http: &reqwest::Client,
    cuid_galaxy2: &str,
) -> Result<String> {
    let timestamp_ms = crate::correlator::unix_millis();
    let body = json!({
        "app_id": CHAT_APPID.to_string(),
        "app_version": CHAT_VERSION,
        "cuid": cuid_galaxy2,
        "device_type": "android",
        "manufacture": "",
        "model_type": "",
        "request_id": timestamp_ms.to_string(),
        "sdk_version": "3460016",
        "sign": token_sign(CHAT_APPID, cuid_galaxy2, timestamp_ms),
        "ts": timestamp_ms,
        "user_key": "",
    });

    let reply: serde_json::Value = http
        .post(format!("https://{}/rest/5.0/generate_lcm_token", IM_HOST))
        .header("User-Agent", "okhttp/3.11.0")
        .json(&body)
        .send()
        .await?
        .json()
        .await?;

    match reply.get("token").and_then(|token| token.as_str()) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(Error::Transport(TransportError::Handshake {
            stage: "AwaitingToken",
            detail: format!("token endpoint answered without a token: {}", reply),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_sign_is_deterministic() {
        let a = token_sign(414766, "06C7F37D41256F25FABA97B885DB6EFB|VAPUDW7TA", 1700000000000);
        let b = token_sign(414766, "06C7F37D41256F25FABA97B885DB6EFB|VAPUDW7TA", 1700000000000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        // Any input change must change the digest
        assert_ne!(
            a,
            token_sign(414766, "06C7F37D41256F25FABA97B885DB6EFB|VAPUDW7TA", 1700000000001)
        );
    }
}
