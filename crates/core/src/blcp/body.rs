//! Body codec selection.
//!
//! Which body format a frame carries is a static property of the service
//! and method it addresses (the LCM control plane speaks the protobuf
//! [`RpcData`] envelope, everything else speaks JSON), so the choice is a
//! lookup, not a parse-and-see cascade. Compression is equally explicit:
//! a body is gunzipped exactly when the frame meta says so.

use super::model::SERVICE_LCM;
use super::proto::{RpcData, RpcMeta};
use err_derive::Error;
use prost::Message;
use std::io::Read;

/// gzip, per `compress_type`/`accept_compress_type`
const COMPRESS_GZIP: i32 = 1;

/// The wire format of a frame body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyCodec {
    /// The protobuf [`RpcData`] envelope
    LcmProto,
    /// Plain JSON
    Json,
}

/// A decoded frame body
#[derive(Debug, Clone, PartialEq)]
pub enum LcmBody {
    /// An LCM control-plane envelope
    Proto(RpcData),
    /// A JSON document
    Json(serde_json::Value),
}

/// The error types used during body decoding
#[derive(Debug, Error)]
pub enum Error {
    /// The body did not decode as an LCM envelope
    #[error(display = "Proto body decode error")]
    Proto(#[error(source)] prost::DecodeError),
    /// The body did not parse as JSON
    #[error(display = "Json body decode error")]
    Json(#[error(source)] serde_json::Error),
    /// The body did not decompress
    #[error(display = "Decompression error")]
    Gzip(#[error(source)] std::io::Error),
}

/// The codec for a given service/method pair
pub fn body_codec(service_id: i64, _method_id: i64) -> BodyCodec {
    match service_id {
        SERVICE_LCM => BodyCodec::LcmProto,
        _ => BodyCodec::Json,
    }
}

/// Decodes a frame body per the codec table and the meta's compression
pub fn decode_body(meta: &RpcMeta, body: &[u8]) -> Result<LcmBody, Error> {
    let decompressed;
    let body = if meta.compress_type == Some(COMPRESS_GZIP) {
        let mut buf = Vec::new();
        flate2::read::GzDecoder::new(body)
            .read_to_end(&mut buf)
            .map_err(Error::Gzip)?;
        decompressed = buf;
        &decompressed[..]
    } else {
        body
    };

    let (service_id, method_id) = meta_ids(meta);
    match body_codec(service_id, method_id) {
        BodyCodec::LcmProto => Ok(LcmBody::Proto(RpcData::decode(body)?)),
        BodyCodec::Json => Ok(LcmBody::Json(serde_json::from_slice(body)?)),
    }
}

fn meta_ids(meta: &RpcMeta) -> (i64, i64) {
    if let Some(response) = &meta.response {
        (response.service_id, response.method_id)
    } else if let Some(notify) = &meta.notify {
        (notify.service_id, notify.method_id)
    } else if let Some(request) = &meta.request {
        (request.service_id, request.method_id)
    } else {
        (0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::model::*;
    use super::super::proto::*;
    use super::*;
    use std::io::Write;

    #[test]
    fn test_codec_table() {
        assert_eq!(body_codec(SERVICE_LCM, METHOD_LCM_LOGIN), BodyCodec::LcmProto);
        assert_eq!(body_codec(SERVICE_LCM, METHOD_LCM_HEARTBEAT), BodyCodec::LcmProto);
        assert_eq!(body_codec(SERVICE_ACCOUNT, METHOD_ACCOUNT_LOGIN), BodyCodec::Json);
        assert_eq!(body_codec(SERVICE_CHATROOM, METHOD_CHATROOM_JOIN), BodyCodec::Json);
        assert_eq!(body_codec(SERVICE_PROFILE, METHOD_PROFILE_LOGIN), BodyCodec::Json);
    }

    fn response_meta(service_id: i64, method_id: i64) -> RpcMeta {
        RpcMeta {
            response: Some(RpcResponseMeta {
                service_id,
                method_id,
                log_id: 1,
                error_code: 0,
                error_text: "success".to_string(),
                event_list: vec![],
            }),
            correlation_id: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_proto_body() {
        let envelope = RpcData {
            lcm_response: Some(LcmResponse {
                log_id: 1,
                error_code: 0,
                error_msg: "success".to_string(),
                next_interval_ms: 5000,
                server_info: String::new(),
            }),
            ..Default::default()
        };
        let meta = response_meta(SERVICE_LCM, METHOD_LCM_LOGIN);
        let decoded = decode_body(&meta, &envelope.encode_to_vec()).unwrap();
        assert_eq!(decoded, LcmBody::Proto(envelope));
    }

    #[test]
    fn test_decode_json_body() {
        let meta = response_meta(SERVICE_ACCOUNT, METHOD_ACCOUNT_LOGIN);
        let decoded = decode_body(&meta, br#"{"err_code":0}"#).unwrap();
        assert_eq!(
            decoded,
            LcmBody::Json(serde_json::json!({"err_code": 0}))
        );
    }

    #[test]
    fn test_decode_gzipped_json_body() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(br#"{"err_code":0}"#).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut meta = response_meta(SERVICE_ACCOUNT, METHOD_ACCOUNT_LOGIN);
        meta.compress_type = Some(COMPRESS_GZIP);
        let decoded = decode_body(&meta, &compressed).unwrap();
        assert_eq!(decoded, LcmBody::Json(serde_json::json!({"err_code": 0})));
    }

    #[test]
    fn test_undecodable_body_is_an_error() {
        let meta = response_meta(SERVICE_ACCOUNT, METHOD_ACCOUNT_LOGIN);
        assert!(decode_body(&meta, b"not json at all").is_err());
    }
}
