use super::proto::{EventTimestamp, RpcMeta, RpcRequestMeta};
use crate::correlator::unix_millis;

pub(crate) const MAGIC: &[u8] = b"lcp\x01";

/// Frames larger than this are treated as corruption, not data
pub(crate) const MAX_FRAME_LEN: u32 = 8 * 1024 * 1024;

/// The LCM control plane service
pub const SERVICE_LCM: i64 = 1;
/// LCM login
pub const METHOD_LCM_LOGIN: i64 = 1;
/// LCM heartbeat
pub const METHOD_LCM_HEARTBEAT: i64 = 3;

/// The account service
pub const SERVICE_ACCOUNT: i64 = 2;
/// Credential exchange: long-lived credential for session identity
pub const METHOD_ACCOUNT_LOGIN: i64 = 50;

/// The chatroom service
pub const SERVICE_CHATROOM: i64 = 3;
/// Join a chatroom
pub const METHOD_CHATROOM_JOIN: i64 = 201;

/// The profile service
pub const SERVICE_PROFILE: i64 = 4;
/// Secondary login reporting client parameters
pub const METHOD_PROFILE_LOGIN: i64 = 1;

/// One frame of the BLCP channel
#[derive(Debug, Clone, PartialEq)]
pub struct BlcpFrame {
    /// The RPC metadata section
    pub meta: RpcMeta,
    /// The body, interpreted per service/method
    pub body: Vec<u8>,
}

impl BlcpFrame {
    /// Convenience function that constructs a request frame with the usual
    /// metadata: the correlation id mirrored into the log id, a
    /// `CLCPReqBegin` trace event, and gzip accepted on the way back.
    pub fn new_request(
        service_id: i64,
        method_id: i64,
        correlation_id: u64,
        need_common: bool,
        body: Vec<u8>,
    ) -> BlcpFrame {
        let meta = RpcMeta {
            request: Some(RpcRequestMeta {
                service_id,
                method_id,
                log_id: correlation_id as i64,
                need_common: need_common as i32,
                event_list: vec![EventTimestamp {
                    event: "CLCPReqBegin".to_string(),
                    timestamp_ms: unix_millis(),
                }],
            }),
            response: None,
            compress_type: Some(0),
            correlation_id: correlation_id as i64,
            attachment_size: 0,
            chunk_info: None,
            authentication_data: Vec::new(),
            notify: None,
            accept_compress_type: 1,
        };
        BlcpFrame { meta, body }
    }

    /// The correlation tag of this frame
    pub fn correlation_id(&self) -> u64 {
        self.meta.correlation_id as u64
    }

    /// The (service, method) pair, from whichever meta section is present
    pub fn service_method(&self) -> (i64, i64) {
        if let Some(response) = &self.meta.response {
            (response.service_id, response.method_id)
        } else if let Some(notify) = &self.meta.notify {
            (notify.service_id, notify.method_id)
        } else if let Some(request) = &self.meta.request {
            (request.service_id, request.method_id)
        } else {
            (0, 0)
        }
    }

    /// Whether the server pushed this frame rather than answering a request
    pub fn is_notify(&self) -> bool {
        self.meta.notify.is_some()
    }

    /// Whether this frame acknowledges a heartbeat.
    ///
    /// Heartbeats are fire-and-forget; their acknowledgments are filtered
    /// out of the event queue rather than delivered.
    pub fn is_heartbeat_ack(&self) -> bool {
        let (service_id, method_id) = self.service_method();
        service_id == SERVICE_LCM && method_id == METHOD_LCM_HEARTBEAT
    }

    /// The business error carried in the response meta, if any
    pub fn response_error(&self) -> Option<(i32, String)> {
        let response = self.meta.response.as_ref()?;
        if response.error_code != 0 || (!response.error_text.is_empty() && response.error_text != "success") {
            Some((response.error_code, response.error_text.clone()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::proto::RpcNotifyMeta;
    use super::*;

    fn notify_frame(service_id: i64, method_id: i64) -> BlcpFrame {
        BlcpFrame {
            meta: RpcMeta {
                notify: Some(RpcNotifyMeta {
                    service_id,
                    method_id,
                    log_id: 0,
                    event_list: vec![],
                }),
                correlation_id: 1,
                ..Default::default()
            },
            body: vec![],
        }
    }

    #[test]
    fn test_request_meta() {
        let frame = BlcpFrame::new_request(SERVICE_LCM, METHOD_LCM_LOGIN, 42, true, vec![1, 2]);
        assert_eq!(frame.correlation_id(), 42);
        assert_eq!(frame.service_method(), (SERVICE_LCM, METHOD_LCM_LOGIN));
        let request = frame.meta.request.as_ref().unwrap();
        assert_eq!(request.log_id, 42);
        assert_eq!(request.need_common, 1);
        assert_eq!(request.event_list[0].event, "CLCPReqBegin");
        assert!(!frame.is_notify());
    }

    #[test]
    fn test_heartbeat_ack_is_filtered() {
        assert!(notify_frame(SERVICE_LCM, METHOD_LCM_HEARTBEAT).is_heartbeat_ack());
        assert!(!notify_frame(SERVICE_CHATROOM, 1).is_heartbeat_ack());
        assert!(notify_frame(SERVICE_CHATROOM, 1).is_notify());
    }

    #[test]
    fn test_response_error() {
        let mut frame = BlcpFrame::new_request(1, 1, 1, false, vec![]);
        frame.meta.request = None;
        frame.meta.response = Some(super::super::proto::RpcResponseMeta {
            service_id: 1,
            method_id: 1,
            log_id: 1,
            error_code: 0,
            error_text: "success".to_string(),
            event_list: vec![],
        });
        assert_eq!(frame.response_error(), None);

        frame.meta.response.as_mut().unwrap().error_code = 110;
        frame.meta.response.as_mut().unwrap().error_text = "token expired".to_string();
        assert_eq!(
            frame.response_error(),
            Some((110, "token expired".to_string()))
        );
    }
}
