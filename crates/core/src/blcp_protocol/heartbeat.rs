//! The BLCP heartbeat.
//!
//! Fire-and-forget: no correlation id is registered and no reply awaited.
//! The acknowledgment frames the server sends back are filtered out by the
//! dispatcher. The task runs from the moment the handshake reaches `Ready`
//! and is restarted when a chatroom is joined.

use super::connection::BlcpConnection;
use crate::blcp::model::{BlcpFrame, METHOD_LCM_HEARTBEAT, SERVICE_LCM};
use crate::blcp::proto::{LcmRequest, RpcData};
use crate::correlator::{random_correlation_id, unix_millis};
use log::*;
use prost::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub(crate) fn heartbeat_frame() -> BlcpFrame {
    let correlation_id = random_correlation_id();
    let body = RpcData {
        lcm_request: Some(LcmRequest {
            log_id: correlation_id as i64,
            timestamp: unix_millis(),
            ..Default::default()
        }),
        ..Default::default()
    };
    BlcpFrame::new_request(
        SERVICE_LCM,
        METHOD_LCM_HEARTBEAT,
        correlation_id,
        false,
        body.encode_to_vec(),
    )
}

/// Spawns the heartbeat loop on `conn`
pub(crate) fn start(
    conn: Arc<BlcpConnection>,
    interval: Duration,
    send_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so the cadence starts
        // one interval after Ready
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = conn.send(heartbeat_frame(), send_timeout).await {
                debug!("Heartbeat send failed, stopping: {:?}", e);
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_frame_shape() {
        let frame = heartbeat_frame();
        assert_eq!(
            frame.service_method(),
            (SERVICE_LCM, METHOD_LCM_HEARTBEAT)
        );
        let body = RpcData::decode(&frame.body[..]).unwrap();
        let request = body.lcm_request.unwrap();
        assert_eq!(request.log_id, frame.correlation_id() as i64);
        assert!(request.token.is_empty());
    }
}
