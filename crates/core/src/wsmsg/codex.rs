//! Pairs the frame format with a session cipher for the connection layer.
//!
//! The websocket transport already delivers whole messages, so unlike the
//! BLCP side there is no `Framed` here; the connection maps each binary
//! message through this codex.

use super::model::{SendOpts, WsContext, WsFrame};
use crate::Result;
use crate::crypto::ecb::WsCipher;
use std::sync::Arc;

pub(crate) struct WsCodex {
    context: WsContext,
}

impl WsCodex {
    pub(crate) fn new(cipher: Arc<WsCipher>) -> Self {
        Self {
            context: WsContext::new(cipher),
        }
    }

    pub(crate) fn encode(&self, frame: &WsFrame, opts: SendOpts) -> Result<Vec<u8>> {
        Ok(frame.serialize(Vec::new(), &self.context, opts)?)
    }

    pub(crate) fn decode(&self, buf: &[u8]) -> Result<WsFrame> {
        Ok(WsFrame::deserialize(&self.context, buf)?)
    }
}
