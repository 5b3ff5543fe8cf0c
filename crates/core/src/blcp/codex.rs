//! Create a tokio encoder/decoder for turning an AsyncRead/Write stream
//! into BLCP packets.
//!
//! BlcpCodex is used with a `[tokio_util::codec::Framed]` to form complete
//! packets. Malformed frames are logged and skipped right here, so the
//! framed stream only ever yields well-formed frames or transport errors;
//! a bad frame can never terminate the connection.

use super::de;
use super::model::BlcpFrame;
use crate::{Error, Result};
use bytes::BytesMut;
use log::*;
use tokio_util::codec::{Decoder, Encoder};

pub(crate) struct BlcpCodex {}

impl BlcpCodex {
    pub(crate) fn new() -> Self {
        Self {}
    }
}

impl Encoder<BlcpFrame> for BlcpCodex {
    type Error = Error;

    fn encode(&mut self, item: BlcpFrame, dst: &mut BytesMut) -> Result<()> {
        let buf: Vec<u8> = Default::default();
        let buf = item.serialize(buf)?;
        dst.reserve(buf.len());
        dst.extend_from_slice(buf.as_slice());
        Ok(())
    }
}

impl Decoder for BlcpCodex {
    type Item = BlcpFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match BlcpFrame::deserialize(src) {
                Ok(frame) => return Ok(Some(frame)),
                Err(de::Error::NomIncomplete(_)) => return Ok(None),
                Err(e) => {
                    // deserialize already advanced past the bad bytes
                    error!("Dropping malformed BLCP frame: {:?}", e);
                    continue;
                }
            }
        }
    }
}
