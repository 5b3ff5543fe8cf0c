use super::model::*;
use cookie_factory::bytes::be_u32;
use cookie_factory::combinator::slice;
use cookie_factory::sequence::tuple;
use cookie_factory::{gen, GenError};
use err_derive::Error;
use prost::Message;
use std::io::Write;

/// The error types used during serialisation
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// A Cookie Factory GenError
    #[error(display = "Cookie GenError")]
    GenError(#[error(source)] std::sync::Arc<GenError>),
}

impl From<GenError> for Error {
    fn from(k: GenError) -> Self {
        Error::GenError(std::sync::Arc::new(k))
    }
}

impl BlcpFrame {
    /// Serializes the frame: magic, the two length words, the protobuf
    /// meta, then the body.
    pub(crate) fn serialize<W: Write>(&self, buf: W) -> Result<W, Error> {
        let meta_buf = self.meta.encode_to_vec();
        let total_len = (meta_buf.len() + self.body.len()) as u32;

        let (buf, _) = gen(
            tuple((
                slice(MAGIC),
                be_u32(total_len),
                be_u32(meta_buf.len() as u32),
                slice(meta_buf),
                slice(&self.body),
            )),
            buf,
        )?;
        Ok(buf)
    }
}
