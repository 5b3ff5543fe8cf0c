use super::model::*;
use cookie_factory::bytes::{be_u32, be_u8};
use cookie_factory::combinator::slice;
use cookie_factory::sequence::tuple;
use cookie_factory::{gen, GenError};
use err_derive::Error;
use std::io::Write;

/// The error types used during serialisation
#[derive(Debug, Error)]
pub enum Error {
    /// A Cookie Factory GenError
    #[error(display = "Cookie GenError")]
    GenError(#[error(source)] std::sync::Arc<GenError>),
    /// The payload did not compress
    #[error(display = "Compression error")]
    Gzip(#[error(source)] std::io::Error),
}

impl From<GenError> for Error {
    fn from(k: GenError) -> Self {
        Error::GenError(std::sync::Arc::new(k))
    }
}

impl WsFrame {
    /// Serializes the frame, applying compression then encryption as
    /// requested before prepending the header.
    pub(crate) fn serialize<W: Write>(
        &self,
        buf: W,
        context: &WsContext,
        opts: SendOpts,
    ) -> Result<W, Error> {
        let mut flag = FLAG_MARKER;
        let mut payload = self.payload.clone();

        if opts.compress {
            flag |= FLAG_COMPRESS;
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::new(6));
            encoder.write_all(&payload)?;
            payload = encoder.finish()?;
        }
        if opts.encrypt {
            flag |= FLAG_ENCRYPT;
            payload = context.cipher.encrypt(&payload);
        }

        let (buf, _) = gen(
            tuple((
                be_u8(flag),
                be_u32(self.cmd),
                be_u32(self.req_id),
                slice(payload),
            )),
            buf,
        )?;
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::ecb::WsCipher;
    use std::sync::Arc;

    pub(crate) fn test_context() -> WsContext {
        let mut password = [0u8; crate::crypto::ecb::WS_PASSWORD_LEN];
        for (i, byte) in password.iter_mut().enumerate() {
            *byte = (i * 3) as u8;
        }
        WsContext::new(Arc::new(WsCipher::from_password(&password)))
    }

    fn roundtrip(payload: &[u8], opts: SendOpts) {
        let context = test_context();
        let frame = WsFrame {
            cmd: 205001,
            req_id: 1653660000,
            payload: payload.to_vec(),
        };
        let buf = frame.serialize(Vec::new(), &context, opts).unwrap();
        let parsed = WsFrame::deserialize(&context, &buf).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_roundtrip_all_flag_combinations() {
        let payload = b"the quick brown fox jumps over the lazy dog";
        for compress in [false, true] {
            for encrypt in [false, true] {
                roundtrip(payload, SendOpts { compress, encrypt });
            }
        }
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        for compress in [false, true] {
            for encrypt in [false, true] {
                roundtrip(b"", SendOpts { compress, encrypt });
            }
        }
    }

    #[test]
    fn test_roundtrip_block_aligned_payload() {
        // Padding applies even when the payload is already block aligned
        roundtrip(&[7u8; 32], SendOpts { compress: false, encrypt: true });
    }

    #[test]
    fn test_header_layout() {
        let context = test_context();
        let frame = WsFrame {
            cmd: 0x01020304,
            req_id: 0x0a0b0c0d,
            payload: b"x".to_vec(),
        };
        let buf = frame
            .serialize(Vec::new(), &context, SendOpts::plaintext())
            .unwrap();
        assert_eq!(
            buf,
            vec![0x08, 0x01, 0x02, 0x03, 0x04, 0x0a, 0x0b, 0x0c, 0x0d, b'x']
        );
    }
}
