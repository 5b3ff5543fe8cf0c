use super::model::*;
use err_derive::Error;
use nom::error::context as error_context;
use nom::number::complete::{be_u32, be_u8};
use std::io::Read;

type IResult<I, O, E = nom::error::VerboseError<I>> = Result<(I, O), nom::Err<E>>;
type NomErrorType<'a> = nom::error::VerboseError<&'a [u8]>;

/// The error types used during deserialisation
#[derive(Debug, Error)]
pub enum Error {
    /// A Nom parsing error, usually a truncated header
    #[error(display = "Parsing error: {}", _0)]
    NomError(String),
    /// The decrypted payload carried invalid padding
    #[error(display = "Invalid padding")]
    BadPadding(#[error(source)] crate::crypto::ecb::PadError),
    /// The payload did not decompress
    #[error(display = "Decompression error")]
    Gzip(#[error(source)] std::io::Error),
}

impl<'a> From<nom::Err<NomErrorType<'a>>> for Error {
    fn from(k: nom::Err<NomErrorType<'a>>) -> Self {
        let reason = match k {
            nom::Err::Error(e) => format!("Nom Error: {:?}", e),
            nom::Err::Failure(e) => format!("Nom Error: {:?}", e),
            _ => "Unknown Nom error".to_string(),
        };
        Error::NomError(reason)
    }
}

impl WsFrame {
    /// Parses one complete websocket message into a frame, undoing
    /// encryption and compression per the flag bits.
    pub(crate) fn deserialize(context: &WsContext, buf: &[u8]) -> Result<WsFrame, Error> {
        let (payload, (flag, cmd, req_id)) = ws_header(buf)?;

        let payload = if flag & FLAG_ENCRYPT != 0 {
            context.cipher.decrypt(payload)?
        } else {
            payload.to_vec()
        };

        let payload = if flag & FLAG_COMPRESS != 0 {
            let mut decompressed = Vec::new();
            flate2::read::GzDecoder::new(payload.as_slice())
                .read_to_end(&mut decompressed)?;
            decompressed
        } else {
            payload
        };

        Ok(WsFrame {
            cmd,
            req_id,
            payload,
        })
    }
}

fn ws_header(buf: &[u8]) -> IResult<&[u8], (u8, u32, u32)> {
    let (buf, flag) = error_context("Flag missing", be_u8)(buf)?;
    let (buf, cmd) = error_context("Cmd missing", be_u32)(buf)?;
    let (buf, req_id) = error_context("ReqId missing", be_u32)(buf)?;
    // Everything after the 9 byte header is payload
    Ok((buf, (flag, cmd, req_id)))
}

#[cfg(test)]
mod tests {
    use super::super::ser::tests::test_context;
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_short_frame_is_rejected() {
        let context = test_context();
        let e = WsFrame::deserialize(&context, &[0x08, 0x00, 0x00]);
        assert_matches!(e, Err(Error::NomError(_)));
        let e = WsFrame::deserialize(&context, &[]);
        assert_matches!(e, Err(Error::NomError(_)));
    }

    #[test]
    fn test_plaintext_frame() {
        let context = test_context();
        let mut buf = vec![0x08];
        buf.extend_from_slice(&1001u32.to_be_bytes());
        buf.extend_from_slice(&42u32.to_be_bytes());
        buf.extend_from_slice(b"diana");

        let frame = WsFrame::deserialize(&context, &buf).unwrap();
        assert_eq!(frame.cmd, 1001);
        assert_eq!(frame.req_id, 42);
        assert_eq!(frame.payload, b"diana");
    }

    #[test]
    fn test_garbage_ciphertext_is_rejected() {
        let context = test_context();
        let mut buf = vec![0x88];
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        // Not a whole number of cipher blocks
        buf.extend_from_slice(&[0u8; 15]);
        assert_matches!(
            WsFrame::deserialize(&context, &buf),
            Err(Error::BadPadding(_))
        );
    }
}
