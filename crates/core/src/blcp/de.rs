use super::model::*;
use super::proto::RpcMeta;
use bytes::{Buf, BytesMut};
use err_derive::Error;
use nom::bytes::streaming::{tag, take, take_until};
use nom::combinator::verify;
use nom::error::context as error_context;
use nom::number::streaming::be_u32;
use prost::Message;

type IResult<I, O, E = nom::error::VerboseError<I>> = Result<(I, O), nom::Err<E>>;
type NomErrorType<'a> = nom::error::VerboseError<&'a [u8]>;

/// The error types used during deserialisation
#[derive(Debug, Error)]
pub enum Error {
    /// A Nom parsing error, usually a malformed frame
    #[error(display = "Parsing error: {}", _0)]
    NomError(String),
    /// More data is needed before a frame can be produced
    #[error(display = "Not enough data, needs at least {} more bytes", _0)]
    NomIncomplete(usize),
    /// The meta section did not decode as RPC metadata
    #[error(display = "Meta decode error")]
    MetaDecode(#[error(source)] prost::DecodeError),
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

fn find_magic(buf: &[u8]) -> Option<usize> {
    buf.windows(MAGIC.len()).position(|window| window == MAGIC)
}

impl BlcpFrame {
    /// Parses one frame out of `src`, advancing past everything consumed.
    ///
    /// Leading garbage is skipped while hunting for the magic. On a
    /// malformed frame the buffer is advanced past the offending bytes
    /// before the error returns, so the caller can simply try again; a
    /// single bad frame never wedges the stream.
    pub(crate) fn deserialize(src: &mut BytesMut) -> Result<BlcpFrame, Error> {
        let (consumed, meta_result, body) = match blcp_raw(&src[..]) {
            Ok((rest, (meta_buf, body_buf))) => {
                let consumed = src.len() - rest.len();
                (consumed, RpcMeta::decode(meta_buf), body_buf.to_vec())
            }
            Err(nom::Err::Incomplete(needed)) => {
                if find_magic(&src[..]).is_none() && src.len() > MAGIC.len() {
                    // Nothing but garbage so far; keep only a possible
                    // magic prefix so the buffer cannot grow unbounded
                    let drop_len = src.len() - (MAGIC.len() - 1);
                    src.advance(drop_len);
                }
                let needed = match needed {
                    nom::Needed::Size(n) => n.get(),
                    nom::Needed::Unknown => 1,
                };
                return Err(Error::NomIncomplete(needed));
            }
            Err(e) => {
                // Malformed length pair: step past this magic and let the
                // next call hunt for the following one
                let err = Error::from(e);
                let skip = match find_magic(&src[..]) {
                    Some(pos) => pos + MAGIC.len(),
                    None => src.len(),
                };
                src.advance(skip);
                return Err(err);
            }
        };

        // The frame region is consumed whether or not the meta decodes;
        // a bad meta must not be re-parsed forever
        src.advance(consumed);
        let meta = meta_result?;
        Ok(BlcpFrame { meta, body })
    }
}

fn blcp_raw(buf: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
    let (buf, _garbage) = take_until(MAGIC)(buf)?;
    let (buf, _magic) = tag(MAGIC)(buf)?;
    let (buf, total_len) = error_context(
        "TotalLen implausible",
        verify(be_u32, |total: &u32| *total <= MAX_FRAME_LEN),
    )(buf)?;
    let (buf, meta_len) = error_context(
        "MetaLen exceeds TotalLen",
        verify(be_u32, move |meta: &u32| *meta <= total_len),
    )(buf)?;
    let (buf, frame_buf) = take(total_len)(buf)?;
    let (meta_buf, body_buf) = frame_buf.split_at(meta_len as usize);
    Ok((buf, (meta_buf, body_buf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sample_frame() -> BlcpFrame {
        BlcpFrame::new_request(SERVICE_LCM, METHOD_LCM_LOGIN, 7777, true, b"body".to_vec())
    }

    #[test]
    fn test_roundtrip() {
        let frame = sample_frame();
        let mut buf = BytesMut::from(&frame.serialize(Vec::new()).unwrap()[..]);
        assert_eq!(BlcpFrame::deserialize(&mut buf).unwrap(), frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_length_invariant() {
        let frame = sample_frame();
        let bytes = frame.serialize(Vec::new()).unwrap();
        let total_len = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        let meta_len = u32::from_be_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(
            total_len as usize,
            meta_len as usize + frame.body.len()
        );
    }

    #[test]
    fn test_incomplete_keeps_buffer() {
        let frame = sample_frame();
        let bytes = frame.serialize(Vec::new()).unwrap();
        let mut buf = BytesMut::from(&bytes[..bytes.len() - 1]);
        assert_matches!(
            BlcpFrame::deserialize(&mut buf),
            Err(Error::NomIncomplete(_))
        );
        // Nothing lost; feeding the last byte completes the frame
        buf.extend_from_slice(&bytes[bytes.len() - 1..]);
        assert_eq!(BlcpFrame::deserialize(&mut buf).unwrap(), frame);
    }

    #[test]
    fn test_garbage_prefix_is_skipped() {
        let frame = sample_frame();
        let mut bytes = b"noise from the wire".to_vec();
        bytes.extend_from_slice(&frame.serialize(Vec::new()).unwrap());
        let mut buf = BytesMut::from(&bytes[..]);
        assert_eq!(BlcpFrame::deserialize(&mut buf).unwrap(), frame);
    }

    #[test]
    fn test_declared_length_exceeding_cap_is_rejected() {
        let frame = sample_frame();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&frame.serialize(Vec::new()).unwrap());

        let mut buf = BytesMut::from(&bytes[..]);
        assert_matches!(BlcpFrame::deserialize(&mut buf), Err(Error::NomError(_)));
        // The reader resynchronizes onto the good frame that follows
        assert_eq!(BlcpFrame::deserialize(&mut buf).unwrap(), frame);
    }

    #[test]
    fn test_meta_len_exceeding_total_len_is_rejected() {
        let frame = sample_frame();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.extend_from_slice(&9u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend_from_slice(&frame.serialize(Vec::new()).unwrap());

        let mut buf = BytesMut::from(&bytes[..]);
        assert_matches!(BlcpFrame::deserialize(&mut buf), Err(Error::NomError(_)));
        assert_eq!(BlcpFrame::deserialize(&mut buf).unwrap(), frame);
    }

    #[test]
    fn test_bad_meta_consumes_frame() {
        // Valid lengths, but the meta section is not protobuf
        let frame = sample_frame();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&[0xff; 6]);
        bytes.extend_from_slice(&frame.serialize(Vec::new()).unwrap());

        let mut buf = BytesMut::from(&bytes[..]);
        assert_matches!(BlcpFrame::deserialize(&mut buf), Err(Error::MetaDecode(_)));
        assert_eq!(BlcpFrame::deserialize(&mut buf).unwrap(), frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_pure_garbage_is_bounded() {
        let mut buf = BytesMut::from(&[0xaau8; 4096][..]);
        assert_matches!(
            BlcpFrame::deserialize(&mut buf),
            Err(Error::NomIncomplete(_))
        );
        // The buffer was trimmed to a potential magic prefix
        assert!(buf.len() < MAGIC.len());
    }
}
