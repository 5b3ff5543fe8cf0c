//! The websocket channel's frame format: a 9 byte header followed by the
//! payload.
//!
//! ```text
//! +------+----------------+----------------+---------------------+
//! | flag | cmd (be u32)   | req_id (be u32)| payload ...         |
//! +------+----------------+----------------+---------------------+
//! ```
//!
//! The flag byte carries three bits: 0x80 marks an AES-ECB encrypted
//! payload, 0x40 a gzip compressed one, and 0x08 is always set. On encode
//! the payload is compressed first and encrypted second; decode reverses in
//! strict order (decrypt, then decompress).

/// Contains the structure of the frames
pub mod model;

/// Contains code related to the deserialisation of ws frames
pub mod de;
/// Contains code related to the serialisation of ws frames
pub mod ser;

pub(crate) mod codex;
