//! The BLCP message format: a 4 byte magic, two big-endian lengths, a
//! protobuf metadata section and a body.
//!
//! ```text
//! +-----------+---------------+--------------+------------+-----------+
//! | "lcp\x01" | total_len u32 | meta_len u32 | meta bytes | body ...  |
//! +-----------+---------------+--------------+------------+-----------+
//! ```
//!
//! `total_len` counts everything after the length pair, so
//! `total_len == meta_len + body_len` always holds. The meta section is an
//! [`proto::RpcMeta`]; the body format depends on the target service and
//! method, protobuf for the LCM control plane and JSON for everything else.

/// Contains the structure of the frames
pub mod model;

/// Contains the protobuf messages riding inside the frames
pub mod proto;

/// Contains code related to the deserialisation of BLCP frames
pub mod de;
/// Contains code related to the serialisation of BLCP frames
pub mod ser;

/// Contains the body codec selection
pub mod body;

pub(crate) mod codex;
