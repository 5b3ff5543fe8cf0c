//! Cipher, signing and fingerprint primitives.
//!
//! Everything in here is a pure function of its inputs: the fingerprint
//! derivations in [`cuid`] must yield the same strings for the same device
//! seeds on every call (the servers track fingerprint stability), the
//! signatures in [`sign`] are deterministic digests, and the frame cipher in
//! [`ecb`] is keyed once per session.

/// Fingerprint derivation for the `cuid_galaxy2` and `c3_aid` identifiers
pub mod cuid;

/// PKCS#7 padding and the AES-256-ECB frame cipher
pub mod ecb;

/// RSA key transport for the websocket registration
pub mod handshake;

/// MD5 form signing
pub mod sign;

/// The RC4-42 stream transform
pub mod rc4;

/// BDUK derivation and the enuid encoding
pub mod bduk;
