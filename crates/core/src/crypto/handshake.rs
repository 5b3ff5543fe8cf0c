//! RSA key transport for the websocket registration.
//!
//! The server ships a fixed 2048-bit public key inside the official client.
//! The session's websocket password is encrypted under it with PKCS#1 v1.5
//! and sent exactly once, in the registration frame; afterwards only the
//! derived AES key is used and the ephemeral RSA ciphertext is never needed
//! again.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lazy_static::lazy_static;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

/// The registration public key, as shipped in the official client (SPKI DER,
/// base64)
const PUBLIC_KEY_B64: &str = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAwQpwBZxXJV/JVRF/uNfyMSdu7YWwRNLM8+2xbniGp2iIQHOikPpTYQjlQgMi1uvq1kZpJ32rHo3hkwjy2l0lFwr3u4Hk2Wk7vnsqYQjAlYlK0TCzjpmiI+OiPOUNVtbWHQiLiVqFtzvpvi4AU7C1iKGvc/4IS45WjHxeScHhnZZ7njS4S1UgNP/GflRIbzgbBhyZ9kEW5/OO5YfG1fy6r4KSlDJw4o/mw5XhftyIpL+5ZBVBC6E1EIiP/dd9AbK62VV1PByfPMHMixpxI3GM2qwcmFsXcCcgvUXJBa9k6zP8dDQ3csCM2QNT+CQAOxthjtp/TFWaD7MzOdsIYb3THwIDAQAB";

lazy_static! {
    static ref PUBLIC_KEY: RsaPublicKey = {
        let der = STANDARD
            .decode(PUBLIC_KEY_B64)
            .expect("embedded key is valid base64");
        RsaPublicKey::from_public_key_der(&der).expect("embedded key is valid SPKI")
    };
}

/// Encrypts the websocket password for transport to the server.
///
/// Randomized PKCS#1 v1.5 padding: two calls yield different ciphertexts for
/// the same password, both of which the server decrypts to the same bytes.
pub fn seal_ws_password(password: &[u8]) -> Vec<u8> {
    PUBLIC_KEY
        .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, password)
        .expect("password is far below the RSA block limit")
}
