//! BDUK derivation and the enuid encoding.
//!
//! A BDUK is the url-safe base64 of the user id AES-CBC-encrypted under a
//! key and IV baked into the official client. It identifies an account to
//! the IM backend without exposing the numeric user id.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

const BDUK_KEY: &[u8; 16] = b"AFD311832EDEEAEF";
const BDUK_IV: &[u8; 16] = b"2011121211143000";

/// Derives the BDUK for a numeric user id rendered in decimal
pub fn bduk_from_user_id(user_id: &str) -> String {
    let encrypted = Aes128CbcEnc::new(BDUK_KEY.into(), BDUK_IV.into())
        .encrypt_padded_vec_mut::<Pkcs7>(user_id.as_bytes());
    URL_SAFE_NO_PAD.encode(encrypted)
}

/// The enuid sent during the BLCP profile exchange.
///
/// The official client derives this from `cuid_galaxy2` inside a
/// closed-source base64 encoder; the plain url-safe encoding stands in for
/// it here.
pub fn enuid(cuid_galaxy2: &str) -> String {
    URL_SAFE_NO_PAD.encode(cuid_galaxy2.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bduk_vector() {
        assert_eq!(bduk_from_user_id("672328094"), "plaDyZeEkNoyvjK1_bmdIw");
        assert_eq!(bduk_from_user_id("hello_cosmic"), "dCH72PEkhjkj1lz6Hcfcog");
    }

    #[test]
    fn test_enuid_deterministic() {
        let cuid2 = "06C7F37D41256F25FABA97B885DB6EFB|VAPUDW7TA";
        assert_eq!(enuid(cuid2), enuid(cuid2));
        assert!(!enuid(cuid2).contains('='));
    }
}
