//! The websocket frame cipher: AES-256-ECB with PKCS#7 padding.
//!
//! The 32-byte key is derived once per session with PBKDF2-HMAC-SHA1 over a
//! 36-byte random password (fixed salt, 5 rounds). The password, not the
//! key, is what travels to the server, RSA-wrapped inside the registration
//! frame, so both ends derive the same key independently.
//!
//! Padding is always applied, even to block-aligned payloads: the pad value
//! equals the pad length, so an aligned payload grows by one full block.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use err_derive::Error;
use sha1::Sha1;

/// The AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Length of the random websocket password
pub const WS_PASSWORD_LEN: usize = 36;

const PBKDF2_SALT: [u8; 8] = [0xa4, 0x0b, 0xc8, 0x34, 0xd6, 0x95, 0xf3, 0x13];
const PBKDF2_ROUNDS: u32 = 5;

/// Error raised when a decrypted payload carries invalid padding
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(display = "invalid block padding")]
pub struct PadError;

/// Derives the 32-byte AES key from the session's websocket password
pub fn derive_ws_key(password: &[u8; WS_PASSWORD_LEN]) -> [u8; 32] {
    pbkdf2::pbkdf2_hmac_array::<Sha1, 32>(password, &PBKDF2_SALT, PBKDF2_ROUNDS)
}

/// Appends PKCS#7 padding up to the next block boundary
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

/// Strips PKCS#7 padding, validating every pad byte
pub fn unpad(data: &[u8]) -> Result<&[u8], PadError> {
    let &pad_len = data.last().ok_or(PadError)?;
    let pad_len = pad_len as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(PadError);
    }
    let (rest, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| b as usize != pad_len) {
        return Err(PadError);
    }
    Ok(rest)
}

/// The per-session frame cipher. Keyed once at session start and immutable
/// afterwards, so it is shared freely across tasks.
pub struct WsCipher {
    cipher: Aes256,
}

impl WsCipher {
    /// Builds the cipher from the session's websocket password
    pub fn from_password(password: &[u8; WS_PASSWORD_LEN]) -> Self {
        let key = derive_ws_key(password);
        Self {
            cipher: Aes256::new(GenericArray::from_slice(&key)),
        }
    }

    /// Pads and encrypts a payload
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        let mut buf = pad(data);
        for block in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }
        buf
    }

    /// Decrypts and unpads a payload
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, PadError> {
        if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
            return Err(PadError);
        }
        let mut buf = data.to_vec();
        for block in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }
        let len = unpad(&buf)?.len();
        buf.truncate(len);
        Ok(buf)
    }
}

impl std::fmt::Debug for WsCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WsCipher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_password() -> [u8; WS_PASSWORD_LEN] {
        let mut password = [0u8; WS_PASSWORD_LEN];
        for (i, byte) in password.iter_mut().enumerate() {
            *byte = i as u8;
        }
        password
    }

    #[test]
    fn test_derive_ws_key() {
        // PBKDF2-HMAC-SHA1, salt a40bc834d695f313, 5 rounds, dkLen 32
        let key = derive_ws_key(&test_password());
        assert_eq!(
            key.to_vec(),
            vec![
                0x3b, 0xe3, 0x6e, 0xbb, 0x27, 0x9b, 0x7d, 0x6f, 0xf3, 0x54, 0xec, 0x53, 0x0a,
                0x5c, 0xb0, 0xcc, 0x50, 0x6a, 0x9f, 0x84, 0x9e, 0x00, 0x3a, 0xbd, 0xbf, 0xed,
                0x24, 0xa2, 0xdd, 0x0d, 0x6d, 0x02,
            ]
        );
    }

    #[test]
    fn test_pad_lengths() {
        for len in 0..(3 * BLOCK_SIZE) {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let padded = pad(&data);
            assert_eq!(padded.len() % BLOCK_SIZE, 0, "len {}", len);
            assert!(padded.len() > data.len(), "padding always applied");
            assert_eq!(unpad(&padded).unwrap(), &data[..], "len {}", len);
        }
    }

    #[test]
    fn test_unpad_rejects_garbage() {
        assert_eq!(unpad(&[]), Err(PadError));
        assert_eq!(unpad(&[0u8; 16]), Err(PadError));
        assert_eq!(unpad(&[17u8; 16]), Err(PadError));
        // One corrupt pad byte
        let mut buf = pad(b"abc");
        let wrong = buf.len() - 2;
        buf[wrong] ^= 0xff;
        assert_eq!(unpad(&buf), Err(PadError));
    }

    #[test]
    fn test_cipher_roundtrip() {
        let cipher = WsCipher::from_password(&test_password());
        for len in [0usize, 1, 15, 16, 17, 31, 32, 1000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            let enc = cipher.encrypt(&data);
            assert_eq!(enc.len() % BLOCK_SIZE, 0);
            assert_ne!(enc, data);
            assert_eq!(cipher.decrypt(&enc).unwrap(), data);
        }
    }

    #[test]
    fn test_decrypt_rejects_partial_block() {
        let cipher = WsCipher::from_password(&test_password());
        assert_eq!(cipher.decrypt(&[0u8; 15]), Err(PadError));
    }
}
