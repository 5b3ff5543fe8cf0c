//! Derivation of the `cuid_galaxy2` and `c3_aid` device fingerprints.
//!
//! Both identifiers end in a base32 rendering of a 40-bit "helios" digest:
//! the input is extended in 5-byte steps, alternating CRC32 and XXH32 over
//! everything written so far, with each hash folded into a 40-bit state at a
//! per-round bit offset. The servers recompute nothing; they only check that
//! a device keeps presenting the same strings, which is why callers must
//! cache these rather than re-derive them from fresh seeds.

use sha1::{Digest, Sha1};
use std::hash::Hasher;
use twox_hash::XxHash32;

const CUID2_PREFIX: &[u8] = b"com.baidu";
const CUID3_PREFIX: &[u8] = b"com.helios";

const HELIOS_STEP: usize = 5;
const HELIOS_HASH_SIZE: usize = 5;

fn xxh32(buf: &[u8]) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(buf);
    hasher.finish() as u32
}

/// Folds a 32-bit hash into the 40-bit state at bit offset `start`.
///
/// `flag` selects xor folding; the first round uses and instead.
fn update(sec: &mut u64, hash_val: u32, start: u64, flag: bool) {
    let window = (((1u64 << (start + 32)) - 1) & *sec) >> start;
    let mixed = if flag {
        window ^ u64::from(hash_val)
    } else {
        window & u64::from(hash_val)
    };

    let mut out = *sec;
    for i in 0..32 {
        let op_idx = start + i;
        if mixed & (1u64 << i) != 0 {
            out |= 1u64 << op_idx;
        } else {
            out &= !(1u64 << op_idx);
        }
    }
    *sec = out;
}

fn write_step(sec: u64) -> [u8; HELIOS_STEP] {
    let mut out = [0u8; HELIOS_STEP];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = (sec >> (8 * i)) as u8;
    }
    out
}

/// The 40-bit helios digest of `src`
pub fn helios_hash(src: &[u8]) -> [u8; HELIOS_HASH_SIZE] {
    let mut buffer = src.to_vec();
    buffer.extend_from_slice(&[0xff; HELIOS_STEP]);
    let mut sec: u64 = (1 << 40) - 1;

    update(&mut sec, crc32fast::hash(&buffer), 8, false);
    buffer.extend_from_slice(&write_step(sec));

    update(&mut sec, xxh32(&buffer), 0, true);
    buffer.extend_from_slice(&write_step(sec));

    update(&mut sec, xxh32(&buffer), 1, true);
    buffer.extend_from_slice(&write_step(sec));

    update(&mut sec, crc32fast::hash(&buffer), 7, true);

    write_step(sec)
}

fn base32_nopad(data: &[u8]) -> String {
    base32::encode(base32::Alphabet::RFC4648 { padding: false }, data)
}

/// Derives the `cuid_galaxy2` fingerprint from a 16-char android id.
///
/// Layout: uppercase MD5 hex of `com.baidu` + android id, a `|V` joiner,
/// then the base32 helios digest of the hex part alone.
pub fn cuid_galaxy2(android_id: &str) -> String {
    let mut md5_input = CUID2_PREFIX.to_vec();
    md5_input.extend_from_slice(android_id.as_bytes());
    let md5_hex = format!("{:X}", md5::compute(&md5_input));

    let helios = helios_hash(md5_hex.as_bytes());
    format!("{}|V{}", md5_hex, base32_nopad(&helios))
}

/// Derives the `c3_aid` fingerprint from the android id and uuid seeds.
///
/// Layout: `A00-`, the base32 SHA1 of `com.helios` + android id + uuid,
/// a `-` joiner, then the base32 helios digest of everything so far.
pub fn c3_aid(android_id: &str, uuid: &str) -> String {
    let mut sha1_input = CUID3_PREFIX.to_vec();
    sha1_input.extend_from_slice(android_id.as_bytes());
    sha1_input.extend_from_slice(uuid.as_bytes());
    let sha1 = Sha1::digest(&sha1_input);

    let head = format!("A00-{}-", base32_nopad(&sha1));
    let helios = helios_hash(head.as_bytes());
    format!("{}{}", head, base32_nopad(&helios))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANDROID_ID: &str = "6723280942424242";
    const UUID: &str = "67232809-3407-3442-4207-672346917aaa";

    #[test]
    fn test_cuid_galaxy2() {
        assert_eq!(
            cuid_galaxy2(ANDROID_ID),
            "06C7F37D41256F25FABA97B885DB6EFB|VAPUDW7TA"
        );
    }

    #[test]
    fn test_c3_aid() {
        assert_eq!(
            c3_aid(ANDROID_ID, UUID),
            "A00-OGBA33NRAQASXI6FDZ4YAJFTK75EF4Y5-YVOG764X"
        );
    }

    #[test]
    fn test_deterministic() {
        // Same seeds, same strings, every time
        assert_eq!(cuid_galaxy2(ANDROID_ID), cuid_galaxy2(ANDROID_ID));
        assert_eq!(c3_aid(ANDROID_ID, UUID), c3_aid(ANDROID_ID, UUID));
    }

    #[test]
    fn test_helios_is_five_bytes_and_stable() {
        let a = helios_hash(b"hello_cosmic");
        let b = helios_hash(b"hello_cosmic");
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }
}
