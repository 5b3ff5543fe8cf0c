//! Account credentials and the derived device identity.
//!
//! The long-lived BDUSS credential is supplied by the account owner; this
//! library never generates or refreshes it. Everything else (fingerprints,
//! the websocket password, the frame cipher) derives from seeds exactly
//! once, at construction. Re-deriving with fresh randomness mid-session
//! would present the server with a brand new "device" and trip its trust
//! heuristics, so none of these values can be regenerated on an existing
//! [`Account`].

use crate::crypto::cuid::{c3_aid, cuid_galaxy2};
use crate::crypto::ecb::{WsCipher, WS_PASSWORD_LEN};
use err_derive::Error;
use rand::Rng;
use std::sync::Arc;

const BDUSS_LEN: usize = 192;
const STOKEN_LEN: usize = 64;

/// Error raised when the supplied credentials are malformed
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The BDUSS is not the expected length
    #[error(display = "BDUSS must be {} chars, got {}", BDUSS_LEN, _0)]
    BadBduss(usize),

    /// The STOKEN is not the expected length
    #[error(display = "STOKEN must be {} chars, got {}", STOKEN_LEN, _0)]
    BadStoken(usize),
}

/// The device fingerprint set, computed once from its seeds.
///
/// `android_id` is 16 lowercase hex chars (8 bytes of entropy), `uuid` a
/// standard v4 uuid string. Given the same seeds every derived field is
/// byte-identical, which is what the servers check for.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    android_id: String,
    uuid: String,
    cuid: String,
    cuid_galaxy2: String,
    c3_aid: String,
    client_id: String,
}

impl DeviceIdentity {
    /// Derives the identity from explicit seeds
    pub fn new(android_id: String, uuid: String) -> Self {
        let cuid = format!("baidutiebaapp{}", uuid);
        let cuid_galaxy2 = cuid_galaxy2(&android_id);
        let c3_aid = c3_aid(&android_id, &uuid);
        let client_id = format!(
            "wappc_{}_{:03}",
            crate::correlator::unix_millis(),
            rand::thread_rng().gen_range(0..1000)
        );
        Self {
            android_id,
            uuid,
            cuid,
            cuid_galaxy2,
            c3_aid,
            client_id,
        }
    }

    /// Derives a fresh identity from random seeds
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let android_id: String = format!("{:016x}", rng.gen::<u64>());
        let uuid = format!(
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            rng.gen::<u32>(),
            rng.gen::<u16>(),
            rng.gen::<u16>(),
            rng.gen::<u16>(),
            rng.gen::<u64>() & 0xffff_ffff_ffff
        );
        Self::new(android_id, uuid)
    }

    /// The android id seed
    pub fn android_id(&self) -> &str {
        &self.android_id
    }

    /// The uuid seed
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// The cuid, `baidutiebaapp` + uuid
    pub fn cuid(&self) -> &str {
        &self.cuid
    }

    /// The `cuid_galaxy2` fingerprint
    pub fn cuid_galaxy2(&self) -> &str {
        &self.cuid_galaxy2
    }

    /// The `c3_aid` fingerprint
    pub fn c3_aid(&self) -> &str {
        &self.c3_aid
    }

    /// The wap client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// The account container handed to both channel managers.
///
/// Holds the long-lived credentials, the device identity and the session's
/// frame-cipher material. Created once and shared behind an [`Arc`].
#[derive(Debug)]
pub struct Account {
    bduss: String,
    stoken: String,
    sample_id: String,
    identity: DeviceIdentity,
    ws_password: [u8; WS_PASSWORD_LEN],
    cipher: Arc<WsCipher>,
}

impl Account {
    /// Creates an account with a random device identity.
    ///
    /// `bduss` must be 192 chars; `stoken` is optional (empty) but 64 chars
    /// when present.
    pub fn new(bduss: String, stoken: String) -> Result<Self, CredentialError> {
        Self::with_device(bduss, stoken, DeviceIdentity::random())
    }

    /// Creates an account with a stable, caller-supplied device identity
    pub fn with_device(
        bduss: String,
        stoken: String,
        identity: DeviceIdentity,
    ) -> Result<Self, CredentialError> {
        if !bduss.is_empty() && bduss.len() != BDUSS_LEN {
            return Err(CredentialError::BadBduss(bduss.len()));
        }
        if !stoken.is_empty() && stoken.len() != STOKEN_LEN {
            return Err(CredentialError::BadStoken(stoken.len()));
        }

        let mut ws_password = [0u8; WS_PASSWORD_LEN];
        rand::thread_rng().fill(&mut ws_password[..]);
        let cipher = Arc::new(WsCipher::from_password(&ws_password));

        Ok(Self {
            bduss,
            stoken,
            sample_id: String::new(),
            identity,
            ws_password,
            cipher,
        })
    }

    /// The BDUSS credential
    pub fn bduss(&self) -> &str {
        &self.bduss
    }

    /// The web STOKEN
    pub fn stoken(&self) -> &str {
        &self.stoken
    }

    /// The experiment sample id reported during the profile exchange
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Overrides the experiment sample id
    pub fn set_sample_id(&mut self, sample_id: String) {
        self.sample_id = sample_id;
    }

    /// The device identity
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// The session's websocket password, RSA-wrapped during registration
    pub fn ws_password(&self) -> &[u8; WS_PASSWORD_LEN] {
        &self.ws_password
    }

    /// The session's frame cipher
    pub fn cipher(&self) -> Arc<WsCipher> {
        self.cipher.clone()
    }
}
