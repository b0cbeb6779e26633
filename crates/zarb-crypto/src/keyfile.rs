//! Passphrase-protected keyfile codec: AES-128-CTR encryption of a raw
//! private key, keyed by a scrypt-derived secret. The on-disk shape is a
//! plain JSON document so it can be inspected and backed up like any other
//! config file; only the `ciphertext` field is opaque.

use aes::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use scrypt::Params as ScryptParams;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

type Aes128Ctr = ctr::Ctr64BE<aes::Aes128>;

const SALT_SIZE: usize = 32;
const IV_SIZE: usize = 16;
const MAC_SIZE: usize = 32;
const DERIVED_KEY_SIZE: usize = 32; // first 16 bytes = cipher key, last 16 = mac key

#[derive(Serialize, Deserialize, Clone, Copy)]
struct ScryptConfig {
    log_n: u8,
    r: u32,
    p: u32,
}

impl Default for ScryptConfig {
    fn default() -> Self {
        // N = 2^18, matches the cost geth's default keystore uses.
        ScryptConfig { log_n: 18, r: 8, p: 1 }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct CipherParams {
    #[serde(with = "hex::serde")]
    salt: Vec<u8>,
    #[serde(with = "hex::serde")]
    iv: Vec<u8>,
    #[serde(with = "hex::serde")]
    ciphertext: Vec<u8>,
    #[serde(with = "hex::serde")]
    mac: Vec<u8>,
    scrypt: ScryptConfig,
}

/// A single encrypted private key plus a human-readable label, persisted as
/// JSON. Holds no plaintext key material.
#[derive(Serialize, Deserialize, Clone)]
pub struct Keyfile {
    pub label: String,
    cipher: CipherParams,
}

impl Keyfile {
    /// Encrypt `secret` under `passphrase`, generating a fresh salt and IV.
    pub fn encrypt(label: &str, secret: &[u8], passphrase: &str) -> Result<Self, CryptoError> {
        let mut salt = vec![0u8; SALT_SIZE];
        let mut iv = vec![0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut iv);

        let scrypt_cfg = ScryptConfig::default();
        let derived = derive_key(passphrase, &salt, &scrypt_cfg)?;
        let (cipher_key, mac_key) = derived.split_at(16);

        let mut ciphertext = secret.to_vec();
        let mut cipher = Aes128Ctr::new(cipher_key.into(), iv.as_slice().into());
        cipher.apply_keystream(&mut ciphertext);

        let mac = compute_mac(mac_key, &ciphertext);

        Ok(Keyfile {
            label: label.to_string(),
            cipher: CipherParams {
                salt,
                iv,
                ciphertext,
                mac,
                scrypt: scrypt_cfg,
            },
        })
    }

    /// Decrypt the stored key with `passphrase`, verifying the MAC first so
    /// a wrong passphrase is reported distinctly from corrupted data.
    pub fn decrypt(&self, passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        let derived = derive_key(passphrase, &self.cipher.salt, &self.cipher.scrypt)?;
        let (cipher_key, mac_key) = derived.split_at(16);

        let expected_mac = compute_mac(mac_key, &self.cipher.ciphertext);
        if !constant_time_eq(&expected_mac, &self.cipher.mac) {
            return Err(CryptoError::WrongPassphrase);
        }

        let mut plaintext = self.cipher.ciphertext.clone();
        let mut cipher = Aes128Ctr::new(cipher_key.into(), self.cipher.iv.as_slice().into());
        cipher.apply_keystream(&mut plaintext);
        Ok(plaintext)
    }

    /// Re-encrypt under a new passphrase after verifying the old one.
    pub fn change_passphrase(
        &self,
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> Result<Self, CryptoError> {
        let secret = self.decrypt(old_passphrase)?;
        Keyfile::encrypt(&self.label, &secret, new_passphrase)
    }

    pub fn to_json(&self) -> Result<String, CryptoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn derive_key(passphrase: &str, salt: &[u8], cfg: &ScryptConfig) -> Result<Vec<u8>, CryptoError> {
    let params = ScryptParams::new(cfg.log_n, cfg.r, cfg.p, DERIVED_KEY_SIZE)
        .map_err(|e| CryptoError::MalformedKeyfile(e.to_string()))?;
    let mut out = vec![0u8; DERIVED_KEY_SIZE];
    scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut out)
        .map_err(|e| CryptoError::MalformedKeyfile(e.to_string()))?;
    Ok(out)
}

fn compute_mac(mac_key: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(mac_key.len() + ciphertext.len());
    buf.extend_from_slice(mac_key);
    buf.extend_from_slice(ciphertext);
    blake3::hash(&buf).as_bytes()[..MAC_SIZE].to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}
