//! Keyed encrypt/decrypt/checksum envelope over the etypes this crate
//! understands. Cipher operations are provided for the two AES etypes;
//! RC4-HMAC participates as a checksum algorithm and key size only.

mod aes;
mod hmac_md5;
mod nfold;

use crate::asn1::constants::{ChecksumType, EncryptionType};
use crate::constants::{AES_BLOCK_SIZE, RC4_KEY_LEN, RFC_PBKDF2_SHA1_ITER};
use crate::error::KrbError;

use self::aes::{checksum_message, decrypt_message, derive_key_from_password, encrypt_message};
use self::aes::AesSize;
use self::hmac_md5::checksum_hmac_md5;
use rand::Rng;
use std::fmt;

/// Length in bytes of the raw key material for an etype, where known.
pub fn key_byte_size(etype: EncryptionType) -> Result<usize, KrbError> {
    match etype {
        EncryptionType::AES128_CTS_HMAC_SHA1_96 => Ok(AesSize::Aes128.key_len()),
        EncryptionType::AES256_CTS_HMAC_SHA1_96 => Ok(AesSize::Aes256.key_len()),
        EncryptionType::RC4_HMAC => Ok(RC4_KEY_LEN),
        _ => Err(KrbError::UnsupportedEncryption),
    }
}

/// The checksum algorithm mandated for an etype's keyed checksums.
pub fn checksum_type_for_etype(etype: EncryptionType) -> Result<ChecksumType, KrbError> {
    match etype {
        EncryptionType::AES128_CTS_HMAC_SHA1_96 => Ok(ChecksumType::HMAC_SHA1_96_AES128),
        EncryptionType::AES256_CTS_HMAC_SHA1_96 => Ok(ChecksumType::HMAC_SHA1_96_AES256),
        EncryptionType::RC4_HMAC => Ok(ChecksumType::KERB_CHECKSUM_HMAC_MD5),
        _ => Err(KrbError::UnsupportedChecksum),
    }
}

fn aes_size(etype: EncryptionType) -> Result<AesSize, KrbError> {
    match etype {
        EncryptionType::AES128_CTS_HMAC_SHA1_96 => Ok(AesSize::Aes128),
        EncryptionType::AES256_CTS_HMAC_SHA1_96 => Ok(AesSize::Aes256),
        _ => Err(KrbError::UnsupportedEncryption),
    }
}

/// A protocol key: raw key material bound to its encryption type.
#[derive(Clone, PartialEq, Eq)]
pub struct KrbKey {
    etype: EncryptionType,
    value: Vec<u8>,
}

impl KrbKey {
    pub fn new(etype: EncryptionType, value: Vec<u8>) -> Result<Self, KrbError> {
        if value.len() != key_byte_size(etype)? {
            return Err(KrbError::InvalidEncryptionKey);
        }
        Ok(KrbKey { etype, value })
    }

    /// Generate fresh random key material of the etype's size, for use as a
    /// session key.
    pub fn random(etype: EncryptionType) -> Result<Self, KrbError> {
        let mut value = vec![0u8; key_byte_size(etype)?];
        rand::rng().fill(value.as_mut_slice());
        Ok(KrbKey { etype, value })
    }

    /// Derive a long term key from a passphrase and salt. `iter_count`
    /// defaults to the RFC 3962 string-to-key parameter of 4096 rounds.
    pub fn from_passphrase(
        etype: EncryptionType,
        passphrase: &[u8],
        salt: &[u8],
        iter_count: Option<u32>,
    ) -> Result<Self, KrbError> {
        let size = aes_size(etype)?;
        let iter_count = iter_count.unwrap_or(RFC_PBKDF2_SHA1_ITER);
        let value = derive_key_from_password(passphrase, salt, iter_count, size)?;
        Ok(KrbKey { etype, value })
    }

    pub fn etype(&self) -> EncryptionType {
        self.etype
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// RFC 3961 encrypt: confounder, CTS ciphertext, truncated HMAC.
    pub fn encrypt(&self, plaintext: &[u8], key_usage: i32) -> Result<Vec<u8>, KrbError> {
        let size = aes_size(self.etype)?;
        let mut confounder = [0u8; AES_BLOCK_SIZE];
        rand::rng().fill(confounder.as_mut_slice());
        encrypt_message(&self.value, size, key_usage, plaintext, confounder)
    }

    /// RFC 3961 decrypt and verify; the confounder is stripped.
    pub fn decrypt(&self, ciphertext: &[u8], key_usage: i32) -> Result<Vec<u8>, KrbError> {
        let size = aes_size(self.etype)?;
        decrypt_message(&self.value, size, key_usage, ciphertext)
    }

    /// Keyed checksum using the etype's own mandatory checksum algorithm.
    pub fn checksum(&self, payload: &[u8], key_usage: i32) -> Result<Vec<u8>, KrbError> {
        keyed_checksum(
            payload,
            self,
            checksum_type_for_etype(self.etype)?,
            key_usage,
        )
    }
}

// Key material never renders through Debug.
impl fmt::Debug for KrbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KrbKey")
            .field("etype", &self.etype)
            .finish_non_exhaustive()
    }
}

/// Compute a keyed checksum of `payload` with an explicitly chosen
/// algorithm. The algorithm does not have to match the key's etype family
/// for the HMAC-MD5 case, which is keyed directly.
pub fn keyed_checksum(
    payload: &[u8],
    key: &KrbKey,
    cktype: ChecksumType,
    key_usage: i32,
) -> Result<Vec<u8>, KrbError> {
    match cktype {
        ChecksumType::HMAC_SHA1_96_AES128 => {
            checksum_message(key.value(), AesSize::Aes128, key_usage, payload)
        }
        ChecksumType::HMAC_SHA1_96_AES256 => {
            checksum_message(key.value(), AesSize::Aes256, key_usage, payload)
        }
        ChecksumType::KERB_CHECKSUM_HMAC_MD5 => {
            checksum_hmac_md5(key.value(), key_usage, payload)
        }
        _ => Err(KrbError::UnsupportedChecksum),
    }
}

/// Constant time equality for checksum comparison.
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
