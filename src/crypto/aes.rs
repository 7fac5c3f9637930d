//! AES-CTS-HMAC-SHA1-96 for both key sizes, per the RFC 3961 simplified
//! profile with the RFC 3962 AES parameters.

use crate::constants::{
    AES_128_KEY_LEN, AES_256_KEY_LEN, AES_BLOCK_SIZE, AES_MAC_SIZE, KERBEROS_WELL_KNOWN,
};
use crate::error::KrbError;

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

type HmacSha1 = Hmac<Sha1>;

const IV_ZERO: [u8; AES_BLOCK_SIZE] = [0u8; AES_BLOCK_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AesSize {
    Aes128,
    Aes256,
}

impl AesSize {
    pub(crate) fn key_len(self) -> usize {
        match self {
            AesSize::Aes128 => AES_128_KEY_LEN,
            AesSize::Aes256 => AES_256_KEY_LEN,
        }
    }
}

pub(crate) fn hmac_sha1(key: &[u8], payload: &[u8], mac_size: usize) -> Result<Vec<u8>, KrbError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|_| KrbError::InvalidHmacKey)?;
    mac.update(payload);
    let mut out = mac.finalize().into_bytes().to_vec();
    out.truncate(mac_size);
    Ok(out)
}

fn encrypt_cbc(key: &[u8], size: AesSize, data: &[u8]) -> Result<Vec<u8>, KrbError> {
    debug_assert!(data.len() % AES_BLOCK_SIZE == 0);
    let mut buf = data.to_vec();
    let len = buf.len();
    match size {
        AesSize::Aes128 => Aes128CbcEnc::new_from_slices(key, &IV_ZERO)
            .map_err(|_| KrbError::InvalidEncryptionKey)?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|_| KrbError::CtsCiphertextInvalid)?,
        AesSize::Aes256 => Aes256CbcEnc::new_from_slices(key, &IV_ZERO)
            .map_err(|_| KrbError::InvalidEncryptionKey)?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|_| KrbError::CtsCiphertextInvalid)?,
    };
    Ok(buf)
}

fn decrypt_cbc(key: &[u8], size: AesSize, data: &[u8]) -> Result<Vec<u8>, KrbError> {
    debug_assert!(data.len() % AES_BLOCK_SIZE == 0);
    let mut buf = data.to_vec();
    match size {
        AesSize::Aes128 => Aes128CbcDec::new_from_slices(key, &IV_ZERO)
            .map_err(|_| KrbError::InvalidEncryptionKey)?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|_| KrbError::CtsCiphertextInvalid)?,
        AesSize::Aes256 => Aes256CbcDec::new_from_slices(key, &IV_ZERO)
            .map_err(|_| KrbError::InvalidEncryptionKey)?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|_| KrbError::CtsCiphertextInvalid)?,
    };
    Ok(buf)
}

fn swap_two_last_blocks(data: &mut [u8]) -> Result<(), KrbError> {
    if data.len() < 2 * AES_BLOCK_SIZE {
        return Err(KrbError::CtsCiphertextInvalid);
    }
    let len = data.len();
    for i in 0..AES_BLOCK_SIZE {
        data.swap(i + len - 2 * AES_BLOCK_SIZE, i + len - AES_BLOCK_SIZE);
    }
    Ok(())
}

/// CTS (CS3) encryption expressed as zero-padded CBC with the last two
/// blocks swapped and the padding stolen back.
fn encrypt_cts(key: &[u8], size: AesSize, payload: &[u8]) -> Result<Vec<u8>, KrbError> {
    let pad_len = (AES_BLOCK_SIZE - (payload.len() % AES_BLOCK_SIZE)) % AES_BLOCK_SIZE;

    let mut padded = payload.to_vec();
    padded.resize(padded.len() + pad_len, 0);

    let mut cipher = encrypt_cbc(key, size, &padded)?;

    if cipher.len() <= AES_BLOCK_SIZE {
        return Ok(cipher);
    }
    if cipher.len() >= 2 * AES_BLOCK_SIZE {
        swap_two_last_blocks(&mut cipher)?;
    }
    cipher.truncate(payload.len());

    Ok(cipher)
}

fn decrypt_cts(key: &[u8], size: AesSize, cipher_data: &[u8]) -> Result<Vec<u8>, KrbError> {
    if cipher_data.is_empty() {
        return Err(KrbError::CtsCiphertextInvalid);
    }
    if cipher_data.len() == AES_BLOCK_SIZE {
        return decrypt_cbc(key, size, cipher_data);
    }
    if cipher_data.len() < AES_BLOCK_SIZE {
        return Err(KrbError::CtsCiphertextInvalid);
    }

    let pad_len = (AES_BLOCK_SIZE - (cipher_data.len() % AES_BLOCK_SIZE)) % AES_BLOCK_SIZE;
    let mut cipher = cipher_data.to_vec();

    if pad_len != 0 {
        // Reconstruct the stolen tail: decrypt the swapped final full block
        // with a zero IV and append its last pad_len bytes.
        let start = cipher.len() + pad_len - 2 * AES_BLOCK_SIZE;
        let dn = decrypt_cbc(key, size, &cipher[start..start + AES_BLOCK_SIZE])?;
        let dn_len = dn.len();
        cipher.extend_from_slice(&dn[dn_len - pad_len..]);
    }

    if cipher.len() >= 2 * AES_BLOCK_SIZE {
        swap_two_last_blocks(&mut cipher)?;
    }

    let mut plaintext = decrypt_cbc(key, size, &cipher)?;
    plaintext.truncate(cipher_data.len());

    Ok(plaintext)
}

/// RFC 3961 section 5.1 DK: n-fold the usage constant to the block size,
/// then chain CBC encryptions of it until enough key material accumulates.
pub(crate) fn derive_key(
    base_key: &[u8],
    well_known: &[u8],
    size: AesSize,
) -> Result<Vec<u8>, KrbError> {
    let mut folded = super::nfold::n_fold(well_known, AES_BLOCK_SIZE * 8);

    let key_len = size.key_len();
    let mut out = Vec::with_capacity(key_len);
    while out.len() < key_len {
        folded = encrypt_cbc(base_key, size, &folded)?;
        out.extend_from_slice(&folded);
    }
    out.truncate(key_len);

    Ok(out)
}

/// RFC 3962 string-to-key: PBKDF2-HMAC-SHA1 to a candidate key, then the DK
/// fold with the "kerberos" well known constant.
pub(crate) fn derive_key_from_password(
    password: &[u8],
    salt: &[u8],
    iter_count: u32,
    size: AesSize,
) -> Result<Vec<u8>, KrbError> {
    let mut tmp = vec![0u8; size.key_len()];
    pbkdf2_hmac::<Sha1>(password, salt, iter_count, &mut tmp);

    // For AES the random-to-key function is the identity function.
    derive_key(&tmp, KERBEROS_WELL_KNOWN, size)
}

fn usage_constant(usage: i32, suffix: u8) -> [u8; 5] {
    let mut wk = [0u8; 5];
    wk[0..4].copy_from_slice(&usage.to_be_bytes());
    wk[4] = suffix;
    wk
}

fn usage_kc(usage: i32) -> [u8; 5] {
    usage_constant(usage, 0x99)
}

fn usage_ke(usage: i32) -> [u8; 5] {
    usage_constant(usage, 0xAA)
}

fn usage_ki(usage: i32) -> [u8; 5] {
    usage_constant(usage, 0x55)
}

pub(crate) fn encrypt_message(
    key: &[u8],
    size: AesSize,
    key_usage: i32,
    plaintext: &[u8],
    confounder: [u8; AES_BLOCK_SIZE],
) -> Result<Vec<u8>, KrbError> {
    if plaintext.is_empty() {
        return Err(KrbError::PlaintextEmpty);
    }
    if key.len() != size.key_len() {
        return Err(KrbError::InvalidEncryptionKey);
    }

    let mut data = Vec::with_capacity(AES_BLOCK_SIZE + plaintext.len());
    data.extend_from_slice(&confounder);
    data.extend_from_slice(plaintext);

    let ke = derive_key(key, &usage_ke(key_usage), size)?;
    let mut ciphertext = encrypt_cts(&ke, size, &data)?;

    let ki = derive_key(key, &usage_ki(key_usage), size)?;
    let hmac = hmac_sha1(&ki, &data, AES_MAC_SIZE)?;
    ciphertext.extend_from_slice(&hmac);

    Ok(ciphertext)
}

pub(crate) fn decrypt_message(
    key: &[u8],
    size: AesSize,
    key_usage: i32,
    ciphertext: &[u8],
) -> Result<Vec<u8>, KrbError> {
    if key.len() != size.key_len() {
        return Err(KrbError::InvalidEncryptionKey);
    }
    if ciphertext.len() < AES_BLOCK_SIZE + AES_MAC_SIZE {
        return Err(KrbError::InsufficientData);
    }

    let (cipher_data, msg_hmac) = ciphertext.split_at(ciphertext.len() - AES_MAC_SIZE);

    let ke = derive_key(key, &usage_ke(key_usage), size)?;
    let mut plaintext = decrypt_cts(&ke, size, cipher_data)?;

    let ki = derive_key(key, &usage_ki(key_usage), size)?;
    let my_hmac = hmac_sha1(&ki, &plaintext, AES_MAC_SIZE)?;

    if !super::ct_eq(&my_hmac, msg_hmac) {
        return Err(KrbError::MessageAuthenticationFailed);
    }

    // The leading block is the random confounder, discard it.
    Ok(plaintext.split_off(AES_BLOCK_SIZE))
}

/// RFC 3961 section 5.4 keyed checksum: HMAC-SHA1 under Kc, truncated to
/// 96 bits.
pub(crate) fn checksum_message(
    key: &[u8],
    size: AesSize,
    key_usage: i32,
    payload: &[u8],
) -> Result<Vec<u8>, KrbError> {
    if key.len() != size.key_len() {
        return Err(KrbError::InvalidEncryptionKey);
    }
    let kc = derive_key(key, &usage_kc(key_usage), size)?;
    hmac_sha1(&kc, payload, AES_MAC_SIZE)
}
