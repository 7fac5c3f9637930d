//! KERB_CHECKSUM_HMAC_MD5 (MS-PAC section 2.8.1, RFC 4757 section 4), the
//! keyed checksum used by RC4-HMAC realms inside PAC signature buffers.

use crate::constants::HMAC_MD5_MAC_SIZE;
use crate::error::KrbError;

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};

type HmacMd5 = Hmac<Md5>;

const SIGNATURE_KEY_LABEL: &[u8] = b"signaturekey\0";

fn hmac_md5(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, KrbError> {
    let mut mac = HmacMd5::new_from_slice(key).map_err(|_| KrbError::InvalidHmacKey)?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn checksum_hmac_md5(
    key: &[u8],
    key_usage: i32,
    payload: &[u8],
) -> Result<Vec<u8>, KrbError> {
    let ksign = hmac_md5(key, SIGNATURE_KEY_LABEL)?;

    let mut inner = Md5::new();
    inner.update(key_usage.to_le_bytes());
    inner.update(payload);
    let tmp = inner.finalize();

    let out = hmac_md5(&ksign, &tmp)?;
    debug_assert_eq!(out.len(), HMAC_MD5_MAC_SIZE);
    Ok(out)
}
