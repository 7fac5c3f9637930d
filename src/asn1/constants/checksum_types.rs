use num_enum::{IntoPrimitive, TryFromPrimitive};

/// RFC 3961 section 8 checksum type numbers, plus the negative Microsoft
/// assignment used inside PAC signature buffers.
#[allow(non_camel_case_types)]
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy)]
#[repr(i32)]
pub enum ChecksumType {
    CRC32 = 1,
    RSA_MD4 = 2,
    RSA_MD4_DES = 3,
    DES_MAC = 4,
    DES_MAC_K = 5,
    RSA_MD4_DES_K = 6,
    RSA_MD5 = 7,
    RSA_MD5_DES = 8,
    SHA1_UNKEYED = 14,
    HMAC_SHA1_96_AES128 = 15,
    HMAC_SHA1_96_AES256 = 16,
    /// MS-PAC section 2.8.1, KERB_CHECKSUM_HMAC_MD5. On the wire inside a
    /// PAC signature buffer this appears as the unsigned value 0xFFFFFF76.
    KERB_CHECKSUM_HMAC_MD5 = -138,
}

impl ChecksumType {
    /// Decode the unsigned 32 bit form used by PAC signature buffers.
    pub fn from_pac_wire(value: u32) -> Option<Self> {
        ChecksumType::try_from(value as i32).ok()
    }

    /// Length in bytes of a signature produced by this algorithm.
    pub fn signature_len(self) -> Option<usize> {
        match self {
            ChecksumType::KERB_CHECKSUM_HMAC_MD5 => Some(16),
            ChecksumType::HMAC_SHA1_96_AES128 | ChecksumType::HMAC_SHA1_96_AES256 => Some(12),
            _ => None,
        }
    }
}
