use std::time::Duration;

// RFC 4120 section 7.5.1 key usage numbers.
pub const KU_KDC_REP_TICKET: i32 = 2;
pub const KU_AP_REQ_AUTHENTICATOR: i32 = 7;
// MS-PAC usage numbers, shared with RFC 3961 registry.
pub const KU_KERB_NON_KERB_SALT: i32 = 16;
pub const KU_KERB_NON_KERB_CKSUM_SALT: i32 = 17;

pub(crate) const AES_BLOCK_SIZE: usize = 16;
pub(crate) const AES_MAC_SIZE: usize = 12;
pub(crate) const AES_128_KEY_LEN: usize = 16;
pub(crate) const AES_256_KEY_LEN: usize = 32;
pub(crate) const RC4_KEY_LEN: usize = 16;
pub(crate) const HMAC_MD5_MAC_SIZE: usize = 16;

/// RFC 3962 default string-to-key parameters, 0x00001000 rounds. This default
/// is woefully low for modern hardware but is what unconfigured realms use.
pub(crate) const RFC_PBKDF2_SHA1_ITER: u32 = 0x1000;

/// RFC 3962 section 4, the well known string-to-key constant.
pub(crate) const KERBEROS_WELL_KNOWN: &[u8; 8] = b"kerberos";

pub(crate) const KDC_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const KDC_UDP_RECV_BUF: usize = 4096;
