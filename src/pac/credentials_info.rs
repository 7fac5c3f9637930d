use crate::constants::KU_KERB_NON_KERB_SALT;
use crate::crypto::KrbKey;
use crate::error::KrbError;
use crate::mstypes::RpcUnicodeString;
use crate::ndr::NdrCursor;
use tracing::error;

/// MS-PAC section 2.6.1 PAC_CREDENTIAL_INFO. A plain little-endian header
/// followed by the encrypted serialized PAC_CREDENTIAL_DATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsInfo {
    pub etype: u32,
    pub encrypted: Vec<u8>,
}

impl CredentialsInfo {
    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let mut cursor = NdrCursor::new_le(b);

        let version = cursor.read_u32()?;
        if version != 0 {
            return Err(KrbError::PacCredentialsVersionInvalid);
        }
        let etype = cursor.read_u32()?;
        let encrypted = cursor.remaining().to_vec();

        Ok(CredentialsInfo { etype, encrypted })
    }

    /// Open the inner credential blob. The key must be of the etype named
    /// by the buffer itself.
    pub fn decrypt(&self, key: &KrbKey) -> Result<CredentialData, KrbError> {
        if i32::from(key.etype()) as u32 != self.etype {
            error!(
                have = ?key.etype(),
                want = self.etype,
                "credential buffer etype does not match supplied key"
            );
            return Err(KrbError::WrongKeyType);
        }
        let plaintext = key.decrypt(&self.encrypted, KU_KERB_NON_KERB_SALT)?;
        CredentialData::unmarshal(&plaintext)
    }
}

/// MS-PAC section 2.6.2 PAC_CREDENTIAL_DATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialData {
    pub credentials: Vec<SecpkgSupplementalCred>,
}

impl CredentialData {
    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let mut cursor = NdrCursor::new_le(b);
        let count = cursor.read_u32()?;
        let mut credentials = Vec::new();
        for _ in 0..count {
            credentials.push(SecpkgSupplementalCred::read(&mut cursor)?);
        }
        Ok(CredentialData { credentials })
    }
}

/// MS-PAC section 2.6.3 SECPKG_SUPPLEMENTAL_CRED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecpkgSupplementalCred {
    pub package_name: RpcUnicodeString,
    pub credentials: Vec<u8>,
}

impl SecpkgSupplementalCred {
    fn read(cursor: &mut NdrCursor) -> Result<Self, KrbError> {
        let package_name = RpcUnicodeString::read_header(cursor)?;
        let credential_size = cursor.read_u32()?;
        let credentials = cursor.read_bytes(credential_size as usize)?.to_vec();
        Ok(SecpkgSupplementalCred {
            package_name,
            credentials,
        })
    }
}

/// MS-PAC section 2.6.4 NTLM_SUPPLEMENTAL_CREDENTIAL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtlmSupplementalCred {
    pub version: u32,
    pub flags: u32,
    pub lm_password: [u8; 16],
    pub nt_password: [u8; 16],
}

impl NtlmSupplementalCred {
    /// Flag bit indicating the LM OWF member is present and valid.
    pub const LM_OWF: u32 = 1 << 0;
    /// Flag bit indicating the NT OWF member is present and valid.
    pub const NT_OWF: u32 = 1 << 1;

    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let mut cursor = NdrCursor::new_le(b);
        let version = cursor.read_u32()?;
        let flags = cursor.read_u32()?;
        let mut lm_password = [0u8; 16];
        lm_password.copy_from_slice(cursor.read_bytes(16)?);
        let mut nt_password = [0u8; 16];
        nt_password.copy_from_slice(cursor.read_bytes(16)?);
        Ok(NtlmSupplementalCred {
            version,
            flags,
            lm_password,
            nt_password,
        })
    }
}
