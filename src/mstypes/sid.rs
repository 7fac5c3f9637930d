use crate::error::KrbError;
use crate::ndr::NdrCursor;
use std::fmt;

/// MS-DTYP 2.4.1.1 SID identifier authority, six big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcSidIdentifierAuthority(pub [u8; 6]);

impl RpcSidIdentifierAuthority {
    pub fn read(cursor: &mut NdrCursor) -> Result<Self, KrbError> {
        let mut b = [0u8; 6];
        b.copy_from_slice(cursor.read_bytes(6)?);
        Ok(RpcSidIdentifierAuthority(b))
    }

    /// The authority as an integer. Read big-endian per MS-DTYP 2.4.1.1.
    pub fn value(self) -> u64 {
        let mut b = [0u8; 8];
        b[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(b)
    }
}

/// MS-DTYP 2.4.2.3 RPC_SID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcSid {
    pub revision: u8,
    pub sub_authority_count: u8,
    pub identifier_authority: RpcSidIdentifierAuthority,
    pub sub_authority: Vec<u32>,
}

impl RpcSid {
    /// Read an RPC_SID preceded by its NDR conformant array size, which
    /// must agree with the embedded sub-authority count.
    pub fn read(cursor: &mut NdrCursor) -> Result<Self, KrbError> {
        let conformant_count = cursor.read_conformant_array_header()?;

        let revision = cursor.read_u8()?;
        if revision != 1 {
            return Err(KrbError::SidRevisionInvalid);
        }
        let sub_authority_count = cursor.read_u8()?;
        let identifier_authority = RpcSidIdentifierAuthority::read(cursor)?;

        if conformant_count != u32::from(sub_authority_count) {
            return Err(KrbError::SidSubAuthorityCountMismatch);
        }

        let mut sub_authority = Vec::with_capacity(sub_authority_count as usize);
        for _ in 0..sub_authority_count {
            sub_authority.push(cursor.read_u32()?);
        }

        Ok(RpcSid {
            revision,
            sub_authority_count,
            identifier_authority,
            sub_authority,
        })
    }
}

impl fmt::Display for RpcSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let authority = self.identifier_authority.value();
        if authority >= 1 << 32 {
            write!(f, "S-1-0x")?;
            for b in self.identifier_authority.0 {
                write!(f, "{b:02x}")?;
            }
        } else {
            write!(f, "S-1-{authority}")?;
        }
        for sub in &self.sub_authority {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid_bytes(count_header: u32, count: u8, auth: [u8; 6], subs: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&count_header.to_le_bytes());
        out.push(1);
        out.push(count);
        out.extend_from_slice(&auth);
        for s in subs {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn sid_string_form() {
        let blob = sid_bytes(4, 4, [0, 0, 0, 0, 0, 5], &[21, 100, 200, 500]);
        let mut cursor = NdrCursor::new_le(&blob);
        let sid = RpcSid::read(&mut cursor).expect("Failed to read SID");
        assert_eq!(sid.to_string(), "S-1-5-21-100-200-500");
    }

    #[test]
    fn sid_large_authority_is_hex() {
        let blob = sid_bytes(1, 1, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06], &[99]);
        let mut cursor = NdrCursor::new_le(&blob);
        let sid = RpcSid::read(&mut cursor).expect("Failed to read SID");
        assert_eq!(sid.to_string(), "S-1-0x010203040506-99");
    }

    #[test]
    fn sid_conformant_count_mismatch() {
        let blob = sid_bytes(3, 4, [0, 0, 0, 0, 0, 5], &[21, 100, 200, 500]);
        let mut cursor = NdrCursor::new_le(&blob);
        assert_eq!(
            RpcSid::read(&mut cursor),
            Err(KrbError::SidSubAuthorityCountMismatch)
        );
    }

    #[test]
    fn sid_bad_revision() {
        let mut blob = sid_bytes(1, 1, [0, 0, 0, 0, 0, 5], &[21]);
        blob[4] = 2;
        let mut cursor = NdrCursor::new_le(&blob);
        assert_eq!(RpcSid::read(&mut cursor), Err(KrbError::SidRevisionInvalid));
    }
}
