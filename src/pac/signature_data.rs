use crate::asn1::constants::ChecksumType;
use crate::error::KrbError;
use crate::ndr::NdrCursor;

/// MS-PAC section 2.8 PAC_SIGNATURE_DATA. A plain little-endian record:
/// the signature type, a signature whose length is fixed by that type, an
/// optional RODC identifier, then zero padding only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureData {
    pub signature_type: u32,
    pub signature: Vec<u8>,
    pub rodc_identifier: u16,
}

impl SignatureData {
    /// Byte offset of the signature within its buffer.
    pub(crate) const SIGNATURE_OFFSET: usize = 4;

    /// Parse the buffer. Alongside the value, return a copy of the whole
    /// buffer with the signature octets zeroed in place; that copy is what
    /// checksum verification runs over.
    pub fn unmarshal(b: &[u8]) -> Result<(Self, Vec<u8>), KrbError> {
        let mut cursor = NdrCursor::new_le(b);

        let signature_type = cursor.read_u32()?;
        let sig_len = ChecksumType::from_pac_wire(signature_type)
            .and_then(|t| t.signature_len())
            .ok_or(KrbError::UnsupportedChecksum)?;

        let signature = cursor.read_bytes(sig_len)?.to_vec();

        // The RODC identifier is only present when issued by a read only
        // domain controller; everything after it must be zero padding.
        let rodc_identifier = if cursor.remaining().len() >= 2 {
            cursor.read_u16()?
        } else {
            0
        };
        cursor.expect_zero_tail()?;

        let mut zeroed = b.to_vec();
        zeroed[Self::SIGNATURE_OFFSET..Self::SIGNATURE_OFFSET + sig_len].fill(0);

        Ok((
            SignatureData {
                signature_type,
                signature,
                rodc_identifier,
            },
            zeroed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A server signature buffer captured from a domain controller,
    // KERB_CHECKSUM_HMAC_MD5 (0xFFFFFF76) with a 16 byte signature.
    const SAMPLE: &[u8] = &[
        0x76, 0xFF, 0xFF, 0xFF, 65, 237, 206, 154, 52, 129, 93, 58, 239, 123, 201, 136, 116, 128,
        93, 37,
    ];

    #[test]
    fn hmac_md5_signature_parses() {
        let (sig, zeroed) = SignatureData::unmarshal(SAMPLE).expect("Failed to parse");
        assert_eq!(sig.signature_type, 0xFFFF_FF76);
        assert_eq!(sig.signature.len(), 16);
        assert_eq!(sig.signature[0], 65);
        assert_eq!(sig.rodc_identifier, 0);

        assert_eq!(zeroed.len(), SAMPLE.len());
        assert_eq!(&zeroed[0..4], &SAMPLE[0..4]);
        assert!(zeroed[4..20].iter().all(|b| *b == 0));
    }

    #[test]
    fn aes_signature_length_is_twelve() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&16u32.to_le_bytes());
        blob.extend_from_slice(&[0x5A; 12]);
        let (sig, zeroed) = SignatureData::unmarshal(&blob).expect("Failed to parse");
        assert_eq!(sig.signature_type, 16);
        assert_eq!(sig.signature, vec![0x5A; 12]);
        assert!(zeroed[4..16].iter().all(|b| *b == 0));
    }

    #[test]
    fn trailing_nonzero_rejected() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&16u32.to_le_bytes());
        blob.extend_from_slice(&[0x5A; 12]);
        blob.extend_from_slice(&[0x00, 0x00, 0x01]);
        assert_eq!(
            SignatureData::unmarshal(&blob),
            Err(KrbError::PacTrailingBytes)
        );
    }

    #[test]
    fn unknown_signature_type_rejected() {
        let blob = 99u32.to_le_bytes();
        assert_eq!(
            SignatureData::unmarshal(&blob),
            Err(KrbError::UnsupportedChecksum)
        );
    }
}
