use crate::error::KrbError;
use crate::mstypes::FileTime;
use crate::ndr::NdrCursor;

/// MS-PAC section 2.7 PAC_CLIENT_INFO. A plain little-endian record, not
/// NDR-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub client_id: FileTime,
    pub name: String,
}

impl ClientInfo {
    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let mut cursor = NdrCursor::new_le(b);

        let client_id = FileTime::read(&mut cursor)?;
        let name_length = cursor.read_u16()?;
        if name_length % 2 != 0 {
            return Err(KrbError::PacClientInfoInvalid);
        }

        let mut units = Vec::with_capacity(usize::from(name_length) / 2);
        for _ in 0..name_length / 2 {
            units.push(cursor.read_u16()?);
        }
        let name = String::from_utf16(&units).map_err(|_| KrbError::PacClientInfoInvalid)?;

        cursor.expect_zero_tail()?;

        Ok(ClientInfo { client_id, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A PAC_CLIENT_INFO buffer captured from a domain controller.
    const SAMPLE: &[u8] = &[
        0x00, 0x49, 0xD9, 0x0E, 0x65, 0x6A, 0xC6, 0x01, 0x08, 0x00, 0x6C, 0x00, 0x7A, 0x00, 0x68,
        0x00, 0x75, 0x00,
    ];

    #[test]
    fn client_info_parses() {
        let ci = ClientInfo::unmarshal(SAMPLE).expect("Failed to parse");
        assert_eq!(ci.name, "lzhu");
        assert_eq!(ci.client_id.low_date_time, 0x0ED9_4900);
        assert_eq!(ci.client_id.high_date_time, 0x01C6_6A65);
    }

    #[test]
    fn client_info_zero_padding_tolerated() {
        let mut blob = SAMPLE.to_vec();
        blob.extend_from_slice(&[0, 0, 0, 0]);
        let ci = ClientInfo::unmarshal(&blob).expect("Failed to parse");
        assert_eq!(ci.name, "lzhu");
    }

    #[test]
    fn client_info_nonzero_padding_rejected() {
        let mut blob = SAMPLE.to_vec();
        blob.push(0x01);
        assert_eq!(
            ClientInfo::unmarshal(&blob),
            Err(KrbError::PacTrailingBytes)
        );
    }

    #[test]
    fn client_info_truncated_name() {
        let blob = &SAMPLE[..12];
        assert_eq!(ClientInfo::unmarshal(blob), Err(KrbError::NdrTruncated));
    }
}
