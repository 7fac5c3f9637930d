use crate::error::KrbError;
use crate::mstypes::{DomainGroupMembership, GroupMembership, KerbSidAndAttributes, RpcSid};
use crate::ndr::NdrCursor;

/// MS-PAC section 2.12 PAC_DEVICE_INFO, NDR-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub user_id: u32,
    pub primary_group_id: u32,
    pub account_domain_id: RpcSid,
    pub account_group_ids: Vec<GroupMembership>,
    pub extra_sids: Vec<KerbSidAndAttributes>,
    pub domain_groups: Vec<DomainGroupMembership>,
}

impl DeviceInfo {
    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let mut cursor = NdrCursor::new_le(b);
        cursor.read_stream_headers()?;

        // The top level unique pointer referent carries no information.
        cursor.skip(4)?;

        let user_id = cursor.read_u32()?;
        let primary_group_id = cursor.read_u32()?;
        let account_domain_id = RpcSid::read(&mut cursor)?;

        let account_group_count = cursor.read_u32()?;
        let mut account_group_ids = Vec::new();
        for _ in 0..account_group_count {
            account_group_ids.push(GroupMembership::read(&mut cursor)?);
        }

        let sid_count = cursor.read_u32()?;
        let mut extra_sids = Vec::new();
        if sid_count > 0 {
            let max_count = cursor.read_conformant_array_header()?;
            if max_count != sid_count {
                return Err(KrbError::SidSubAuthorityCountMismatch);
            }
            // Referent/attribute pairs come first; the SID bodies follow in
            // the deferred region, skipped for nil referents.
            let mut referents = Vec::new();
            for _ in 0..sid_count {
                let referent = cursor.read_u32()?;
                let attributes = cursor.read_u32()?;
                referents.push((referent, attributes));
            }
            for (referent, attributes) in referents {
                let sid = if referent != 0 {
                    Some(RpcSid::read(&mut cursor)?)
                } else {
                    None
                };
                extra_sids.push(KerbSidAndAttributes { sid, attributes });
            }
        }

        let domain_group_count = cursor.read_u32()?;
        let mut domain_groups = Vec::new();
        for _ in 0..domain_group_count {
            domain_groups.push(DomainGroupMembership::read(&mut cursor)?);
        }

        cursor.expect_zero_tail()?;

        Ok(DeviceInfo {
            user_id,
            primary_group_id,
            account_domain_id,
            account_group_ids,
            extra_sids,
            domain_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_sid(out: &mut Vec<u8>, subs: &[u32]) {
        out.extend_from_slice(&(subs.len() as u32).to_le_bytes());
        out.push(1);
        out.push(subs.len() as u8);
        out.extend_from_slice(&[0, 0, 0, 0, 0, 5]);
        for s in subs {
            out.extend_from_slice(&s.to_le_bytes());
        }
    }

    fn sample_device_info() -> Vec<u8> {
        let mut b = Vec::new();
        // Stream headers.
        b.extend_from_slice(&[0x01, 0x10, 0x08, 0x00, 0xCC, 0xCC, 0xCC, 0xCC]);
        b.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        // Top level referent.
        b.extend_from_slice(&0x0002_0000u32.to_le_bytes());
        // user_id, primary_group_id.
        b.extend_from_slice(&1105u32.to_le_bytes());
        b.extend_from_slice(&513u32.to_le_bytes());
        // Account domain SID.
        push_sid(&mut b, &[21, 100, 200]);
        // One account group.
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&512u32.to_le_bytes());
        b.extend_from_slice(&7u32.to_le_bytes());
        // Two extra SIDs: one populated, one with a nil referent.
        b.extend_from_slice(&2u32.to_le_bytes());
        b.extend_from_slice(&2u32.to_le_bytes()); // conformant max count
        b.extend_from_slice(&0x0002_0004u32.to_le_bytes());
        b.extend_from_slice(&7u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes()); // nil referent
        b.extend_from_slice(&6u32.to_le_bytes());
        push_sid(&mut b, &[21, 100, 201, 1106]);
        // One domain group.
        b.extend_from_slice(&1u32.to_le_bytes());
        push_sid(&mut b, &[21, 300]);
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&514u32.to_le_bytes());
        b.extend_from_slice(&7u32.to_le_bytes());
        // Alignment padding.
        b.extend_from_slice(&[0, 0, 0, 0]);
        b
    }

    #[test]
    fn device_info_parses() {
        let di = DeviceInfo::unmarshal(&sample_device_info()).expect("Failed to parse");
        assert_eq!(di.user_id, 1105);
        assert_eq!(di.primary_group_id, 513);
        assert_eq!(di.account_domain_id.to_string(), "S-1-5-21-100-200");
        assert_eq!(di.account_group_ids.len(), 1);
        assert_eq!(di.account_group_ids[0].relative_id, 512);

        assert_eq!(di.extra_sids.len(), 2);
        assert_eq!(
            di.extra_sids[0]
                .sid
                .as_ref()
                .expect("SID missing")
                .to_string(),
            "S-1-5-21-100-201-1106"
        );
        assert_eq!(di.extra_sids[0].attributes, 7);
        assert!(di.extra_sids[1].sid.is_none());
        assert_eq!(di.extra_sids[1].attributes, 6);

        assert_eq!(di.domain_groups.len(), 1);
        assert_eq!(di.domain_groups[0].domain_id.to_string(), "S-1-5-21-300");
        assert_eq!(di.domain_groups[0].groups[0].relative_id, 514);
    }

    #[test]
    fn device_info_extra_sid_count_mismatch() {
        let mut b = sample_device_info();
        // Corrupt the conformant max count that precedes the referent pairs.
        let sid_count_at = 16 + 4 + 8 + (4 + 2 + 6 + 12) + 4 + 8;
        b[sid_count_at + 4] = 9;
        assert_eq!(
            DeviceInfo::unmarshal(&b),
            Err(KrbError::SidSubAuthorityCountMismatch)
        );
    }

    #[test]
    fn device_info_nonzero_tail_rejected() {
        let mut b = sample_device_info();
        let last = b.len() - 1;
        b[last] = 0xFF;
        assert_eq!(DeviceInfo::unmarshal(&b), Err(KrbError::PacTrailingBytes));
    }
}
