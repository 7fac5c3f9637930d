use super::sid::RpcSid;
use crate::error::KrbError;
use crate::ndr::NdrCursor;

/// MS-PAC 2.2.2 GROUP_MEMBERSHIP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMembership {
    pub relative_id: u32,
    pub attributes: u32,
}

impl GroupMembership {
    pub fn read(cursor: &mut NdrCursor) -> Result<Self, KrbError> {
        let relative_id = cursor.read_u32()?;
        let attributes = cursor.read_u32()?;
        Ok(GroupMembership {
            relative_id,
            attributes,
        })
    }
}

/// MS-PAC 2.2.1 KERB_SID_AND_ATTRIBUTES. The SID body follows its referent
/// in the deferred region; a nil referent leaves the SID absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KerbSidAndAttributes {
    pub sid: Option<RpcSid>,
    pub attributes: u32,
}

/// MS-PAC 2.2.3 DOMAIN_GROUP_MEMBERSHIP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainGroupMembership {
    pub domain_id: RpcSid,
    pub groups: Vec<GroupMembership>,
}

impl DomainGroupMembership {
    pub fn read(cursor: &mut NdrCursor) -> Result<Self, KrbError> {
        let domain_id = RpcSid::read(cursor)?;
        let group_count = cursor.read_u32()?;
        // Counts come off the wire, so growth is left to push.
        let mut groups = Vec::new();
        for _ in 0..group_count {
            groups.push(GroupMembership::read(cursor)?);
        }
        Ok(DomainGroupMembership { domain_id, groups })
    }
}
