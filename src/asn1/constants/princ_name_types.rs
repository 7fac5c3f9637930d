use num_enum::{IntoPrimitive, TryFromPrimitive};

/// RFC 4120 section 6.2. The name type is advisory: two names with the same
/// components are the same name regardless of type.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy)]
#[repr(i32)]
pub enum PrincipalNameType {
    NtUnknown = 0,
    NtPrincipal = 1,
    NtSrvInst = 2,
    NtSrvHst = 3,
    NtSrvXhst = 4,
    NtUid = 5,
    NtX500Principal = 6,
    NtSmtpName = 7,
    NtEnterprise = 10,
}
