//! Microsoft primitive types carried inside PAC buffers, with their exact
//! wire semantics.

mod filetime;
mod membership;
mod rpc_unicode_string;
mod sid;

pub use self::filetime::FileTime;
pub use self::membership::{DomainGroupMembership, GroupMembership, KerbSidAndAttributes};
pub use self::rpc_unicode_string::RpcUnicodeString;
pub use self::sid::{RpcSid, RpcSidIdentifierAuthority};
