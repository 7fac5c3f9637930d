pub mod authorization_data_types;
pub mod checksum_types;
pub mod encryption_types;
pub mod errors;
pub mod princ_name_types;

pub use self::authorization_data_types::AuthorizationDataType;
pub use self::checksum_types::ChecksumType;
pub use self::encryption_types::EncryptionType;
pub use self::errors::KrbErrorCode;
pub use self::princ_name_types::PrincipalNameType;
