pub(crate) mod authenticator;
pub(crate) mod authorization_data;
pub(crate) mod checksum;
pub(crate) mod constants;
pub(crate) mod enc_ticket_part;
pub(crate) mod encrypted_data;
pub(crate) mod encryption_key;
pub(crate) mod host_address;
pub(crate) mod host_addresses;
pub(crate) mod kerberos_string;
pub(crate) mod kerberos_time;
pub(crate) mod krb_error;
pub(crate) mod microseconds;
pub(crate) mod principal_name;
pub(crate) mod realm;
pub(crate) mod tagged_ticket;
pub(crate) mod ticket_flags;
pub(crate) mod transited_encoding;

pub(crate) use der::asn1::OctetString;
