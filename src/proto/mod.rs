//! The domain layer: principal names, tickets and their envelope
//! operations, authenticators, and typed KRB-ERROR replies. Wire structs
//! live in `asn1`; everything here converts to and from them.

mod authenticator;
mod error_rep;
mod name;
mod ticket;

pub use self::authenticator::Authenticator;
pub use self::error_rep::ErrorReply;
pub use self::name::Name;
pub use self::ticket::{
    marshal_ticket_sequence, unmarshal_ticket_sequence, AdEntry, EncTicketPart, EncryptedData,
    MintTicket, OpenedTicket, Ticket, TransitedEncoding,
};

pub use crate::asn1::ticket_flags::TicketFlags;

use crate::asn1::kerberos_time::KerberosTime;
use crate::error::KrbError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Kerberos times are whole seconds; the sub-second part is truncated.
pub(crate) fn system_time_to_kerberos_time(t: SystemTime) -> Result<KerberosTime, KrbError> {
    let dur = t
        .duration_since(UNIX_EPOCH)
        .map_err(|_| KrbError::TimeOutOfRange)?;
    KerberosTime::from_unix_duration(Duration::from_secs(dur.as_secs()))
        .map_err(|_| KrbError::DerEncodeKerberosTime)
}

pub(crate) fn kerberos_time_to_system_time(t: KerberosTime) -> SystemTime {
    UNIX_EPOCH + t.to_unix_duration()
}
