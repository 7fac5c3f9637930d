use super::name::Name;
use super::{kerberos_time_to_system_time, system_time_to_kerberos_time};
use crate::asn1::authenticator::{AuthenticatorInner, TaggedAuthenticator};
use crate::asn1::constants::EncryptionType;
use crate::asn1::encryption_key::EncryptionKey as Asn1EncryptionKey;
use crate::asn1::kerberos_string::KerberosString;
use crate::asn1::OctetString;
use crate::crypto::KrbKey;
use crate::error::KrbError;

use der::{Decode, Encode};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tracing::{error, trace};

/// The client-proving part of an AP exchange, as a service acceptor sees
/// it after decrypting the AP-REQ authenticator.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticator {
    pub crealm: String,
    pub cname: Name,
    /// Client timestamp, whole seconds.
    pub ctime: SystemTime,
    /// Microsecond part of the client timestamp, 0..=999999.
    pub cusec: u32,
    pub subkey: Option<KrbKey>,
    pub seq_number: Option<u32>,
}

impl Authenticator {
    pub fn new(cname: Name, crealm: &str, ctime: SystemTime, cusec: u32) -> Self {
        Authenticator {
            crealm: crealm.to_string(),
            cname,
            ctime,
            cusec,
            subkey: None,
            seq_number: None,
        }
    }

    /// The full-resolution client time: ctime plus the microsecond part.
    /// This is the replay cache key for the client.
    pub fn client_time(&self) -> SystemTime {
        self.ctime + Duration::from_micros(u64::from(self.cusec))
    }

    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let inner = TaggedAuthenticator::from_der(b).map_err(|err| {
            error!(?err, "unable to decode authenticator");
            KrbError::DerDecodeAuthenticator
        })?;
        let inner = inner.0;

        // A subkey of an etype we cannot operate with is carried over the
        // wire but unusable here; drop it rather than fail the exchange.
        let subkey = inner.subkey.and_then(|k| {
            let etype = EncryptionType::try_from(k.key_type).ok()?;
            match KrbKey::new(etype, k.key_value.as_bytes().to_vec()) {
                Ok(key) => Some(key),
                Err(_) => {
                    trace!("ignoring authenticator subkey of unsupported etype");
                    None
                }
            }
        });

        Ok(Authenticator {
            crealm: inner.crealm.as_str().to_string(),
            cname: (&inner.cname).into(),
            ctime: kerberos_time_to_system_time(inner.ctime),
            cusec: inner.cusec,
            subkey,
            seq_number: inner.seq_number,
        })
    }

    pub fn marshal(&self) -> Result<Vec<u8>, KrbError> {
        let subkey = self
            .subkey
            .as_ref()
            .map(|k| {
                OctetString::new(k.value().to_vec())
                    .map(|key_value| Asn1EncryptionKey {
                        key_type: k.etype().into(),
                        key_value,
                    })
                    .map_err(|_| KrbError::DerEncodeOctetString)
            })
            .transpose()?;

        let inner = AuthenticatorInner {
            authenticator_vno: 5,
            crealm: KerberosString::from_str(&self.crealm)?,
            cname: (&self.cname).try_into()?,
            cksum: None,
            cusec: self.cusec,
            ctime: system_time_to_kerberos_time(self.ctime)?,
            subkey,
            seq_number: self.seq_number,
            authorization_data: None,
        };

        TaggedAuthenticator(inner).to_der().map_err(|err| {
            error!(?err, "unable to encode authenticator");
            KrbError::DerEncodeAuthenticator
        })
    }
}
