use super::name::Name;
use super::{kerberos_time_to_system_time, system_time_to_kerberos_time};
use crate::asn1::constants::{AuthorizationDataType, EncryptionType};
use crate::asn1::enc_ticket_part::{EncTicketPart as Asn1EncTicketPart, TaggedEncTicketPart};
use crate::asn1::encrypted_data::EncryptedData as Asn1EncryptedData;
use crate::asn1::encryption_key::EncryptionKey as Asn1EncryptionKey;
use crate::asn1::kerberos_string::KerberosString;
use crate::asn1::tagged_ticket::{self, TaggedTicket, Ticket as Asn1Ticket};
use crate::asn1::ticket_flags::TicketFlags;
use crate::asn1::transited_encoding::TransitedEncoding as Asn1TransitedEncoding;
use crate::asn1::{authorization_data::AuthorizationData, OctetString};
use crate::constants::KU_KDC_REP_TICKET;
use crate::crypto::KrbKey;
use crate::error::KrbError;
use crate::keytab::Keytab;
use crate::pac::Pac;

use der::{Decode, Encode};
use std::str::FromStr;
use std::time::SystemTime;
use tracing::{error, trace};

/// The encrypted part container of a ticket, cipher left opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub etype: i32,
    pub kvno: Option<u32>,
    pub cipher: Vec<u8>,
}

/// A wire ticket. The encrypted part stays sealed; opening one yields an
/// [`OpenedTicket`] rather than mutating the ticket in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub tkt_vno: u8,
    pub realm: String,
    pub sname: Name,
    pub enc_part: EncryptedData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitedEncoding {
    pub tr_type: i32,
    pub contents: Vec<u8>,
}

/// One authorization data element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdEntry {
    pub ad_type: i32,
    pub data: Vec<u8>,
}

impl AdEntry {
    /// Wrap a nested authorization data sequence in an AD-IF-RELEVANT
    /// container.
    pub fn if_relevant(inner: &[AdEntry]) -> Result<AdEntry, KrbError> {
        let elements = inner
            .iter()
            .map(|e| e.to_asn1())
            .collect::<Result<Vec<_>, _>>()?;
        let data = elements
            .to_der()
            .map_err(|_| KrbError::DerEncodeOctetString)?;
        Ok(AdEntry {
            ad_type: AuthorizationDataType::AdIfRelevant as i32,
            data,
        })
    }

    pub fn win2k_pac(pac_bytes: Vec<u8>) -> AdEntry {
        AdEntry {
            ad_type: AuthorizationDataType::AdWin2kPac as i32,
            data: pac_bytes,
        }
    }

    fn to_asn1(&self) -> Result<AuthorizationData, KrbError> {
        Ok(AuthorizationData {
            ad_type: self.ad_type,
            ad_data: OctetString::new(self.data.clone())
                .map_err(|_| KrbError::DerEncodeOctetString)?,
        })
    }
}

/// A decrypted ticket body.
#[derive(Debug, Clone, PartialEq)]
pub struct EncTicketPart {
    pub flags: TicketFlags,
    pub key: KrbKey,
    pub crealm: String,
    pub cname: Name,
    pub transited: TransitedEncoding,
    pub auth_time: SystemTime,
    pub start_time: Option<SystemTime>,
    pub end_time: SystemTime,
    pub renew_till: Option<SystemTime>,
    /// Empty when the wire form carried no authorization data.
    pub authorization_data: Vec<AdEntry>,
}

/// A ticket together with its decrypted inner part. Produced by
/// [`Ticket::open`]; the wire value inside is untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedTicket {
    pub ticket: Ticket,
    pub enc_part: EncTicketPart,
}

impl Ticket {
    /// Decode a DER ticket. The version must be 5.
    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let tagged = TaggedTicket::from_der(b).map_err(|err| {
            error!(?err, "unable to decode ticket");
            KrbError::DerDecodeTicket
        })?;
        Ticket::try_from(tagged.0)
    }

    pub fn marshal(&self) -> Result<Vec<u8>, KrbError> {
        let tagged = TaggedTicket(self.to_asn1()?);
        tagged.to_der().map_err(|err| {
            error!(?err, "unable to encode ticket");
            KrbError::DerEncodeTicket
        })
    }

    fn to_asn1(&self) -> Result<Asn1Ticket, KrbError> {
        Ok(Asn1Ticket {
            tkt_vno: self.tkt_vno,
            realm: KerberosString::from_str(&self.realm)?,
            sname: (&self.sname).try_into()?,
            enc_part: Asn1EncryptedData {
                etype: self.enc_part.etype,
                kvno: self.enc_part.kvno,
                cipher: OctetString::new(self.enc_part.cipher.clone())
                    .map_err(|_| KrbError::DerEncodeOctetString)?,
            },
        })
    }

    /// Decrypt the encrypted part with the matching key from the keytab.
    ///
    /// The key principal defaults to the ticket's own sname and realm. A
    /// service that holds its keytab under a different principal passes an
    /// SPN override of the form `service/host@REALM`.
    pub fn open(
        self,
        keytab: &Keytab,
        kt_principal_override: Option<&str>,
    ) -> Result<OpenedTicket, KrbError> {
        let (upn, realm) = match kt_principal_override {
            Some(spn) => {
                let (name, realm) = Name::parse_spn(spn)?;
                (name, realm.unwrap_or_else(|| self.realm.clone()))
            }
            None => (self.sname.clone(), self.realm.clone()),
        };

        let etype = EncryptionType::try_from(self.enc_part.etype)
            .map_err(|_| KrbError::UnsupportedEncryption)?;
        let key = keytab
            .get_key(&upn, &realm, self.enc_part.kvno.unwrap_or(0), etype)
            .map_err(|err| {
                error!(principal = %upn, %realm, "no key available for ticket");
                err
            })?;

        let plaintext = key.decrypt(&self.enc_part.cipher, KU_KDC_REP_TICKET)?;
        let inner = TaggedEncTicketPart::from_der(&plaintext).map_err(|err| {
            error!(?err, "unable to decode ticket encrypted part");
            KrbError::DerDecodeEncTicketPart
        })?;
        let enc_part = EncTicketPart::try_from(inner.0)?;

        trace!(cname = %enc_part.cname, "ticket opened");
        Ok(OpenedTicket {
            ticket: self,
            enc_part,
        })
    }
}

impl TryFrom<Asn1Ticket> for Ticket {
    type Error = KrbError;

    fn try_from(t: Asn1Ticket) -> Result<Self, Self::Error> {
        if t.tkt_vno != 5 {
            return Err(KrbError::TicketVersionInvalid);
        }
        Ok(Ticket {
            tkt_vno: t.tkt_vno,
            realm: t.realm.as_str().to_string(),
            sname: (&t.sname).into(),
            enc_part: EncryptedData {
                etype: t.enc_part.etype,
                kvno: t.enc_part.kvno,
                cipher: t.enc_part.cipher.as_bytes().to_vec(),
            },
        })
    }
}

impl TryFrom<Asn1EncTicketPart> for EncTicketPart {
    type Error = KrbError;

    fn try_from(etp: Asn1EncTicketPart) -> Result<Self, Self::Error> {
        let etype = EncryptionType::try_from(etp.key.key_type)
            .map_err(|_| KrbError::UnsupportedEncryption)?;
        let key = KrbKey::new(etype, etp.key.key_value.as_bytes().to_vec())?;

        let authorization_data = etp
            .authorization_data
            .unwrap_or_default()
            .into_iter()
            .map(|ad| AdEntry {
                ad_type: ad.ad_type,
                data: ad.ad_data.as_bytes().to_vec(),
            })
            .collect();

        Ok(EncTicketPart {
            flags: etp.flags,
            key,
            crealm: etp.crealm.as_str().to_string(),
            cname: (&etp.cname).into(),
            transited: TransitedEncoding {
                tr_type: etp.transited.tr_type,
                contents: etp.transited.contents.as_bytes().to_vec(),
            },
            auth_time: kerberos_time_to_system_time(etp.auth_time),
            start_time: etp.start_time.map(kerberos_time_to_system_time),
            end_time: kerberos_time_to_system_time(etp.end_time),
            renew_till: etp.renew_till.map(kerberos_time_to_system_time),
            authorization_data,
        })
    }
}

/// Everything needed to issue a fresh service ticket.
#[derive(Debug, Clone)]
pub struct MintTicket {
    pub cname: Name,
    pub crealm: String,
    pub sname: Name,
    pub srealm: String,
    pub flags: TicketFlags,
    pub etype: EncryptionType,
    pub kvno: u32,
    pub auth_time: SystemTime,
    pub start_time: Option<SystemTime>,
    pub end_time: SystemTime,
    pub renew_till: Option<SystemTime>,
    pub authorization_data: Vec<AdEntry>,
}

impl MintTicket {
    /// Issue the ticket: generate a session key of the etype's size, seal
    /// the ticket body under the server's long term key from the keytab,
    /// and return the wire ticket along with the session key.
    pub fn mint(self, keytab: &Keytab) -> Result<(Ticket, KrbKey), KrbError> {
        self.check_time_bounds()?;

        let session_key = KrbKey::random(self.etype)?;

        let authorization_data = if self.authorization_data.is_empty() {
            None
        } else {
            Some(
                self.authorization_data
                    .iter()
                    .map(|e| e.to_asn1())
                    .collect::<Result<Vec<_>, _>>()?,
            )
        };

        let etp = Asn1EncTicketPart {
            flags: self.flags,
            key: Asn1EncryptionKey {
                key_type: self.etype.into(),
                key_value: OctetString::new(session_key.value().to_vec())
                    .map_err(|_| KrbError::DerEncodeOctetString)?,
            },
            crealm: KerberosString::from_str(&self.crealm)?,
            cname: (&self.cname).try_into()?,
            transited: Asn1TransitedEncoding {
                tr_type: 0,
                contents: OctetString::new(Vec::new())
                    .map_err(|_| KrbError::DerEncodeOctetString)?,
            },
            auth_time: system_time_to_kerberos_time(self.auth_time)?,
            start_time: self
                .start_time
                .map(system_time_to_kerberos_time)
                .transpose()?,
            end_time: system_time_to_kerberos_time(self.end_time)?,
            renew_till: self
                .renew_till
                .map(system_time_to_kerberos_time)
                .transpose()?,
            client_addresses: None,
            authorization_data,
        };

        let plaintext = TaggedEncTicketPart(etp).to_der().map_err(|err| {
            error!(?err, "unable to encode ticket encrypted part");
            KrbError::DerEncodeEncTicketPart
        })?;

        let server_key = keytab.get_key(&self.sname, &self.srealm, self.kvno, self.etype)?;
        let cipher = server_key.encrypt(&plaintext, KU_KDC_REP_TICKET)?;

        let ticket = Ticket {
            tkt_vno: 5,
            realm: self.srealm,
            sname: self.sname,
            enc_part: EncryptedData {
                etype: self.etype.into(),
                kvno: Some(self.kvno),
                cipher,
            },
        };

        Ok((ticket, session_key))
    }

    fn check_time_bounds(&self) -> Result<(), KrbError> {
        let start = self.start_time.unwrap_or(self.auth_time);
        if start < self.auth_time || self.end_time < start {
            return Err(KrbError::TicketTimeBoundsInvalid);
        }
        if let Some(renew_till) = self.renew_till {
            if renew_till < self.end_time {
                return Err(KrbError::TicketTimeBoundsInvalid);
            }
        }
        Ok(())
    }
}

impl OpenedTicket {
    /// Look for a Windows PAC in the authorization data. When present, the
    /// PAC is parsed and both its signatures verified with the service key
    /// before it is returned.
    pub fn extract_pac(
        &self,
        keytab: &Keytab,
        kt_principal_override: Option<&str>,
    ) -> Result<Option<Pac>, KrbError> {
        for ad in &self.enc_part.authorization_data {
            if ad.ad_type != AuthorizationDataType::AdIfRelevant as i32 {
                continue;
            }
            let Ok(inner) = Vec::<AuthorizationData>::from_der(&ad.data) else {
                // Wrappers other services put here are not our concern.
                continue;
            };
            let Some(first) = inner.first() else {
                continue;
            };
            if first.ad_type != AuthorizationDataType::AdWin2kPac as i32 {
                continue;
            }

            let pac = Pac::unmarshal(first.ad_data.as_bytes())?;

            let upn = match kt_principal_override {
                Some(spn) => Name::parse_spn(spn)?.0,
                None => self.ticket.sname.clone(),
            };
            let etype = EncryptionType::try_from(self.ticket.enc_part.etype)
                .map_err(|_| KrbError::UnsupportedEncryption)?;
            let key = keytab.get_key(
                &upn,
                &self.ticket.realm,
                self.ticket.enc_part.kvno.unwrap_or(0),
                etype,
            )?;

            pac.process_info_buffers(&key)?;
            return Ok(Some(pac));
        }
        Ok(None)
    }
}

/// Encode a sequence of tickets with the framing the KRB-CRED and KDC-REQ
/// containers expect.
pub fn marshal_ticket_sequence(tkts: &[Ticket]) -> Result<Vec<u8>, KrbError> {
    let tagged = tkts
        .iter()
        .map(|t| t.to_asn1().map(TaggedTicket))
        .collect::<Result<Vec<_>, _>>()?;
    tagged_ticket::marshal_ticket_sequence(&tagged)
}

/// Decode a sequence of tickets; see the codec notes on the manual walk.
pub fn unmarshal_ticket_sequence(b: &[u8]) -> Result<Vec<Ticket>, KrbError> {
    tagged_ticket::unmarshal_ticket_sequence(b)?
        .into_iter()
        .map(|t| Ticket::try_from(t.0))
        .collect()
}
