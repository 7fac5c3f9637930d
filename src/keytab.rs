//! An in-memory keytab: the long term keys a service holds, addressed by
//! principal, realm, key version and encryption type.

use crate::asn1::constants::EncryptionType;
use crate::crypto::KrbKey;
use crate::error::KrbError;
use crate::proto::Name;

#[derive(Debug, Clone, PartialEq)]
pub struct KeytabEntry {
    pub principal: Name,
    pub realm: String,
    pub kvno: u32,
    pub key: KrbKey,
    /// Seconds since the epoch at which the key was set, newest wins when
    /// the caller does not pin a kvno.
    pub timestamp: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keytab {
    entries: Vec<KeytabEntry>,
}

impl Keytab {
    pub fn new() -> Self {
        Keytab::default()
    }

    pub fn add_entry(&mut self, entry: KeytabEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[KeytabEntry] {
        &self.entries
    }

    /// Fetch the key for `(principal, realm, kvno, etype)`. A kvno of zero
    /// selects the highest key version available for the principal.
    pub fn get_key(
        &self,
        principal: &Name,
        realm: &str,
        kvno: u32,
        etype: EncryptionType,
    ) -> Result<KrbKey, KrbError> {
        let mut candidates: Vec<&KeytabEntry> = self
            .entries
            .iter()
            .filter(|e| {
                e.principal == *principal && e.realm == realm && e.key.etype() == etype
            })
            .collect();

        if kvno != 0 {
            candidates.retain(|e| e.kvno == kvno);
        }

        candidates
            .into_iter()
            .max_by_key(|e| (e.kvno, e.timestamp))
            .map(|e| e.key.clone())
            .ok_or(KrbError::KeytabNoKey)
    }
}
