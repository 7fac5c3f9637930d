use super::name::Name;
use super::{kerberos_time_to_system_time, system_time_to_kerberos_time};
use crate::asn1::constants::KrbErrorCode;
use crate::asn1::kerberos_string::KerberosString;
use crate::asn1::krb_error::{KrbErrorMsg, TaggedKrbErrorMsg};
use crate::error::KrbError;

use der::{Decode, Encode};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A decoded KRB-ERROR reply: the typed failure a KDC or acceptor sends in
/// place of the expected message. The raw response bytes ride along so
/// callers that need the untyped form (e-data, proxying) keep them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReply {
    pub error_code: i32,
    pub service_name: Name,
    pub service_realm: String,
    pub server_time: SystemTime,
    pub error_text: Option<String>,
    pub raw: Vec<u8>,
}

impl ErrorReply {
    pub fn new(
        code: KrbErrorCode,
        service_name: Name,
        service_realm: &str,
        server_time: SystemTime,
    ) -> Self {
        ErrorReply {
            error_code: code as i32,
            service_name,
            service_realm: service_realm.to_string(),
            server_time,
            error_text: None,
            raw: Vec::new(),
        }
    }

    /// Attempt to decode `b` as a KRB-ERROR.
    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let msg = TaggedKrbErrorMsg::from_der(b).map_err(|_| KrbError::DerDecodeKrbError)?;
        let msg = msg.0;
        Ok(ErrorReply {
            error_code: msg.error_code,
            service_name: (&msg.service_name).into(),
            service_realm: msg.service_realm.as_str().to_string(),
            server_time: kerberos_time_to_system_time(msg.stime),
            error_text: msg.error_text.map(|t| t.as_str().to_string()),
            raw: b.to_vec(),
        })
    }

    pub fn marshal(&self) -> Result<Vec<u8>, KrbError> {
        let susec = self
            .server_time
            .duration_since(UNIX_EPOCH)
            .map_err(|_| KrbError::TimeOutOfRange)?
            .subsec_micros();

        let msg = KrbErrorMsg {
            pvno: 5,
            msg_type: 30,
            ctime: None,
            cusec: None,
            stime: system_time_to_kerberos_time(self.server_time)?,
            susec,
            error_code: self.error_code,
            crealm: None,
            cname: None,
            service_realm: KerberosString::from_str(&self.service_realm)?,
            service_name: (&self.service_name).try_into()?,
            error_text: self
                .error_text
                .as_deref()
                .map(KerberosString::from_str)
                .transpose()?,
            error_data: None,
        };

        TaggedKrbErrorMsg(msg)
            .to_der()
            .map_err(|_| KrbError::DerEncodeKrbError)
    }

    pub fn code(&self) -> Option<KrbErrorCode> {
        KrbErrorCode::try_from(self.error_code).ok()
    }

    pub fn is_response_too_big(&self) -> bool {
        self.error_code == KrbErrorCode::KrbErrResponseTooBig as i32
    }
}
