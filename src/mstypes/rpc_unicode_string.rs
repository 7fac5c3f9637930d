use crate::error::KrbError;
use crate::ndr::NdrCursor;

/// MS-DTYP 2.3.10 RPC_UNICODE_STRING. The header carries byte lengths and a
/// pointer referent; the character data itself sits in the NDR deferred
/// pointer region and is read separately.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RpcUnicodeString {
    pub length: u16,
    pub maximum_length: u16,
    pub buffer_referent: u32,
    pub value: String,
}

impl RpcUnicodeString {
    pub fn read_header(cursor: &mut NdrCursor) -> Result<Self, KrbError> {
        let length = cursor.read_u16()?;
        let maximum_length = cursor.read_u16()?;
        if maximum_length < length || length % 2 != 0 || maximum_length % 2 != 0 {
            return Err(KrbError::UnicodeStringHeaderInvalid);
        }
        let buffer_referent = cursor.read_u32()?;
        Ok(RpcUnicodeString {
            length,
            maximum_length,
            buffer_referent,
            value: String::new(),
        })
    }

    /// Pull the deferred string body from the cursor's current position.
    pub fn read_value(&mut self, cursor: &mut NdrCursor) -> Result<(), KrbError> {
        self.value = cursor.read_conformant_varying_string()?;
        Ok(())
    }
}
