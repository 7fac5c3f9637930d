use binrw::binrw;

/// Recognised PAC_INFO_BUFFER ulType values, MS-PAC section 2.4. Anything
/// else is preserved opaquely rather than rejected.
pub mod ul_type {
    pub const KERB_VALIDATION_INFO: u32 = 1;
    pub const CREDENTIALS: u32 = 2;
    pub const SERVER_SIGNATURE: u32 = 6;
    pub const KDC_SIGNATURE: u32 = 7;
    pub const CLIENT_INFO: u32 = 10;
    pub const S4U_DELEGATION_INFO: u32 = 11;
    pub const UPN_DNS_INFO: u32 = 12;
    pub const CLIENT_CLAIMS_INFO: u32 = 13;
    pub const DEVICE_INFO: u32 = 14;
    pub const DEVICE_CLAIMS_INFO: u32 = 15;
}

/// MS-PAC section 2.4 PAC_INFO_BUFFER: one entry of the info buffer
/// directory at the head of the PAC.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoBuffer {
    pub ul_type: u32,
    pub cb_buffer_size: u32,
    /// Offset from the start of the PAC byte string; 8-byte aligned.
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::BinReaderExt;
    use std::io::Cursor;

    #[test]
    fn info_buffer_wire_layout() {
        let blob = [
            0x06, 0x00, 0x00, 0x00, // ul_type = 6
            0x14, 0x00, 0x00, 0x00, // size = 20
            0x10, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // offset = 0x510
        ];
        let ib: InfoBuffer = Cursor::new(&blob).read_le().expect("Failed to parse");
        assert_eq!(ib.ul_type, ul_type::SERVER_SIGNATURE);
        assert_eq!(ib.cb_buffer_size, 20);
        assert_eq!(ib.offset, 0x510);
    }
}
