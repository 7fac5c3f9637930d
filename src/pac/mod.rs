//! Microsoft Privilege Attribute Certificate parsing and verification.
//!
//! A PAC is a directory of typed info buffers addressed by offset from the
//! start of the PAC byte string. Verification recomputes the server
//! checksum over an image of the PAC with both signatures zeroed, and the
//! KDC checksum over the server signature itself.

mod client_info;
mod credentials_info;
mod device_info;
mod info_buffer;
mod signature_data;

pub use self::client_info::ClientInfo;
pub use self::credentials_info::{
    CredentialData, CredentialsInfo, NtlmSupplementalCred, SecpkgSupplementalCred,
};
pub use self::device_info::DeviceInfo;
pub use self::info_buffer::{ul_type, InfoBuffer};
pub use self::signature_data::SignatureData;

use crate::asn1::constants::ChecksumType;
use crate::constants::KU_KERB_NON_KERB_CKSUM_SALT;
use crate::crypto::{ct_eq, keyed_checksum, KrbKey};
use crate::error::KrbError;
use crate::ndr::NdrCursor;

use binrw::BinReaderExt;
use std::io::Cursor;
use tracing::{error, trace};

/// One parsed info buffer: its directory entry plus the typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacBuffer {
    pub info: InfoBuffer,
    pub payload: PacPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacPayload {
    ClientInfo(ClientInfo),
    Credentials(CredentialsInfo),
    ServerSignature(SignatureData),
    KdcSignature(SignatureData),
    DeviceInfo(DeviceInfo),
    /// Buffers this crate does not interpret, kept byte for byte.
    Opaque(Vec<u8>),
}

/// MS-PAC section 2.3 PACTYPE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pac {
    raw: Vec<u8>,
    pub buffers: Vec<PacBuffer>,
}

impl Pac {
    pub fn unmarshal(b: &[u8]) -> Result<Self, KrbError> {
        let mut header = NdrCursor::new_le(b);
        let count = header.read_u32()?;
        let version = header.read_u32()?;
        if version != 0 {
            return Err(KrbError::PacVersionInvalid);
        }

        let directory_len = (count as usize)
            .checked_mul(16)
            .ok_or(KrbError::PacTruncated)?;
        let directory = b.get(8..8 + directory_len).ok_or(KrbError::PacTruncated)?;
        let mut directory = Cursor::new(directory);

        let mut buffers = Vec::new();
        for _ in 0..count {
            let info: InfoBuffer = directory
                .read_le()
                .map_err(|_| KrbError::PacTruncated)?;

            if info.offset % 8 != 0 {
                return Err(KrbError::PacBufferMisaligned);
            }
            let start = usize::try_from(info.offset).map_err(|_| KrbError::PacBufferOutOfBounds)?;
            let end = start
                .checked_add(info.cb_buffer_size as usize)
                .filter(|end| *end <= b.len())
                .ok_or(KrbError::PacBufferOutOfBounds)?;
            let body = &b[start..end];

            let payload = match info.ul_type {
                ul_type::CLIENT_INFO => PacPayload::ClientInfo(ClientInfo::unmarshal(body)?),
                ul_type::CREDENTIALS => {
                    PacPayload::Credentials(CredentialsInfo::unmarshal(body)?)
                }
                ul_type::SERVER_SIGNATURE => {
                    PacPayload::ServerSignature(SignatureData::unmarshal(body)?.0)
                }
                ul_type::KDC_SIGNATURE => {
                    PacPayload::KdcSignature(SignatureData::unmarshal(body)?.0)
                }
                ul_type::DEVICE_INFO => PacPayload::DeviceInfo(DeviceInfo::unmarshal(body)?),
                _ => PacPayload::Opaque(body.to_vec()),
            };

            buffers.push(PacBuffer { info, payload });
        }

        Ok(Pac {
            raw: b.to_vec(),
            buffers,
        })
    }

    /// The PAC byte string as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn client_info(&self) -> Option<&ClientInfo> {
        self.buffers.iter().find_map(|b| match &b.payload {
            PacPayload::ClientInfo(ci) => Some(ci),
            _ => None,
        })
    }

    pub fn credentials_info(&self) -> Option<&CredentialsInfo> {
        self.buffers.iter().find_map(|b| match &b.payload {
            PacPayload::Credentials(ci) => Some(ci),
            _ => None,
        })
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.buffers.iter().find_map(|b| match &b.payload {
            PacPayload::DeviceInfo(di) => Some(di),
            _ => None,
        })
    }

    pub fn server_signature(&self) -> Option<(&InfoBuffer, &SignatureData)> {
        self.buffers.iter().find_map(|b| match &b.payload {
            PacPayload::ServerSignature(sig) => Some((&b.info, sig)),
            _ => None,
        })
    }

    pub fn kdc_signature(&self) -> Option<(&InfoBuffer, &SignatureData)> {
        self.buffers.iter().find_map(|b| match &b.payload {
            PacPayload::KdcSignature(sig) => Some((&b.info, sig)),
            _ => None,
        })
    }

    /// Verify both PAC signatures with the service key.
    ///
    /// The server checksum is computed over an image of the PAC in which
    /// the signature octets of both signature buffers are zeroed at their
    /// wire positions (the buffer envelopes stay intact), and the KDC
    /// checksum over the original server signature octets. A mismatch in
    /// either comparison is reported as one combined failure.
    pub fn process_info_buffers(&self, server_key: &KrbKey) -> Result<(), KrbError> {
        let (server_info, server_sig) = self
            .server_signature()
            .ok_or(KrbError::PacMissingSignature)?;
        let (kdc_info, kdc_sig) = self.kdc_signature().ok_or(KrbError::PacMissingSignature)?;

        let server_cktype = ChecksumType::from_pac_wire(server_sig.signature_type)
            .ok_or(KrbError::UnsupportedChecksum)?;
        let kdc_cktype = ChecksumType::from_pac_wire(kdc_sig.signature_type)
            .ok_or(KrbError::UnsupportedChecksum)?;

        // Copy then zero; the received bytes are never mutated.
        let mut zeroed = self.raw.clone();
        for (info, sig) in [(server_info, server_sig), (kdc_info, kdc_sig)] {
            let start = info.offset as usize + SignatureData::SIGNATURE_OFFSET;
            zeroed
                .get_mut(start..start + sig.signature.len())
                .ok_or(KrbError::PacBufferOutOfBounds)?
                .fill(0);
        }

        let server_checksum = keyed_checksum(
            &zeroed,
            server_key,
            server_cktype,
            KU_KERB_NON_KERB_CKSUM_SALT,
        )?;
        let kdc_checksum = keyed_checksum(
            &server_sig.signature,
            server_key,
            kdc_cktype,
            KU_KERB_NON_KERB_CKSUM_SALT,
        )?;

        // Evaluate both comparisons before deciding so the outcome does not
        // reveal which signature failed.
        let server_ok = ct_eq(&server_checksum, &server_sig.signature);
        let kdc_ok = ct_eq(&kdc_checksum, &kdc_sig.signature);
        if !(server_ok & kdc_ok) {
            error!("PAC signature verification failed");
            return Err(KrbError::PacChecksumFailed);
        }
        trace!("PAC signature verification succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::constants::EncryptionType;

    fn align8(v: usize) -> usize {
        v.div_ceil(8) * 8
    }

    /// Assemble a PAC image from (ul_type, body) pairs, signatures included
    /// as given.
    fn build_pac(buffers: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let directory_end = 8 + buffers.len() * 16;
        let mut offset = align8(directory_end);

        let mut header = Vec::new();
        header.extend_from_slice(&(buffers.len() as u32).to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());

        let mut payloads = Vec::new();
        for (ul_type, body) in buffers {
            header.extend_from_slice(&ul_type.to_le_bytes());
            header.extend_from_slice(&(body.len() as u32).to_le_bytes());
            header.extend_from_slice(&(offset as u64).to_le_bytes());

            payloads.resize(offset - directory_end, 0);
            payloads.extend_from_slice(body);
            offset = align8(offset + body.len());
        }
        payloads.resize(offset - directory_end, 0);

        header.extend_from_slice(&payloads);
        header
    }

    fn client_info_body() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&[0x00, 0x49, 0xD9, 0x0E, 0x65, 0x6A, 0xC6, 0x01]);
        b.extend_from_slice(&8u16.to_le_bytes());
        for unit in [0x6Cu16, 0x7A, 0x68, 0x75] {
            b.extend_from_slice(&unit.to_le_bytes());
        }
        b
    }

    fn signature_body(cktype: u32, signature: &[u8]) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&cktype.to_le_bytes());
        b.extend_from_slice(signature);
        b
    }

    /// Build a PAC whose two AES256 signatures are genuinely computed with
    /// the given key.
    fn build_signed_pac(key: &KrbKey) -> Vec<u8> {
        let cktype = i32::from(ChecksumType::HMAC_SHA1_96_AES256) as u32;

        let mut pac = build_pac(&[
            (ul_type::CLIENT_INFO, client_info_body()),
            (ul_type::SERVER_SIGNATURE, signature_body(cktype, &[0; 12])),
            (ul_type::KDC_SIGNATURE, signature_body(cktype, &[0; 12])),
        ]);

        // Signatures are zero at this point, which is exactly the image the
        // server checksum is defined over.
        let server_checksum = keyed_checksum(
            &pac,
            key,
            ChecksumType::HMAC_SHA1_96_AES256,
            KU_KERB_NON_KERB_CKSUM_SALT,
        )
        .expect("Failed to checksum");
        let kdc_checksum = keyed_checksum(
            &server_checksum,
            key,
            ChecksumType::HMAC_SHA1_96_AES256,
            KU_KERB_NON_KERB_CKSUM_SALT,
        )
        .expect("Failed to checksum");

        let parsed = Pac::unmarshal(&pac).expect("Failed to parse");
        let server_at = parsed.server_signature().expect("missing").0.offset as usize + 4;
        let kdc_at = parsed.kdc_signature().expect("missing").0.offset as usize + 4;
        pac[server_at..server_at + 12].copy_from_slice(&server_checksum);
        pac[kdc_at..kdc_at + 12].copy_from_slice(&kdc_checksum);
        pac
    }

    #[test]
    fn pac_signature_verification() {
        let key = KrbKey::random(EncryptionType::AES256_CTS_HMAC_SHA1_96)
            .expect("Failed to generate key");
        let blob = build_signed_pac(&key);

        let pac = Pac::unmarshal(&blob).expect("Failed to parse");
        pac.process_info_buffers(&key).expect("Failed to verify");

        // Flip one byte of a non-signature buffer: verification must fail.
        let mut tampered = blob.clone();
        let client_at = pac
            .buffers
            .iter()
            .find(|b| b.info.ul_type == ul_type::CLIENT_INFO)
            .expect("missing client info")
            .info
            .offset as usize;
        tampered[client_at] ^= 0xFF;
        let pac = Pac::unmarshal(&tampered).expect("Failed to parse");
        assert_eq!(
            pac.process_info_buffers(&key),
            Err(KrbError::PacChecksumFailed)
        );

        // Revert: verification succeeds again.
        let pac = Pac::unmarshal(&blob).expect("Failed to parse");
        pac.process_info_buffers(&key).expect("Failed to verify");
    }

    #[test]
    fn pac_verification_with_wrong_key_fails() {
        let key = KrbKey::random(EncryptionType::AES256_CTS_HMAC_SHA1_96)
            .expect("Failed to generate key");
        let other = KrbKey::random(EncryptionType::AES256_CTS_HMAC_SHA1_96)
            .expect("Failed to generate key");
        let blob = build_signed_pac(&key);
        let pac = Pac::unmarshal(&blob).expect("Failed to parse");
        assert_eq!(
            pac.process_info_buffers(&other),
            Err(KrbError::PacChecksumFailed)
        );
    }

    #[test]
    fn pac_missing_kdc_signature() {
        let cktype = 16u32;
        let blob = build_pac(&[
            (ul_type::CLIENT_INFO, client_info_body()),
            (ul_type::SERVER_SIGNATURE, signature_body(cktype, &[0; 12])),
        ]);
        let key = KrbKey::random(EncryptionType::AES256_CTS_HMAC_SHA1_96)
            .expect("Failed to generate key");
        let pac = Pac::unmarshal(&blob).expect("Failed to parse");
        assert_eq!(
            pac.process_info_buffers(&key),
            Err(KrbError::PacMissingSignature)
        );
    }

    #[test]
    fn zeroed_image_is_same_length() {
        let key = KrbKey::random(EncryptionType::AES256_CTS_HMAC_SHA1_96)
            .expect("Failed to generate key");
        let blob = build_signed_pac(&key);
        let pac = Pac::unmarshal(&blob).expect("Failed to parse");

        let mut zeroed = blob.clone();
        let (info, sig) = pac.server_signature().expect("missing");
        let at = info.offset as usize + 4;
        zeroed[at..at + sig.signature.len()].fill(0);
        assert_eq!(zeroed.len(), blob.len());
    }

    #[test]
    fn misaligned_buffer_rejected() {
        let mut blob = build_pac(&[(ul_type::CLIENT_INFO, client_info_body())]);
        // Offset field of the single directory entry sits at byte 16.
        blob[16] += 4;
        assert!(matches!(
            Pac::unmarshal(&blob),
            Err(KrbError::PacBufferMisaligned | KrbError::PacBufferOutOfBounds)
        ));
    }

    #[test]
    fn out_of_bounds_buffer_rejected() {
        let mut blob = build_pac(&[(ul_type::CLIENT_INFO, client_info_body())]);
        // Inflate the buffer size past the end of the PAC.
        blob[12] = 0xFF;
        assert_eq!(Pac::unmarshal(&blob), Err(KrbError::PacBufferOutOfBounds));
    }

    // A complete PAC captured from a Windows domain controller: a
    // KERB_VALIDATION_INFO buffer (kept opaque), a client info buffer and
    // the two HMAC-MD5 signature buffers.
    const CAPTURED_PAC: &str = concat!(
        "040000000000000001000000b004000048000000000000000a00000012000000f8040000000000000600000014000000",
        "10050000000000000700000014000000280500000000000001100800cccccccca00400000000000000000200d186660f",
        "656ac601ffffffffffffff7fffffffffffffff7f17d439fe784ac6011794a328424bc601175424977a81c60108000800",
        "040002002400240008000200120012000c00020000000000100002000000000014000200000000001800020054100000",
        "97792c00010200001a0000001c000200200000000000000000000000000000000000000016001800200002000a000c00",
        "240002002800020000000000000000001000000000000000000000000000000000000000000000000000000000000000",
        "0d0000002c0002000000000000000000000000000400000000000000040000006c007a00680075001200000000000000",
        "120000004c0069007100690061006e00670028004c006100720072007900290020005a00680075000900000000000000",
        "090000006e0074006400730032002e006200610074000000000000000000000000000000000000000000000000000000",
        "0000000000000000000000001a00000061c433000700000009c32d00070000005eb43200070000000102000007000000",
        "97b92c00070000002bf1320007000000ce30330007000000a72e2e00070000002af132000700000098b92c0007000000",
        "62c4330007000000940133000700000076c4330007000000aefe2d000700000032d22c00070000001608320007000000",
        "425b2e00070000005fb4320007000000ca9c35000700000085442d0007000000c2f0320007000000e9ea310007000000",
        "ed8e2e0007000000b6eb310007000000ab2e2e0007000000720e2e00070000000c000000000000000b0000004e005400",
        "4400450056002d00440043002d003000350000000600000000000000050000004e005400440045005600000004000000",
        "0104000000000005150000005951b81766725d2564633b0b0d0000003000020007000000340002000700002038000200",
        "070000203c000200070000204000020007000020440002000700002048000200070000204c0002000700002050000200",
        "07000020540002000700002058000200070000205c000200070000206000020007000020050000000105000000000005",
        "15000000b9301b2eb7414c6c8c3b351501020000050000000105000000000005150000005951b81766725d2564633b0b",
        "74542f00050000000105000000000005150000005951b81766725d2564633b0be8383200050000000105000000000005",
        "150000005951b81766725d2564633b0bcd383200050000000105000000000005150000005951b81766725d2564633b0b",
        "5db43200050000000105000000000005150000005951b81766725d2564633b0b41163500050000000105000000000005",
        "150000005951b81766725d2564633b0be8ea3100050000000105000000000005150000005951b81766725d2564633b0b",
        "c1193200050000000105000000000005150000005951b81766725d2564633b0b29f13200050000000105000000000005",
        "150000005951b81766725d2564633b0b0f5f2e00050000000105000000000005150000005951b81766725d2564633b0b",
        "2f5b2e00050000000105000000000005150000005951b81766725d2564633b0bef8f3100050000000105000000000005",
        "150000005951b81766725d2564633b0b075f2e00000000000049d90e656ac60108006c007a0068007500000000000000",
        "76ffffff41edce9a34815d3aef7bc98874805d250000000076fffffff7a534dab2c02986efe0fbe5110a4f3200000000",
    );

    #[test]
    fn captured_pac_parses() {
        let blob = hex::decode(CAPTURED_PAC).expect("Failed to decode sample");
        let pac = Pac::unmarshal(&blob).expect("Failed to parse");
        assert_eq!(pac.buffers.len(), 4);

        assert_eq!(pac.buffers[0].info.ul_type, ul_type::KERB_VALIDATION_INFO);
        assert_eq!(pac.buffers[0].info.cb_buffer_size, 1200);
        assert!(matches!(pac.buffers[0].payload, PacPayload::Opaque(_)));

        let client_info = pac.client_info().expect("missing client info");
        assert_eq!(client_info.name, "lzhu");

        let (server_info, server_sig) = pac.server_signature().expect("missing server signature");
        assert_eq!(server_info.offset, 1296);
        assert_eq!(server_sig.signature_type, 0xFFFF_FF76);
        assert_eq!(server_sig.signature.len(), 16);

        let (_, kdc_sig) = pac.kdc_signature().expect("missing KDC signature");
        assert_eq!(kdc_sig.signature.len(), 16);
    }

    #[test]
    fn unknown_buffer_types_are_preserved() {
        let blob = build_pac(&[
            (ul_type::UPN_DNS_INFO, vec![1, 2, 3, 4, 5, 6, 7, 8]),
            (99, vec![0xAA; 8]),
        ]);
        let pac = Pac::unmarshal(&blob).expect("Failed to parse");
        assert_eq!(
            pac.buffers[0].payload,
            PacPayload::Opaque(vec![1, 2, 3, 4, 5, 6, 7, 8])
        );
        assert_eq!(pac.buffers[1].payload, PacPayload::Opaque(vec![0xAA; 8]));
    }
}
