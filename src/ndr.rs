//! A minimal NDR reader for the PAC info buffers.
//!
//! The cursor owns the byte slice, the read position and the stream
//! endianness in one value, so decoders do not thread those through every
//! call. All reads are bounds checked and surface `Malformed`-class errors,
//! never panics.

use crate::error::KrbError;

const COMMON_HEADER_FILLER: u32 = 0xCCCC_CCCC;

#[derive(Debug)]
pub struct NdrCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> NdrCursor<'a> {
    /// A cursor over a raw little-endian byte stream (the non-NDR PAC
    /// buffers are all little-endian).
    pub fn new_le(buf: &'a [u8]) -> Self {
        NdrCursor {
            buf,
            pos: 0,
            little_endian: true,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    pub fn is_empty(&self) -> bool {
        self.remaining().is_empty()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], KrbError> {
        let end = self.pos.checked_add(n).ok_or(KrbError::NdrTruncated)?;
        let out = self.buf.get(self.pos..end).ok_or(KrbError::NdrTruncated)?;
        self.pos = end;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), KrbError> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, KrbError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, KrbError> {
        let mut b = [0u8; 2];
        b.copy_from_slice(self.read_bytes(2)?);
        Ok(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, KrbError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.read_bytes(4)?);
        Ok(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, KrbError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.read_bytes(8)?);
        Ok(if self.little_endian {
            u64::from_le_bytes(b)
        } else {
            u64::from_be_bytes(b)
        })
    }

    /// Read the RPCETYPE common and private stream headers that prefix an
    /// NDR-marshalled PAC buffer, setting the cursor endianness from the
    /// data representation label. Returns the object buffer length.
    pub fn read_stream_headers(&mut self) -> Result<u32, KrbError> {
        let version = self.read_u8()?;
        if version != 1 {
            return Err(KrbError::NdrHeaderInvalid);
        }
        let representation = self.read_u8()?;
        self.little_endian = representation & 0xF0 == 0x10;

        let _header_len = self.read_u16()?;
        if self.read_u32()? != COMMON_HEADER_FILLER {
            return Err(KrbError::NdrHeaderInvalid);
        }

        let object_len = self.read_u32()?;
        if self.read_u32()? != 0 {
            return Err(KrbError::NdrHeaderInvalid);
        }

        Ok(object_len)
    }

    /// Read a uni-dimensional conformant array header, i.e. the max count.
    pub fn read_conformant_array_header(&mut self) -> Result<u32, KrbError> {
        self.read_u32()
    }

    /// Read a conformant varying UTF-16 string: max count, offset and
    /// actual count headers followed by the code units.
    pub fn read_conformant_varying_string(&mut self) -> Result<String, KrbError> {
        let max = self.read_u32()? as u64;
        let offset = self.read_u32()? as u64;
        let actual = self.read_u32()? as u64;

        if offset + actual > max {
            return Err(KrbError::NdrStringInvalid);
        }

        if actual * 2 > self.remaining().len() as u64 {
            return Err(KrbError::NdrTruncated);
        }

        let mut units = Vec::with_capacity(actual as usize);
        for _ in 0..actual {
            units.push(self.read_u16()?);
        }
        // A conformant varying string carries its terminator in the actual
        // count; strip it if present.
        if units.last() == Some(&0) {
            units.pop();
        }

        String::from_utf16(&units).map_err(|_| KrbError::NdrStringInvalid)
    }

    /// The remaining bytes must all be zero padding.
    pub fn expect_zero_tail(&self) -> Result<(), KrbError> {
        if self.remaining().iter().any(|b| *b != 0) {
            return Err(KrbError::PacTrailingBytes);
        }
        Ok(())
    }
}
