use crate::error::KrbError;
use crate::ndr::NdrCursor;
use binrw::binrw;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 100ns ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_AS_TICKS: i64 = 116_444_736_000_000_000;

/// MS-DTYP 2.3.3 FILETIME: 100-nanosecond intervals since January 1, 1601
/// UTC, split into two little-endian 32 bit halves.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTime {
    pub low_date_time: u32,
    pub high_date_time: u32,
}

impl FileTime {
    /// Ticks since the Microsoft epoch.
    pub fn ms_epoch(self) -> i64 {
        ((self.high_date_time as i64) << 32) | self.low_date_time as i64
    }

    pub fn read(cursor: &mut NdrCursor) -> Result<Self, KrbError> {
        let low_date_time = cursor.read_u32()?;
        let high_date_time = cursor.read_u32()?;
        Ok(FileTime {
            low_date_time,
            high_date_time,
        })
    }

    pub fn to_system_time(self) -> Result<SystemTime, KrbError> {
        let ticks = self.ms_epoch() - UNIX_EPOCH_AS_TICKS;
        let ns = ticks.checked_mul(100).ok_or(KrbError::TimeOutOfRange)?;
        if ns >= 0 {
            Ok(UNIX_EPOCH + Duration::from_nanos(ns as u64))
        } else {
            Ok(UNIX_EPOCH - Duration::from_nanos(ns.unsigned_abs()))
        }
    }

    pub fn from_system_time(time: SystemTime) -> Result<Self, KrbError> {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => {
                let ns = i64::try_from(after.as_nanos()).map_err(|_| KrbError::TimeOutOfRange)?;
                (ns / 100)
                    .checked_add(UNIX_EPOCH_AS_TICKS)
                    .ok_or(KrbError::TimeOutOfRange)?
            }
            Err(before) => {
                let ns = i64::try_from(before.duration().as_nanos())
                    .map_err(|_| KrbError::TimeOutOfRange)?;
                UNIX_EPOCH_AS_TICKS
                    .checked_sub(ns / 100)
                    .ok_or(KrbError::TimeOutOfRange)?
            }
        };
        if ticks < 0 {
            return Err(KrbError::TimeOutOfRange);
        }
        Ok(FileTime {
            low_date_time: ticks as u32,
            high_date_time: (ticks >> 32) as u32,
        })
    }

    pub fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.low_date_time.to_le_bytes());
        out.extend_from_slice(&self.high_date_time.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::BinReaderExt;
    use std::io::Cursor;

    #[test]
    fn unix_epoch_is_the_offset() {
        let ft = FileTime {
            low_date_time: UNIX_EPOCH_AS_TICKS as u32,
            high_date_time: (UNIX_EPOCH_AS_TICKS >> 32) as u32,
        };
        assert_eq!(
            ft.to_system_time().expect("Failed to convert"),
            UNIX_EPOCH
        );
    }

    #[test]
    fn round_trips_through_system_time() {
        let ft = FileTime {
            low_date_time: 0x0E65_D917,
            high_date_time: 0x01C6_6A49,
        };
        let st = ft.to_system_time().expect("Failed to convert");
        let back = FileTime::from_system_time(st).expect("Failed to convert");
        assert_eq!(back, ft);
    }

    #[test]
    fn round_trips_through_filetime() {
        let now = UNIX_EPOCH + Duration::from_nanos(1_700_000_000_123_456_700);
        let ft = FileTime::from_system_time(now).expect("Failed to convert");
        let back = ft.to_system_time().expect("Failed to convert");
        assert_eq!(back, now);
    }

    #[test]
    fn wire_form_is_little_endian_low_first() {
        let blob = [0x17u8, 0xD9, 0x65, 0x0E, 0x49, 0x6A, 0xC6, 0x01];
        let ft: FileTime = Cursor::new(&blob).read_le().expect("Failed to parse");
        assert_eq!(ft.low_date_time, 0x0E65_D917);
        assert_eq!(ft.high_date_time, 0x01C6_6A49);

        let mut out = Vec::new();
        ft.write_le(&mut out);
        assert_eq!(out.as_slice(), &blob);
    }
}
