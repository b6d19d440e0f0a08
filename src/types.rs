//! Types that specify what is contained in a ZIP.

use time::OffsetDateTime;

/// Representation of dates in the MS-DOS format used by ZIP headers.
///
/// The format keeps 2-second precision and can only express years from 1980
/// through 2107; wall-clock components outside the representable range are
/// clamped into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Default for DateTime {
    /// Constructs a 'default' datetime of 1980-01-01 00:00:00
    fn default() -> DateTime {
        DateTime {
            year: 1980,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl DateTime {
    /// Constructs a DateTime from the given components, clamping each into
    /// the representable MS-DOS range.
    pub fn from_date_and_time(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> DateTime {
        DateTime {
            year: year.clamp(1980, 2107),
            month: month.min(12),
            day: day.min(31),
            hour: hour.min(23),
            minute: minute.min(59),
            second: second.min(59),
        }
    }

    /// Captures the current local wall-clock time, falling back to UTC when
    /// the local offset cannot be determined.
    pub fn now_local() -> DateTime {
        OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .into()
    }

    /// Gets the time portion of this datetime in MS-DOS format
    pub fn timepart(&self) -> u16 {
        (self.second as u16) >> 1 | (self.minute as u16) << 5 | (self.hour as u16) << 11
    }

    /// Gets the date portion of this datetime in MS-DOS format
    pub fn datepart(&self) -> u16 {
        (self.day as u16) | (self.month as u16) << 5 | (self.year - 1980) << 9
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(dt: OffsetDateTime) -> DateTime {
        let year = dt.year().clamp(1980, 2107) as u16;
        DateTime::from_date_and_time(
            year,
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }
}

/// Metadata of an entry whose local header has already been streamed out.
#[derive(Debug, Clone)]
pub(crate) struct ZipFileData {
    /// Name bytes as stored in both headers, at most 0xFFFE of them.
    pub file_name_raw: Vec<u8>,
    /// CRC32 checksum
    pub crc32: u32,
    /// Size of the compressed entry body, headers and descriptor excluded
    pub compressed_size: u64,
    /// Size of the entry when extracted
    pub uncompressed_size: u64,
    /// Absolute offset of the entry's local header
    pub header_start: u64,
}

#[cfg(test)]
mod test {
    use super::DateTime;

    #[test]
    fn datetime_default() {
        let dt = DateTime::default();
        assert_eq!(dt.timepart(), 0);
        // 1980-01-01: day 1, month 1, zero years since 1980
        assert_eq!(dt.datepart(), 1 | 1 << 5);
    }

    #[test]
    fn datetime_parts() {
        let dt = DateTime::from_date_and_time(2018, 11, 17, 10, 38, 30);
        assert_eq!(dt.timepart(), 15 | 38 << 5 | 10 << 11);
        assert_eq!(dt.datepart(), 17 | 11 << 5 | 38 << 9);
    }

    #[test]
    fn datetime_clamps_out_of_range_components() {
        let dt = DateTime::from_date_and_time(1907, 13, 32, 25, 61, 62);
        assert_eq!(dt.datepart(), 31 | 12 << 5);
        assert_eq!(dt.timepart(), (59 >> 1) | 59 << 5 | 23 << 11);

        let dt = DateTime::from_date_and_time(3000, 1, 1, 0, 0, 0);
        assert_eq!(dt.datepart() >> 9, 127);
    }

    #[test]
    fn datetime_from_offset_date_time() {
        let odt = time::Date::from_calendar_date(2024, time::Month::May, 17)
            .unwrap()
            .with_hms(12, 34, 56)
            .unwrap()
            .assume_utc();
        let dt: DateTime = odt.into();
        assert_eq!(dt.datepart(), 17 | 5 << 5 | 44 << 9);
        assert_eq!(dt.timepart(), 28 | 34 << 5 | 12 << 11);
    }
}
