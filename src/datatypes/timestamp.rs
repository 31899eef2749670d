// ABOUTME: Semi-octet service centre timestamp used for TP-SCTS, TP-DT and absolute validity
// ABOUTME: Seven swapped-BCD octets with a signed quarter-hour time zone, convertible to Unix time

use crate::codec::{CodecError, Decodable, Encodable, decode_bytes};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wire size of a timestamp
pub const TIMESTAMP_LEN: usize = 7;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_QUARTER: i64 = 900;

/// A TS 23.040 9.2.3.11 timestamp
///
/// The components are local time in the zone given by `tz_quarters`
/// (signed offset from UTC in units of 15 minutes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub tz_quarters: i8,
}

fn invalid(component: &'static str, value: impl fmt::Display) -> CodecError {
    CodecError::field("timestamp", format!("{component} out of range: {value}"))
}

// Swapped semi-octet: units digit in the high nibble
pub(crate) fn to_semi_octet(value: u8) -> u8 {
    ((value % 10) << 4) | (value / 10)
}

pub(crate) fn from_semi_octet(byte: u8, component: &'static str) -> Result<u8, CodecError> {
    let (tens, units) = (byte & 0x0F, byte >> 4);
    if tens > 9 || units > 9 {
        return Err(invalid(component, format!("{byte:#04x}")));
    }
    Ok(tens * 10 + units)
}

// Days since 1970-01-01 for a proleptic Gregorian date
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

impl Timestamp {
    /// Build a timestamp from Unix seconds, expressed in the given zone
    pub fn from_unix(secs: i64, tz_quarters: i8) -> Self {
        let local = secs + i64::from(tz_quarters) * SECONDS_PER_QUARTER;
        let (year, month, day) = civil_from_days(local.div_euclid(SECONDS_PER_DAY));
        let rem = local.rem_euclid(SECONDS_PER_DAY);
        Self {
            year: year as u16,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: (rem % 3600 / 60) as u8,
            second: (rem % 60) as u8,
            tz_quarters,
        }
    }

    /// Seconds since the Unix epoch
    pub fn to_unix(&self) -> i64 {
        let days = days_from_civil(
            i64::from(self.year),
            i64::from(self.month),
            i64::from(self.day),
        );
        days * SECONDS_PER_DAY
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
            - i64::from(self.tz_quarters) * SECONDS_PER_QUARTER
    }

    /// Current wall-clock time in UTC
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::from_unix(secs, 0)
    }

    /// The same instant plus a duration, kept in this timestamp's zone
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let secs = i64::try_from(duration.as_secs()).ok()?;
        let unix = self.to_unix().checked_add(secs)?;
        Some(Self::from_unix(unix, self.tz_quarters))
    }

    /// Signed difference `self - earlier` in seconds
    pub fn seconds_since(&self, earlier: &Timestamp) -> i64 {
        self.to_unix() - earlier.to_unix()
    }

    /// Check every component against the ranges the wire format can carry
    pub fn validate(&self) -> Result<(), CodecError> {
        if !(2000..=2099).contains(&self.year) {
            return Err(invalid("year", self.year));
        }
        if !(1..=12).contains(&self.month) {
            return Err(invalid("month", self.month));
        }
        if !(1..=31).contains(&self.day) {
            return Err(invalid("day", self.day));
        }
        if self.hour > 23 {
            return Err(invalid("hour", self.hour));
        }
        if self.minute > 59 {
            return Err(invalid("minute", self.minute));
        }
        if self.second > 59 {
            return Err(invalid("second", self.second));
        }
        if !(-79..=79).contains(&self.tz_quarters) {
            return Err(invalid("time zone", self.tz_quarters));
        }
        Ok(())
    }
}

impl Encodable for Timestamp {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;
        buf.put_u8(to_semi_octet((self.year % 100) as u8));
        buf.put_u8(to_semi_octet(self.month));
        buf.put_u8(to_semi_octet(self.day));
        buf.put_u8(to_semi_octet(self.hour));
        buf.put_u8(to_semi_octet(self.minute));
        buf.put_u8(to_semi_octet(self.second));
        let mut tz = to_semi_octet(self.tz_quarters.unsigned_abs());
        if self.tz_quarters < 0 {
            tz |= 0x08;
        }
        buf.put_u8(tz);
        Ok(())
    }
}

impl Decodable for Timestamp {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let raw = decode_bytes(buf, TIMESTAMP_LEN)?;
        let negative = raw[6] & 0x08 != 0;
        let quarters = from_semi_octet(raw[6] & !0x08, "time zone")? as i8;
        let timestamp = Timestamp {
            year: 2000 + u16::from(from_semi_octet(raw[0], "year")?),
            month: from_semi_octet(raw[1], "month")?,
            day: from_semi_octet(raw[2], "day")?,
            hour: from_semi_octet(raw[3], "hour")?,
            minute: from_semi_octet(raw[4], "minute")?,
            second: from_semi_octet(raw[5], "second")?,
            tz_quarters: if negative { -quarters } else { quarters },
        };
        timestamp.validate()?;
        Ok(timestamp)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.tz_quarters < 0 { '-' } else { '+' };
        let minutes = u16::from(self.tz_quarters.unsigned_abs()) * 15;
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{:02}:{:02}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            sign,
            minutes / 60,
            minutes % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Timestamp {
        Timestamp {
            year: 2011,
            month: 3,
            day: 22,
            hour: 14,
            minute: 25,
            second: 40,
            tz_quarters: 36,
        }
    }

    #[test]
    fn encodes_swapped_semi_octets() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(&bytes[..], &[0x11, 0x30, 0x22, 0x41, 0x52, 0x04, 0x63]);
        assert_eq!(Timestamp::from_bytes(&bytes).unwrap(), sample());
        assert_eq!(sample().to_string(), "2011-03-22T14:25:40+09:00");
    }

    #[test]
    fn negative_zone_sets_sign_bit() {
        let ts = Timestamp {
            tz_quarters: -20,
            ..sample()
        };
        let bytes = ts.to_bytes().unwrap();
        assert_eq!(bytes[6], 0x0A);
        assert_eq!(Timestamp::from_bytes(&bytes).unwrap(), ts);
    }

    #[test]
    fn unix_conversion() {
        // 2011-03-22T05:25:40Z
        assert_eq!(sample().to_unix(), 1_300_771_540);
        assert_eq!(Timestamp::from_unix(1_300_771_540, 36), sample());
        assert_eq!(Timestamp::from_unix(0, 0).year, 1970);
    }

    #[test]
    fn checked_add_crosses_month_boundary() {
        let ts = Timestamp {
            month: 2,
            day: 28,
            hour: 23,
            minute: 0,
            second: 0,
            tz_quarters: 0,
            ..sample()
        };
        let later = ts.checked_add(Duration::from_secs(3600)).unwrap();
        assert_eq!((later.month, later.day, later.hour), (3, 1, 0));
        assert_eq!(later.seconds_since(&ts), 3600);
    }

    #[test]
    fn rejects_invalid_bcd_and_ranges() {
        assert!(Timestamp::from_bytes(&[0x11, 0x3A, 0x22, 0x41, 0x52, 0x04, 0x63]).is_err());
        // month 13
        assert!(Timestamp::from_bytes(&[0x11, 0x31, 0x22, 0x41, 0x52, 0x04, 0x63]).is_err());
        assert_eq!(
            Timestamp::from_bytes(&[0x11, 0x30]),
            Err(CodecError::Incomplete)
        );
    }
}
