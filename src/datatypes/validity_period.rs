// ABOUTME: TP-VP validity period in its relative, absolute and enhanced wire formats
// ABOUTME: Chooses the tightest exact representation for a duration and converts back to a duration or expiry

use crate::codec::{CodecError, Decodable, Encodable, decode_bytes, decode_u8};
use crate::datatypes::Timestamp;
use crate::datatypes::timestamp::{from_semi_octet, to_semi_octet};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;
use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Wire size of the enhanced format
pub const ENHANCED_LEN: usize = 7;

/// Longest period the enhanced h:m:s format can carry
const MAX_HMS: u64 = 99 * HOUR + 59 * MINUTE + 59;

/// Period of an enhanced validity field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnhancedFormat {
    /// No validity period specified
    NoPeriod,
    /// Same table as the relative format
    Relative(u8),
    /// 0 to 255 seconds
    Seconds(u8),
    /// Semi-octet hours, minutes and seconds
    HourMinuteSecond { hours: u8, minutes: u8, seconds: u8 },
}

/// Enhanced validity period (TS 23.040 9.2.3.12.3)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnhancedValidity {
    pub single_shot: bool,
    pub format: EnhancedFormat,
}

/// TP-VP in one of its formats, selected by TP-VPF
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValidityPeriod {
    #[default]
    NotPresent,
    Relative(u8),
    Absolute(Timestamp),
    Enhanced(EnhancedValidity),
}

/// Duration encoded by a relative validity byte
pub fn relative_duration(value: u8) -> Duration {
    let value = u64::from(value);
    let secs = match value {
        0..=143 => (value + 1) * 5 * MINUTE,
        144..=167 => 12 * HOUR + (value - 143) * 30 * MINUTE,
        168..=196 => (value - 166) * DAY,
        _ => (value - 192) * WEEK,
    };
    Duration::from_secs(secs)
}

/// Relative validity byte representing exactly `secs`, if one exists.
///
/// Granularities are tried from coarsest to finest so every duration
/// maps to a single byte.
pub fn relative_value(secs: u64) -> Option<u8> {
    if secs % WEEK == 0 && (5..=63).contains(&(secs / WEEK)) {
        return Some((192 + secs / WEEK) as u8);
    }
    if secs % DAY == 0 && (2..=30).contains(&(secs / DAY)) {
        return Some((166 + secs / DAY) as u8);
    }
    let half_hours = 30 * MINUTE;
    if secs > 12 * HOUR && secs <= 24 * HOUR && (secs - 12 * HOUR) % half_hours == 0 {
        return Some((143 + (secs - 12 * HOUR) / half_hours) as u8);
    }
    let five_minutes = 5 * MINUTE;
    if secs >= five_minutes && secs <= 12 * HOUR && secs % five_minutes == 0 {
        return Some((secs / five_minutes - 1) as u8);
    }
    None
}

impl EnhancedValidity {
    /// Period carried by the enhanced field, if any
    pub fn duration(&self) -> Option<Duration> {
        match self.format {
            EnhancedFormat::NoPeriod => None,
            EnhancedFormat::Relative(value) => Some(relative_duration(value)),
            EnhancedFormat::Seconds(secs) => Some(Duration::from_secs(u64::from(secs))),
            EnhancedFormat::HourMinuteSecond {
                hours,
                minutes,
                seconds,
            } => Some(Duration::from_secs(
                u64::from(hours) * HOUR + u64::from(minutes) * MINUTE + u64::from(seconds),
            )),
        }
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let mut octets = [0u8; ENHANCED_LEN];
        if self.single_shot {
            octets[0] |= 0x40;
        }
        match self.format {
            EnhancedFormat::NoPeriod => {}
            EnhancedFormat::Relative(value) => {
                octets[0] |= 0x01;
                octets[1] = value;
            }
            EnhancedFormat::Seconds(secs) => {
                octets[0] |= 0x02;
                octets[1] = secs;
            }
            EnhancedFormat::HourMinuteSecond {
                hours,
                minutes,
                seconds,
            } => {
                if hours > 99 || minutes > 59 || seconds > 59 {
                    return Err(CodecError::field(
                        "validity_period",
                        format!("{hours}:{minutes}:{seconds} is not a valid period"),
                    ));
                }
                octets[0] |= 0x03;
                octets[1] = to_semi_octet(hours);
                octets[2] = to_semi_octet(minutes);
                octets[3] = to_semi_octet(seconds);
            }
        }
        buf.put_slice(&octets);
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let octets = decode_bytes(buf, ENHANCED_LEN)?;
        let indicator = octets[0];
        if indicator & 0x80 != 0 {
            return Err(CodecError::field(
                "validity_period",
                "extended functionality indicator is not supported",
            ));
        }
        let format = match indicator & 0x07 {
            0 => EnhancedFormat::NoPeriod,
            1 => EnhancedFormat::Relative(octets[1]),
            2 => EnhancedFormat::Seconds(octets[1]),
            3 => {
                let hours = from_semi_octet(octets[1], "hours")?;
                let minutes = from_semi_octet(octets[2], "minutes")?;
                let seconds = from_semi_octet(octets[3], "seconds")?;
                if minutes > 59 || seconds > 59 {
                    return Err(CodecError::field(
                        "validity_period",
                        format!("{hours}:{minutes}:{seconds} is not a valid period"),
                    ));
                }
                EnhancedFormat::HourMinuteSecond {
                    hours,
                    minutes,
                    seconds,
                }
            }
            reserved => {
                return Err(CodecError::field(
                    "validity_period",
                    format!("reserved enhanced format {reserved}"),
                ));
            }
        };
        Ok(Self {
            single_shot: indicator & 0x40 != 0,
            format,
        })
    }
}

impl ValidityPeriod {
    /// Select a representation for `duration` using the current time for the absolute fallback
    pub fn from_duration(duration: Duration, single_shot: bool) -> Self {
        Self::from_duration_at(duration, single_shot, Timestamp::now())
    }

    /// Select a representation for `duration` (whole seconds).
    ///
    /// Exact relative values are preferred, then enhanced seconds and
    /// enhanced h:m:s. Anything longer becomes an absolute deadline at
    /// `now + duration`.
    pub fn from_duration_at(duration: Duration, single_shot: bool, now: Timestamp) -> Self {
        let secs = duration.as_secs();
        let enhanced = |format| {
            ValidityPeriod::Enhanced(EnhancedValidity {
                single_shot,
                format,
            })
        };

        if secs == 0 {
            return if single_shot {
                enhanced(EnhancedFormat::NoPeriod)
            } else {
                ValidityPeriod::NotPresent
            };
        }
        if let Some(value) = relative_value(secs) {
            return if single_shot {
                enhanced(EnhancedFormat::Relative(value))
            } else {
                ValidityPeriod::Relative(value)
            };
        }
        if secs <= 255 {
            return enhanced(EnhancedFormat::Seconds(secs as u8));
        }
        if secs <= MAX_HMS {
            return enhanced(EnhancedFormat::HourMinuteSecond {
                hours: (secs / HOUR) as u8,
                minutes: (secs % HOUR / MINUTE) as u8,
                seconds: (secs % MINUTE) as u8,
            });
        }
        match now.checked_add(Duration::from_secs(secs)) {
            Some(deadline) => ValidityPeriod::Absolute(deadline),
            None => ValidityPeriod::NotPresent,
        }
    }

    /// TP-VPF bits for this format
    pub fn vpf(&self) -> u8 {
        match self {
            ValidityPeriod::NotPresent => 0b00,
            ValidityPeriod::Enhanced(_) => 0b01,
            ValidityPeriod::Relative(_) => 0b10,
            ValidityPeriod::Absolute(_) => 0b11,
        }
    }

    /// Remaining validity measured from `now`; absolute deadlines in the past give zero
    pub fn duration_at(&self, now: &Timestamp) -> Option<Duration> {
        match self {
            ValidityPeriod::NotPresent => None,
            ValidityPeriod::Relative(value) => Some(relative_duration(*value)),
            ValidityPeriod::Absolute(deadline) => {
                let secs = deadline.seconds_since(now).max(0);
                Some(Duration::from_secs(secs as u64))
            }
            ValidityPeriod::Enhanced(enhanced) => enhanced.duration(),
        }
    }

    /// Instant at which the message expires when validity starts at `now`
    pub fn expire_time(&self, now: &Timestamp) -> Option<Timestamp> {
        match self {
            ValidityPeriod::Absolute(deadline) => Some(*deadline),
            _ => now.checked_add(self.duration_at(now)?),
        }
    }

    /// Read the field selected by TP-VPF
    pub fn decode(vpf: u8, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        match vpf & 0x03 {
            0b00 => Ok(ValidityPeriod::NotPresent),
            0b10 => Ok(ValidityPeriod::Relative(decode_u8(buf)?)),
            0b11 => Ok(ValidityPeriod::Absolute(Timestamp::decode(buf)?)),
            _ => Ok(ValidityPeriod::Enhanced(EnhancedValidity::decode(buf)?)),
        }
    }
}

impl Encodable for ValidityPeriod {
    /// Writes nothing for `NotPresent`
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            ValidityPeriod::NotPresent => Ok(()),
            ValidityPeriod::Relative(value) => {
                buf.put_u8(*value);
                Ok(())
            }
            ValidityPeriod::Absolute(deadline) => deadline.encode(buf),
            ValidityPeriod::Enhanced(enhanced) => enhanced.encode(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::from_unix(1_300_771_540, 0)
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn relative_table_boundaries() {
        assert_eq!(relative_duration(0), secs(5 * MINUTE));
        assert_eq!(relative_duration(143), secs(12 * HOUR));
        assert_eq!(relative_duration(144), secs(12 * HOUR + 30 * MINUTE));
        assert_eq!(relative_duration(167), secs(DAY));
        assert_eq!(relative_duration(168), secs(2 * DAY));
        assert_eq!(relative_duration(196), secs(30 * DAY));
        assert_eq!(relative_duration(197), secs(5 * WEEK));
        assert_eq!(relative_duration(255), secs(63 * WEEK));
    }

    #[test]
    fn every_relative_byte_round_trips() {
        for value in 0..=255u8 {
            let duration = relative_duration(value);
            assert_eq!(relative_value(duration.as_secs()), Some(value), "{value}");
        }
    }

    #[test]
    fn selection_prefers_relative() {
        assert_eq!(
            ValidityPeriod::from_duration_at(secs(DAY), false, now()),
            ValidityPeriod::Relative(167)
        );
        assert_eq!(
            ValidityPeriod::from_duration_at(secs(14 * DAY), false, now()),
            ValidityPeriod::Relative(180)
        );
        assert_eq!(
            ValidityPeriod::from_duration_at(secs(DAY), true, now()),
            ValidityPeriod::Enhanced(EnhancedValidity {
                single_shot: true,
                format: EnhancedFormat::Relative(167),
            })
        );
    }

    #[test]
    fn selection_falls_back_to_enhanced() {
        assert_eq!(
            ValidityPeriod::from_duration_at(secs(90), false, now()),
            ValidityPeriod::Enhanced(EnhancedValidity {
                single_shot: false,
                format: EnhancedFormat::Seconds(90),
            })
        );
        assert_eq!(
            ValidityPeriod::from_duration_at(secs(HOUR + 61), false, now()),
            ValidityPeriod::Enhanced(EnhancedValidity {
                single_shot: false,
                format: EnhancedFormat::HourMinuteSecond {
                    hours: 1,
                    minutes: 1,
                    seconds: 1,
                },
            })
        );
    }

    #[test]
    fn selection_falls_back_to_absolute() {
        let duration = secs(40 * DAY + 1);
        let vp = ValidityPeriod::from_duration_at(duration, false, now());
        assert!(matches!(vp, ValidityPeriod::Absolute(_)));
        assert_eq!(vp.duration_at(&now()), Some(duration));
        assert_eq!(vp.expire_time(&now()), now().checked_add(duration));
    }

    #[test]
    fn zero_duration() {
        assert_eq!(
            ValidityPeriod::from_duration_at(Duration::ZERO, false, now()),
            ValidityPeriod::NotPresent
        );
        let single = ValidityPeriod::from_duration_at(Duration::ZERO, true, now());
        assert_eq!(
            single,
            ValidityPeriod::Enhanced(EnhancedValidity {
                single_shot: true,
                format: EnhancedFormat::NoPeriod,
            })
        );
        assert_eq!(single.duration_at(&now()), None);
    }

    #[test]
    fn vpf_and_wire_format() {
        let vp = ValidityPeriod::from_duration_at(secs(HOUR + 61), true, now());
        assert_eq!(vp.vpf(), 0b01);
        let bytes = vp.to_bytes().unwrap();
        assert_eq!(&bytes[..], &[0x43, 0x10, 0x10, 0x10, 0x00, 0x00, 0x00]);
        let mut cursor = Cursor::new(&bytes[..]);
        assert_eq!(ValidityPeriod::decode(vp.vpf(), &mut cursor).unwrap(), vp);

        let relative = ValidityPeriod::Relative(0xA7);
        assert_eq!(&relative.to_bytes().unwrap()[..], &[0xA7]);
        assert!(ValidityPeriod::NotPresent.to_bytes().unwrap().is_empty());
    }

    #[test]
    fn reserved_enhanced_format_rejected() {
        let bytes = [0x05, 0, 0, 0, 0, 0, 0];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(ValidityPeriod::decode(0b01, &mut cursor).is_err());
    }

    #[test]
    fn expire_time_relative() {
        let vp = ValidityPeriod::Relative(11);
        let expiry = vp.expire_time(&now()).unwrap();
        assert_eq!(expiry.seconds_since(&now()), 3600);
    }
}
