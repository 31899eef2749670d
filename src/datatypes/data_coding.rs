// ABOUTME: Strongly-typed TP-DCS data coding scheme following the 3GPP TS 23.038 coding groups
// ABOUTME: Maps every defined status byte to exactly one variant and exposes charset and unit size

use crate::codec::{CodecError, Decodable, Encodable, decode_u8};
use bytes::{BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::io::Cursor;

/// Character set of the user data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CharSet {
    /// GSM 7-bit default alphabet, packed in septets
    #[default]
    Gsm7,
    /// 8-bit data, one octet per unit
    EightBit,
    /// UCS2 (UTF-16BE), two octets per code unit
    Ucs2,
}

impl CharSet {
    /// Bits per length unit of TP-UDL
    pub fn unit_size(&self) -> u8 {
        match self {
            CharSet::Gsm7 => 7,
            CharSet::EightBit | CharSet::Ucs2 => 8,
        }
    }

    fn bits(&self) -> u8 {
        match self {
            CharSet::Gsm7 => 0b00,
            CharSet::EightBit => 0b01,
            CharSet::Ucs2 => 0b10,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b00 => Some(CharSet::Gsm7),
            0b01 => Some(CharSet::EightBit),
            0b10 => Some(CharSet::Ucs2),
            _ => None,
        }
    }
}

/// Message class for SMS delivery
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageClass {
    /// Flash SMS (displayed immediately, not stored)
    Class0 = 0,
    /// Mobile Equipment specific
    Class1 = 1,
    /// SIM specific
    Class2 = 2,
    /// Terminal Equipment specific
    Class3 = 3,
}

impl MessageClass {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageClass::Class0,
            1 => MessageClass::Class1,
            2 => MessageClass::Class2,
            _ => MessageClass::Class3,
        }
    }
}

/// Storage behaviour of a message waiting indication group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitingBehavior {
    /// Group 1100: discard message, GSM 7-bit text
    Discard,
    /// Group 1101: store message, GSM 7-bit text
    Store,
    /// Group 1110: store message, UCS2 text
    StoreUcs2,
}

/// Indication type of a message waiting group
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitingKind {
    Voicemail = 0,
    Fax = 1,
    Email = 2,
    Other = 3,
}

impl WaitingKind {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => WaitingKind::Voicemail,
            1 => WaitingKind::Fax,
            2 => WaitingKind::Email,
            _ => WaitingKind::Other,
        }
    }
}

/// TP-DCS, one of the three coding group families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataCoding {
    /// Groups 00xx and 01xx
    General {
        auto_delete: bool,
        compressed: bool,
        class: Option<MessageClass>,
        charset: CharSet,
    },
    /// Groups 1100, 1101 and 1110
    MessageWaiting {
        behavior: WaitingBehavior,
        active: bool,
        kind: WaitingKind,
    },
    /// Group 1111
    DataCodingMessage { data: bool, class: MessageClass },
}

impl Default for DataCoding {
    fn default() -> Self {
        DataCoding::gsm7()
    }
}

impl DataCoding {
    /// Uncompressed GSM 7-bit text without a message class (0x00)
    pub fn gsm7() -> Self {
        DataCoding::General {
            auto_delete: false,
            compressed: false,
            class: None,
            charset: CharSet::Gsm7,
        }
    }

    /// Uncompressed 8-bit data without a message class (0x04)
    pub fn eight_bit() -> Self {
        DataCoding::General {
            auto_delete: false,
            compressed: false,
            class: None,
            charset: CharSet::EightBit,
        }
    }

    /// Uncompressed UCS2 text without a message class (0x08)
    pub fn ucs2() -> Self {
        DataCoding::General {
            auto_delete: false,
            compressed: false,
            class: None,
            charset: CharSet::Ucs2,
        }
    }

    /// Classify a status byte; reserved patterns give `None`
    pub fn from_byte(value: u8) -> Option<Self> {
        match value >> 4 {
            0x0..=0x7 => {
                let class_present = value & 0x10 != 0;
                if !class_present && value & 0x03 != 0 {
                    return None;
                }
                Some(DataCoding::General {
                    auto_delete: value & 0x40 != 0,
                    compressed: value & 0x20 != 0,
                    class: class_present.then(|| MessageClass::from_bits(value)),
                    charset: CharSet::from_bits((value >> 2) & 0x03)?,
                })
            }
            0x8..=0xB => None,
            group @ 0xC..=0xE => {
                if value & 0x04 != 0 {
                    return None;
                }
                let behavior = match group {
                    0xC => WaitingBehavior::Discard,
                    0xD => WaitingBehavior::Store,
                    _ => WaitingBehavior::StoreUcs2,
                };
                Some(DataCoding::MessageWaiting {
                    behavior,
                    active: value & 0x08 != 0,
                    kind: WaitingKind::from_bits(value),
                })
            }
            _ => {
                if value & 0x08 != 0 {
                    return None;
                }
                Some(DataCoding::DataCodingMessage {
                    data: value & 0x04 != 0,
                    class: MessageClass::from_bits(value),
                })
            }
        }
    }

    /// Returns the raw status byte for the wire
    pub fn to_byte(&self) -> u8 {
        match *self {
            DataCoding::General {
                auto_delete,
                compressed,
                class,
                charset,
            } => {
                let mut value = charset.bits() << 2;
                if auto_delete {
                    value |= 0x40;
                }
                if compressed {
                    value |= 0x20;
                }
                if let Some(class) = class {
                    value |= 0x10 | u8::from(class);
                }
                value
            }
            DataCoding::MessageWaiting {
                behavior,
                active,
                kind,
            } => {
                let group = match behavior {
                    WaitingBehavior::Discard => 0xC0,
                    WaitingBehavior::Store => 0xD0,
                    WaitingBehavior::StoreUcs2 => 0xE0,
                };
                let active = if active { 0x08 } else { 0x00 };
                group | active | u8::from(kind)
            }
            DataCoding::DataCodingMessage { data, class } => {
                let data = if data { 0x04 } else { 0x00 };
                0xF0 | data | u8::from(class)
            }
        }
    }

    /// Character set used to read and write the user data.
    ///
    /// Compressed general data is carried as opaque octets.
    pub fn charset(&self) -> CharSet {
        match *self {
            DataCoding::General {
                compressed: true, ..
            } => CharSet::EightBit,
            DataCoding::General { charset, .. } => charset,
            DataCoding::MessageWaiting {
                behavior: WaitingBehavior::StoreUcs2,
                ..
            } => CharSet::Ucs2,
            DataCoding::MessageWaiting { .. } => CharSet::Gsm7,
            DataCoding::DataCodingMessage { data: true, .. } => CharSet::EightBit,
            DataCoding::DataCodingMessage { data: false, .. } => CharSet::Gsm7,
        }
    }

    /// Bits per TP-UDL unit: 7 for the default alphabet, otherwise 8
    pub fn unit_size(&self) -> u8 {
        self.charset().unit_size()
    }

    /// Returns the message class if this coding scheme includes one
    pub fn message_class(&self) -> Option<MessageClass> {
        match *self {
            DataCoding::General { class, .. } => class,
            DataCoding::DataCodingMessage { class, .. } => Some(class),
            DataCoding::MessageWaiting { .. } => None,
        }
    }
}

impl Encodable for DataCoding {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.to_byte());
        Ok(())
    }
}

impl Decodable for DataCoding {
    /// A reserved byte in a mandatory TP-DCS field is a format error
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let value = decode_u8(buf)?;
        DataCoding::from_byte(value).ok_or(CodecError::ReservedDataCoding(value))
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self.charset(), self.to_byte())
    }
}

impl From<DataCoding> for u8 {
    fn from(data_coding: DataCoding) -> Self {
        data_coding.to_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_values() {
        assert_eq!(DataCoding::gsm7().to_byte(), 0x00);
        assert_eq!(DataCoding::eight_bit().to_byte(), 0x04);
        assert_eq!(DataCoding::ucs2().to_byte(), 0x08);
        assert_eq!(DataCoding::from_byte(0x08), Some(DataCoding::ucs2()));
        assert_eq!(DataCoding::default().charset(), CharSet::Gsm7);
    }

    #[test]
    fn general_with_class() {
        let flash = DataCoding::from_byte(0x10).unwrap();
        assert_eq!(flash.message_class(), Some(MessageClass::Class0));
        assert_eq!(flash.charset(), CharSet::Gsm7);

        let sim_ucs2 = DataCoding::from_byte(0x1A).unwrap();
        assert_eq!(sim_ucs2.message_class(), Some(MessageClass::Class2));
        assert_eq!(sim_ucs2.charset(), CharSet::Ucs2);
        assert_eq!(sim_ucs2.unit_size(), 8);
    }

    #[test]
    fn auto_delete_and_compressed() {
        let dcs = DataCoding::from_byte(0x60).unwrap();
        assert_eq!(
            dcs,
            DataCoding::General {
                auto_delete: true,
                compressed: true,
                class: None,
                charset: CharSet::Gsm7,
            }
        );
        assert_eq!(dcs.charset(), CharSet::EightBit);
    }

    #[test]
    fn message_waiting_groups() {
        assert_eq!(
            DataCoding::from_byte(0xC8),
            Some(DataCoding::MessageWaiting {
                behavior: WaitingBehavior::Discard,
                active: true,
                kind: WaitingKind::Voicemail,
            })
        );
        let store_ucs2 = DataCoding::from_byte(0xE3).unwrap();
        assert_eq!(store_ucs2.charset(), CharSet::Ucs2);
        assert_eq!(store_ucs2.to_byte(), 0xE3);
    }

    #[test]
    fn data_coding_message_group() {
        let dcs = DataCoding::from_byte(0xF5).unwrap();
        assert_eq!(
            dcs,
            DataCoding::DataCodingMessage {
                data: true,
                class: MessageClass::Class1,
            }
        );
        assert_eq!(dcs.unit_size(), 8);
        assert_eq!(DataCoding::from_byte(0xF0).unwrap().unit_size(), 7);
    }

    #[test]
    fn reserved_patterns() {
        for value in [0x01, 0x0C, 0x80, 0xB7, 0xC4, 0xF8, 0xFF] {
            assert_eq!(DataCoding::from_byte(value), None, "{value:#04x}");
        }
        assert_eq!(
            DataCoding::from_bytes(&[0x0C]),
            Err(CodecError::ReservedDataCoding(0x0C))
        );
    }

    #[test]
    fn every_defined_byte_round_trips() {
        let mut defined = 0;
        for value in 0..=255u8 {
            if let Some(dcs) = DataCoding::from_byte(value) {
                assert_eq!(dcs.to_byte(), value);
                defined += 1;
            }
        }
        assert_eq!(defined, 92);
    }
}
