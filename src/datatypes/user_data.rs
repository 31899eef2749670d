// ABOUTME: TP-UD user data with its optional user data header of information elements
// ABOUTME: Handles unit accounting per character set, septet fill after the header and deterministic truncation

use crate::codec::{CodecError, decode_bytes, decode_u8};
use crate::datatypes::CharSet;
use crate::datatypes::gsm7;
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Maximum TP-UD size in octets
pub const MAX_USER_DATA_LEN: usize = 140;

/// Maximum TP-CD size in octets
pub const MAX_COMMAND_DATA_LEN: usize = 157;

/// A single user data header entry
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InformationElement {
    /// Concatenated short message, 8-bit reference (IEI 0x00)
    ConcatenatedSm { reference: u8, max: u8, seq: u8 },
    /// Application port addressing, 8-bit ports (IEI 0x04)
    ApplicationPort8 { destination: u8, originator: u8 },
    /// Application port addressing, 16-bit ports (IEI 0x05)
    ApplicationPort16 { destination: u16, originator: u16 },
    /// Concatenated short message, 16-bit reference (IEI 0x08)
    ConcatenatedSm16 { reference: u16, max: u8, seq: u8 },
    /// Any other element, kept as raw key and value
    Generic { key: u8, value: Bytes },
}

impl InformationElement {
    pub const CONCATENATED_SM: u8 = 0x00;
    pub const APPLICATION_PORT_8: u8 = 0x04;
    pub const APPLICATION_PORT_16: u8 = 0x05;
    pub const CONCATENATED_SM_16: u8 = 0x08;

    /// Information element identifier
    pub fn key(&self) -> u8 {
        match self {
            InformationElement::ConcatenatedSm { .. } => Self::CONCATENATED_SM,
            InformationElement::ApplicationPort8 { .. } => Self::APPLICATION_PORT_8,
            InformationElement::ApplicationPort16 { .. } => Self::APPLICATION_PORT_16,
            InformationElement::ConcatenatedSm16 { .. } => Self::CONCATENATED_SM_16,
            InformationElement::Generic { key, .. } => *key,
        }
    }

    fn value(&self) -> Vec<u8> {
        match self {
            InformationElement::ConcatenatedSm {
                reference,
                max,
                seq,
            } => vec![*reference, *max, *seq],
            InformationElement::ApplicationPort8 {
                destination,
                originator,
            } => vec![*destination, *originator],
            InformationElement::ApplicationPort16 {
                destination,
                originator,
            } => {
                let mut value = destination.to_be_bytes().to_vec();
                value.extend_from_slice(&originator.to_be_bytes());
                value
            }
            InformationElement::ConcatenatedSm16 {
                reference,
                max,
                seq,
            } => {
                let [hi, lo] = reference.to_be_bytes();
                vec![hi, lo, *max, *seq]
            }
            InformationElement::Generic { value, .. } => value.to_vec(),
        }
    }

    /// Interpret a raw entry; known keys with an unexpected length stay generic
    fn from_raw(key: u8, value: Bytes) -> Self {
        match (key, value.len()) {
            (Self::CONCATENATED_SM, 3) => InformationElement::ConcatenatedSm {
                reference: value[0],
                max: value[1],
                seq: value[2],
            },
            (Self::APPLICATION_PORT_8, 2) => InformationElement::ApplicationPort8 {
                destination: value[0],
                originator: value[1],
            },
            (Self::APPLICATION_PORT_16, 4) => InformationElement::ApplicationPort16 {
                destination: u16::from_be_bytes([value[0], value[1]]),
                originator: u16::from_be_bytes([value[2], value[3]]),
            },
            (Self::CONCATENATED_SM_16, 4) => InformationElement::ConcatenatedSm16 {
                reference: u16::from_be_bytes([value[0], value[1]]),
                max: value[2],
                seq: value[3],
            },
            _ => InformationElement::Generic { key, value },
        }
    }
}

/// TP-UD: header entries followed by text
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UserData {
    pub header: Vec<InformationElement>,
    pub text: String,
}

/// Serialize the header including its UDHL prefix; empty when there are no entries
fn header_bytes(header: &[InformationElement]) -> Result<Vec<u8>, CodecError> {
    if header.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = vec![0u8];
    for element in header {
        let value = element.value();
        let len = u8::try_from(value.len())
            .map_err(|_| CodecError::field("user_data_header", "element value too long"))?;
        out.push(element.key());
        out.push(len);
        out.extend_from_slice(&value);
    }
    out[0] = u8::try_from(out.len() - 1)
        .map_err(|_| CodecError::field("user_data_header", "header too long"))?;
    Ok(out)
}

fn parse_header(raw: &[u8]) -> Result<Vec<InformationElement>, CodecError> {
    let mut cursor = Cursor::new(raw);
    let mut elements = Vec::new();
    while (cursor.position() as usize) < raw.len() {
        let key = decode_u8(&mut cursor)?;
        let len = decode_u8(&mut cursor)? as usize;
        let value = decode_bytes(&mut cursor, len)?;
        elements.push(InformationElement::from_raw(key, value));
    }
    Ok(elements)
}

/// Septets occupied by a header of `octets` octets, and the fill bits after it
fn header_septets(octets: usize) -> (usize, u8) {
    let septets = (octets * 8).div_ceil(7);
    (septets, (septets * 7 - octets * 8) as u8)
}

fn eight_bit_octet(ch: char) -> Result<u8, CodecError> {
    u8::try_from(u32::from(ch)).map_err(|_| CodecError::UnmappableCharacter(ch))
}

impl UserData {
    /// Plain text without a header
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            header: Vec::new(),
            text: text.into(),
        }
    }

    /// Append a header entry
    pub fn with_element(mut self, element: InformationElement) -> Self {
        self.header.push(element);
        self
    }

    /// TP-UDHI: set whenever a header is present
    pub fn udhi(&self) -> bool {
        !self.header.is_empty()
    }

    /// Concatenation info as (reference, max, seq) from either concatenation element
    pub fn concatenation(&self) -> Option<(u16, u8, u8)> {
        self.header.iter().find_map(|element| match *element {
            InformationElement::ConcatenatedSm {
                reference,
                max,
                seq,
            } => Some((u16::from(reference), max, seq)),
            InformationElement::ConcatenatedSm16 {
                reference,
                max,
                seq,
            } => Some((reference, max, seq)),
            _ => None,
        })
    }

    /// Write TP-UDL followed by the header and as much text as fits in `limit` octets.
    ///
    /// Text that does not fit is cut at a character boundary, so an escape
    /// pair or a surrogate pair is never split.
    pub fn encode(
        &self,
        buf: &mut BytesMut,
        charset: CharSet,
        limit: usize,
    ) -> Result<(), CodecError> {
        let header = header_bytes(&self.header)?;
        if header.len() > limit {
            return Err(CodecError::field(
                "user_data_header",
                format!("{} octets exceeds {limit}", header.len()),
            ));
        }

        match charset {
            CharSet::Gsm7 => {
                let (header_units, fill) = header_septets(header.len());
                let available = limit * 8 / 7 - header_units;
                let mut units = Vec::new();
                for ch in self.text.chars() {
                    let code = gsm7::septets(ch.encode_utf8(&mut [0; 4]))?;
                    if units.len() + code.len() > available {
                        break;
                    }
                    units.extend_from_slice(&code);
                }
                buf.put_u8((header_units + units.len()) as u8);
                buf.put_slice(&header);
                buf.put_slice(&gsm7::pack_septets(&units, fill));
            }
            CharSet::EightBit => {
                let available = limit - header.len();
                let mut octets = Vec::new();
                for ch in self.text.chars() {
                    if octets.len() == available {
                        break;
                    }
                    octets.push(eight_bit_octet(ch)?);
                }
                buf.put_u8((header.len() + octets.len()) as u8);
                buf.put_slice(&header);
                buf.put_slice(&octets);
            }
            CharSet::Ucs2 => {
                let available = limit - header.len();
                let mut octets = Vec::new();
                for ch in self.text.chars() {
                    let mut units = [0u16; 2];
                    let units = ch.encode_utf16(&mut units);
                    if octets.len() + units.len() * 2 > available {
                        break;
                    }
                    for unit in units.iter() {
                        octets.extend_from_slice(&unit.to_be_bytes());
                    }
                }
                buf.put_u8((header.len() + octets.len()) as u8);
                buf.put_slice(&header);
                buf.put_slice(&octets);
            }
        }
        Ok(())
    }

    /// Read TP-UDL, the header when `udhi` is set, and the text
    pub fn decode(
        buf: &mut Cursor<&[u8]>,
        charset: CharSet,
        udhi: bool,
        limit: usize,
    ) -> Result<Self, CodecError> {
        let udl = decode_u8(buf)? as usize;
        let octets = match charset {
            CharSet::Gsm7 => (udl * 7).div_ceil(8),
            CharSet::EightBit | CharSet::Ucs2 => udl,
        };
        if octets > limit {
            return Err(CodecError::field(
                "user_data",
                format!("length {udl} exceeds {limit} octets"),
            ));
        }
        let data = decode_bytes(buf, octets)?;

        let (header, header_len) = if udhi {
            let udhl = *data.first().ok_or(CodecError::Incomplete)? as usize;
            let raw = data.get(1..=udhl).ok_or(CodecError::Incomplete)?;
            (parse_header(raw)?, udhl + 1)
        } else {
            (Vec::new(), 0)
        };
        let body = &data[header_len..];

        let text = match charset {
            CharSet::Gsm7 => {
                let (header_units, fill) = header_septets(header_len);
                let units = udl.checked_sub(header_units).ok_or_else(|| {
                    CodecError::field("user_data", "header longer than user data")
                })?;
                gsm7::text_from_septets(&gsm7::unpack_septets(body, fill, units)?)
            }
            CharSet::EightBit => body.iter().map(|&b| char::from(b)).collect(),
            CharSet::Ucs2 => {
                if body.len() % 2 != 0 {
                    return Err(CodecError::field("user_data", "odd UCS2 octet count"));
                }
                let units = body
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
                char::decode_utf16(units)
                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect()
            }
        };
        Ok(Self { header, text })
    }
}
