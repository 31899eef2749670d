// ABOUTME: TP and RP address fields with TON/NPI consistency checks
// ABOUTME: Encodes digit addresses as TBCD and alphanumeric addresses as packed GSM 7-bit text

use crate::codec::{CodecError, Decodable, Encodable, decode_bytes, decode_u8};
use crate::datatypes::gsm7;
use crate::datatypes::{NumberingPlan, TbcdString, TypeOfNumber};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Maximum size of a TP address including the length and type octets
pub const MAX_ADDRESS_LEN: usize = 12;

/// Maximum value octets of an RP address (after the type-of-address octet)
const MAX_RP_VALUE_LEN: usize = 10;

/// The value part of an address
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddressValue {
    /// Semi-octet digits
    Digits(TbcdString),
    /// GSM 7-bit alphanumeric text
    Text(String),
}

/// An SMS address (TP-OA, TP-DA, TP-RA or an RP originator/destination)
///
/// Alphanumeric text requires `TypeOfNumber::Alphanumeric` with
/// `NumberingPlan::Unknown`; digit strings may use any other type of number.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub ton: TypeOfNumber,
    pub npi: NumberingPlan,
    pub value: AddressValue,
}

impl Address {
    /// Creates a digit address with the given type of number and numbering plan
    pub fn new(ton: TypeOfNumber, npi: NumberingPlan, digits: &str) -> Result<Self, CodecError> {
        let address = Self {
            ton,
            npi,
            value: AddressValue::Digits(TbcdString::new(digits)?),
        };
        address.validate()?;
        Ok(address)
    }

    /// Creates an international ISDN (E.164) address
    pub fn international(digits: &str) -> Result<Self, CodecError> {
        Self::new(TypeOfNumber::International, NumberingPlan::Isdn, digits)
    }

    /// Creates an alphanumeric address such as a sender name
    pub fn alphanumeric(text: &str) -> Result<Self, CodecError> {
        let address = Self {
            ton: TypeOfNumber::Alphanumeric,
            npi: NumberingPlan::Unknown,
            value: AddressValue::Text(text.to_owned()),
        };
        address.validate()?;
        Ok(address)
    }

    /// Type-of-address octet: extension bit set, then TON and NPI
    pub fn toa(&self) -> u8 {
        0x80 | (u8::from(self.ton) << 4) | (u8::from(self.npi) & 0x0F)
    }

    /// Check the TON/NPI rules and the encoded size limit
    pub fn validate(&self) -> Result<(), CodecError> {
        match &self.value {
            AddressValue::Text(text) => {
                if self.ton != TypeOfNumber::Alphanumeric || self.npi != NumberingPlan::Unknown {
                    return Err(CodecError::field(
                        "address",
                        "alphanumeric value requires alphanumeric TON and unknown NPI",
                    ));
                }
                let units = gsm7::unit_count(text)?;
                let octets = (units * 7).div_ceil(8);
                if octets + 2 > MAX_ADDRESS_LEN {
                    return Err(CodecError::field(
                        "address",
                        format!("{units} units do not fit in {MAX_ADDRESS_LEN} octets"),
                    ));
                }
            }
            AddressValue::Digits(digits) => {
                if self.ton == TypeOfNumber::Alphanumeric {
                    return Err(CodecError::field(
                        "address",
                        "digit value cannot use alphanumeric TON",
                    ));
                }
                if digits.packed_len() + 2 > MAX_ADDRESS_LEN {
                    return Err(CodecError::field(
                        "address",
                        format!("{} digits do not fit in {MAX_ADDRESS_LEN} octets", digits.len()),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Encode in the RP form: octet length (including the type octet) then value.
    ///
    /// `None` encodes as the single zero octet of an absent address.
    pub fn encode_rp(address: Option<&Address>, buf: &mut BytesMut) -> Result<(), CodecError> {
        let Some(address) = address else {
            buf.put_u8(0);
            return Ok(());
        };
        let AddressValue::Digits(digits) = &address.value else {
            return Err(CodecError::field(
                "rp_address",
                "relay addresses carry digits only",
            ));
        };
        if digits.packed_len() > MAX_RP_VALUE_LEN {
            return Err(CodecError::field(
                "rp_address",
                format!("{} digits exceeds {}", digits.len(), MAX_RP_VALUE_LEN * 2),
            ));
        }
        buf.put_u8(1 + digits.packed_len() as u8);
        buf.put_u8(address.toa());
        buf.put_slice(&digits.to_packed());
        Ok(())
    }

    /// Decode the RP form; a zero length means the address is absent
    pub fn decode_rp(buf: &mut Cursor<&[u8]>) -> Result<Option<Address>, CodecError> {
        let len = decode_u8(buf)? as usize;
        if len == 0 {
            return Ok(None);
        }
        if len - 1 > MAX_RP_VALUE_LEN {
            return Err(CodecError::field(
                "rp_address",
                format!("length {len} exceeds {}", MAX_RP_VALUE_LEN + 1),
            ));
        }
        let toa = decode_u8(buf)?;
        let value = decode_bytes(buf, len - 1)?;
        Ok(Some(Address {
            ton: TypeOfNumber::from_toa(toa),
            npi: NumberingPlan::from_toa(toa),
            value: AddressValue::Digits(TbcdString::from_packed(&value)?),
        }))
    }
}

impl Encodable for Address {
    /// TP form: length in semi-octets (digit count for TBCD), type octet, value
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;
        match &self.value {
            AddressValue::Digits(digits) => {
                buf.put_u8(digits.len() as u8);
                buf.put_u8(self.toa());
                buf.put_slice(&digits.to_packed());
            }
            AddressValue::Text(text) => {
                let units = gsm7::septets(text)?;
                let packed = gsm7::pack_septets(&units, 0);
                buf.put_u8((units.len() * 7).div_ceil(4) as u8);
                buf.put_u8(self.toa());
                buf.put_slice(&packed);
            }
        }
        Ok(())
    }
}

impl Decodable for Address {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let len = decode_u8(buf)? as usize;
        let octets = len.div_ceil(2);
        if octets + 2 > MAX_ADDRESS_LEN {
            return Err(CodecError::field(
                "address",
                format!("length {len} semi-octets exceeds {MAX_ADDRESS_LEN} octets"),
            ));
        }
        let toa = decode_u8(buf)?;
        let ton = TypeOfNumber::from_toa(toa);
        let npi = NumberingPlan::from_toa(toa);
        let raw = decode_bytes(buf, octets)?;

        let value = if ton == TypeOfNumber::Alphanumeric {
            let units = gsm7::unpack_septets(&raw, 0, len * 4 / 7)?;
            AddressValue::Text(gsm7::text_from_septets(&units))
        } else {
            AddressValue::Digits(TbcdString::from_packed_digits(&raw, len)?)
        };
        Ok(Address { ton, npi, value })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            AddressValue::Digits(digits) if self.ton == TypeOfNumber::International => {
                write!(f, "+{digits}")
            }
            AddressValue::Digits(digits) => write!(f, "{digits}"),
            AddressValue::Text(text) => f.write_str(text),
        }
    }
}
