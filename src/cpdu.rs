// ABOUTME: Connection-layer PDUs (TS 24.011 7.2): CP-DATA, CP-ACK and CP-ERROR
// ABOUTME: The first octet packs the transaction identifier over the SMS protocol discriminator

use crate::codec::{CodecError, Decodable, Encodable, Layer, decode_lv, decode_u8, encode_lv};
use crate::datatypes::CpCause;
use crate::rpdu::Rpdu;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Protocol discriminator for short message services
pub const PROTOCOL_DISCRIMINATOR: u8 = 0x09;

/// Largest CP-User-Data payload
pub const MAX_PAYLOAD_LEN: usize = 248;

const TYPE_DATA: u8 = 0x01;
const TYPE_ACK: u8 = 0x04;
const TYPE_ERROR: u8 = 0x10;

/// Transaction identifier from the upper nibble of the first octet.
///
/// `flag` is clear on messages sent by the side that allocated the value and
/// set on messages sent by the other side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub flag: bool,
    pub value: u8,
}

impl TransactionId {
    pub fn new(flag: bool, value: u8) -> Result<Self, CodecError> {
        if value > 7 {
            return Err(CodecError::field(
                "transaction_id",
                format!("{value} exceeds 7"),
            ));
        }
        Ok(Self { flag, value })
    }

    /// The identifier as the peer sees it
    pub fn reverse(self) -> Self {
        Self {
            flag: !self.flag,
            value: self.value,
        }
    }

    fn to_octet(self) -> u8 {
        (u8::from(self.flag) << 7) | ((self.value & 0x07) << 4) | PROTOCOL_DISCRIMINATOR
    }

    /// Split the first octet, validating the protocol discriminator
    pub fn from_octet(octet: u8) -> Result<Self, CodecError> {
        let pd = octet & 0x0F;
        if pd != PROTOCOL_DISCRIMINATOR {
            return Err(CodecError::InvalidProtocolDiscriminator(pd));
        }
        Ok(Self {
            flag: octet & 0x80 != 0,
            value: (octet >> 4) & 0x07,
        })
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TI {}/{}", u8::from(self.flag), self.value)
    }
}

/// Any connection-layer PDU
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cpdu {
    Data { ti: TransactionId, payload: Bytes },
    Ack { ti: TransactionId },
    Error { ti: TransactionId, cause: CpCause },
}

impl Cpdu {
    /// CP-DATA carrying an encoded RPDU
    pub fn data(ti: TransactionId, rpdu: &Rpdu) -> Result<Self, CodecError> {
        Ok(Cpdu::Data {
            ti,
            payload: rpdu.to_bytes()?,
        })
    }

    pub fn ti(&self) -> TransactionId {
        match self {
            Cpdu::Data { ti, .. } | Cpdu::Ack { ti } | Cpdu::Error { ti, .. } => *ti,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Cpdu::Data { .. } => "CP-DATA",
            Cpdu::Ack { .. } => "CP-ACK",
            Cpdu::Error { .. } => "CP-ERROR",
        }
    }
}

impl Encodable for Cpdu {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.ti().to_octet());
        match self {
            Cpdu::Data { payload, .. } => {
                if payload.len() > MAX_PAYLOAD_LEN {
                    return Err(CodecError::field(
                        "cp_user_data",
                        format!("{} octets exceeds {MAX_PAYLOAD_LEN}", payload.len()),
                    ));
                }
                buf.put_u8(TYPE_DATA);
                encode_lv(buf, "cp_user_data", payload)
            }
            Cpdu::Ack { .. } => {
                buf.put_u8(TYPE_ACK);
                Ok(())
            }
            Cpdu::Error { cause, .. } => {
                buf.put_u8(TYPE_ERROR);
                buf.put_u8(u8::from(*cause));
                Ok(())
            }
        }
    }
}

impl Decodable for Cpdu {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let ti = TransactionId::from_octet(decode_u8(buf)?)?;
        match decode_u8(buf)? {
            TYPE_DATA => {
                let payload = decode_lv(buf)?;
                if payload.len() > MAX_PAYLOAD_LEN {
                    return Err(CodecError::field(
                        "cp_user_data",
                        format!("{} octets exceeds {MAX_PAYLOAD_LEN}", payload.len()),
                    ));
                }
                Ok(Cpdu::Data { ti, payload })
            }
            TYPE_ACK => Ok(Cpdu::Ack { ti }),
            TYPE_ERROR => Ok(Cpdu::Error {
                ti,
                cause: CpCause::from(decode_u8(buf)?),
            }),
            value => Err(CodecError::UnknownMessageType {
                layer: Layer::Connection,
                value,
            }),
        }
    }
}

impl fmt::Display for Cpdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind(), self.ti())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpdu::RpMemoryAvailable;

    fn ti(flag: bool, value: u8) -> TransactionId {
        TransactionId::new(flag, value).unwrap()
    }

    #[test]
    fn cp_data_layout() {
        let rpdu = Rpdu::from(RpMemoryAvailable {
            message_reference: 0x42,
        });
        let data = Cpdu::data(ti(false, 3), &rpdu).unwrap();
        let bytes = data.to_bytes().unwrap();
        assert_eq!(&bytes[..], &[0x39, 0x01, 0x02, 0x06, 0x42]);
        assert_eq!(Cpdu::from_bytes(&bytes).unwrap(), data);
    }

    #[test]
    fn cp_ack_and_error_layout() {
        let ack = Cpdu::Ack { ti: ti(true, 7) };
        assert_eq!(ack.to_bytes().unwrap().as_ref(), &[0xF9, 0x04]);
        assert_eq!(Cpdu::from_bytes(&[0xF9, 0x04]).unwrap(), ack);

        let error = Cpdu::Error {
            ti: ti(true, 0),
            cause: CpCause::MessageNotCompatible,
        };
        assert_eq!(error.to_bytes().unwrap().as_ref(), &[0x89, 0x10, 0x62]);
        assert_eq!(Cpdu::from_bytes(&[0x89, 0x10, 0x62]).unwrap(), error);
        assert_eq!(error.to_string(), "CP-ERROR (TI 1/0)");
    }

    #[test]
    fn invalid_protocol_discriminator() {
        assert_eq!(
            Cpdu::from_bytes(&[0x03, 0x04]),
            Err(CodecError::InvalidProtocolDiscriminator(0x03))
        );
    }

    #[test]
    fn unknown_message_type() {
        assert_eq!(
            Cpdu::from_bytes(&[0x09, 0x02]),
            Err(CodecError::UnknownMessageType {
                layer: Layer::Connection,
                value: 0x02
            })
        );
    }

    #[test]
    fn payload_limit() {
        let data = Cpdu::Data {
            ti: ti(false, 0),
            payload: Bytes::from(vec![0u8; MAX_PAYLOAD_LEN + 1]),
        };
        assert!(data.to_bytes().is_err());
    }

    #[test]
    fn transaction_id_range() {
        assert!(TransactionId::new(false, 8).is_err());
        assert_eq!(ti(false, 5).reverse(), ti(true, 5));
    }
}
