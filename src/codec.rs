// SMS PDU Codec - Separates wire parsing/encoding from the domain models
//
// Every layer of the stack (TP, RP and CP) implements Encodable/Decodable
// from this module. Decoding always reads from a `Cursor<&[u8]>` so that the
// nested envelopes can hand their payload slice to the inner codec, and
// encoding always appends to a `BytesMut`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this value onto the end of the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Calculate the encoded size without keeping the encoding
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }

    /// Encode into a fresh buffer and return the frozen bytes
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode one value, leaving the cursor just past it
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Decode a complete PDU, rejecting anything left over after it
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let value = Self::decode(&mut cursor)?;
        ensure_consumed(&cursor)?;
        Ok(value)
    }
}

/// Protocol layer a message type belongs to, used in error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Transfer,
    Relay,
    Connection,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Transfer => write!(f, "TP"),
            Layer::Relay => write!(f, "RP"),
            Layer::Connection => write!(f, "CP"),
        }
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Unexpected {layer} message type: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedMessageType {
        layer: Layer,
        expected: u8,
        actual: u8,
    },

    #[error("Unknown {layer} message type: {value:#04x}")]
    UnknownMessageType { layer: Layer, value: u8 },

    #[error("Invalid protocol discriminator: {0:#x}")]
    InvalidProtocolDiscriminator(u8),

    #[error("{0} trailing bytes after PDU")]
    TrailingBytes(usize),

    #[error("Character {0:?} cannot be represented in the selected alphabet")]
    UnmappableCharacter(char),

    #[error("Invalid TBCD digit: {0:?}")]
    InvalidDigit(char),

    #[error("Fill nibble before end of TBCD string")]
    MisplacedFiller,

    #[error("Reserved data coding scheme: {0:#04x}")]
    ReservedDataCoding(u8),

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },
}

impl CodecError {
    /// Shorthand for a field validation failure
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        CodecError::FieldValidation {
            field,
            reason: reason.into(),
        }
    }
}

/// Fail with `TrailingBytes` if the cursor has not reached the end
pub fn ensure_consumed(buf: &Cursor<&[u8]>) -> Result<(), CodecError> {
    match buf.remaining() {
        0 => Ok(()),
        n => Err(CodecError::TrailingBytes(n)),
    }
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Take exactly `len` bytes off the cursor
pub fn decode_bytes(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Peek at the next byte without consuming it
pub fn peek_u8(buf: &Cursor<&[u8]>) -> Result<u8, CodecError> {
    buf.chunk().first().copied().ok_or(CodecError::Incomplete)
}

/// Decode a one-octet length prefix followed by that many bytes
pub fn decode_lv(buf: &mut Cursor<&[u8]>) -> Result<Bytes, CodecError> {
    let len = decode_u8(buf)? as usize;
    decode_bytes(buf, len)
}

/// Encode a single byte
pub fn encode_u8(buf: &mut BytesMut, value: u8) {
    buf.put_u8(value);
}

/// Encode a one-octet length prefix followed by the bytes
pub fn encode_lv(buf: &mut BytesMut, field: &'static str, value: &[u8]) -> Result<(), CodecError> {
    let len = u8::try_from(value.len())
        .map_err(|_| CodecError::field(field, format!("{} octets exceeds 255", value.len())))?;
    buf.put_u8(len);
    buf.put_slice(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_u8_incomplete() {
        let mut cursor = Cursor::new(&[][..]);
        assert_eq!(decode_u8(&mut cursor), Err(CodecError::Incomplete));
    }

    #[test]
    fn decode_lv_reads_prefix() {
        let data = [0x02, 0xAA, 0xBB, 0xCC];
        let mut cursor = Cursor::new(&data[..]);
        let value = decode_lv(&mut cursor).unwrap();
        assert_eq!(&value[..], &[0xAA, 0xBB]);
        assert_eq!(ensure_consumed(&cursor), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn decode_lv_truncated() {
        let data = [0x05, 0x01];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(decode_lv(&mut cursor), Err(CodecError::Incomplete));
    }

    #[test]
    fn peek_does_not_consume() {
        let data = [0x7F];
        let cursor = Cursor::new(&data[..]);
        assert_eq!(peek_u8(&cursor), Ok(0x7F));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn encode_lv_rejects_oversized() {
        let mut buf = BytesMut::new();
        let big = vec![0u8; 256];
        assert!(matches!(
            encode_lv(&mut buf, "payload", &big),
            Err(CodecError::FieldValidation { field: "payload", .. })
        ));
    }
}
