// ABOUTME: Relay-layer PDUs (TS 24.011 7.3): RP-DATA, RP-ACK, RP-ERROR and RP-SMMA
// ABOUTME: The RP message type encodes the direction, which in turn selects how the wrapped TPDU is decoded

use crate::codec::{
    CodecError, Decodable, Encodable, Layer, decode_lv, decode_u8, encode_lv,
};
use crate::datatypes::{Address, RpCause};
use crate::macros::builder_setters;
use crate::tpdu::{Direction, Tpdu};
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

const MTI_DATA: u8 = 0x00;
const MTI_ACK: u8 = 0x02;
const MTI_ERROR: u8 = 0x04;
const MTI_MEMORY_AVAILABLE: u8 = 0x06;
const MTI_MASK: u8 = 0x07;

/// IEI of the optional RP-User-Data element in RP-ACK and RP-ERROR
const IEI_USER_DATA: u8 = 0x41;

// Even types travel towards the network, odd types towards the mobile station
fn mti(base: u8, direction: Direction) -> u8 {
    match direction {
        Direction::MsToSc => base,
        Direction::ScToMs => base | 0x01,
    }
}

fn direction_of(mti: u8) -> Direction {
    if mti & 0x01 == 0 {
        Direction::MsToSc
    } else {
        Direction::ScToMs
    }
}

fn encode_tpdu(buf: &mut BytesMut, tpdu: &Tpdu) -> Result<(), CodecError> {
    let mut inner = BytesMut::new();
    tpdu.encode(&mut inner)?;
    encode_lv(buf, "rp_user_data", &inner)
}

fn decode_tpdu(buf: &mut Cursor<&[u8]>, direction: Direction) -> Result<Tpdu, CodecError> {
    let data = decode_lv(buf)?;
    Tpdu::from_bytes(direction, &data)
}

/// Optional RP-User-Data carrying a report, present when any octets remain
fn decode_report(
    buf: &mut Cursor<&[u8]>,
    direction: Direction,
) -> Result<Option<Tpdu>, CodecError> {
    if !buf.has_remaining() {
        return Ok(None);
    }
    let iei = decode_u8(buf)?;
    if iei != IEI_USER_DATA {
        return Err(CodecError::field(
            "rp_user_data",
            format!("unexpected element {iei:#04x}"),
        ));
    }
    let tpdu = decode_tpdu(buf, direction)?;
    check_report(&tpdu, direction)?;
    Ok(Some(tpdu))
}

fn encode_report(
    buf: &mut BytesMut,
    tpdu: Option<&Tpdu>,
    direction: Direction,
) -> Result<(), CodecError> {
    if let Some(tpdu) = tpdu {
        check_report(tpdu, direction)?;
        buf.put_u8(IEI_USER_DATA);
        encode_tpdu(buf, tpdu)?;
    }
    Ok(())
}

fn check_report(tpdu: &Tpdu, direction: Direction) -> Result<(), CodecError> {
    if !tpdu.is_report() || tpdu.direction() != direction {
        return Err(CodecError::field(
            "rp_user_data",
            format!("{} cannot travel in this message", tpdu.kind()),
        ));
    }
    Ok(())
}

/// RP-DATA: a short message travelling between the mobile station and the
/// service centre. The direction follows the wrapped TPDU.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpData {
    pub message_reference: u8,
    /// Service centre address: RP-DA towards the network, RP-OA towards the mobile
    pub service_centre: Address,
    pub tpdu: Tpdu,
}

impl RpData {
    pub fn new(message_reference: u8, service_centre: Address, tpdu: Tpdu) -> Self {
        Self {
            message_reference,
            service_centre,
            tpdu,
        }
    }

    pub fn direction(&self) -> Direction {
        self.tpdu.direction()
    }

    fn decode_body(direction: Direction, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let message_reference = decode_u8(buf)?;
        let originator = Address::decode_rp(buf)?;
        let destination = Address::decode_rp(buf)?;
        // The address on the mobile station's side is always the empty placeholder
        let (service_centre, placeholder) = match direction {
            Direction::MsToSc => (destination, originator),
            Direction::ScToMs => (originator, destination),
        };
        if placeholder.is_some() {
            return Err(CodecError::field(
                "rp_address",
                "mobile station address must be empty",
            ));
        }
        let service_centre = service_centre
            .ok_or_else(|| CodecError::field("rp_address", "service centre address missing"))?;

        let tpdu = decode_tpdu(buf, direction)?;
        if tpdu.is_report() {
            return Err(CodecError::field(
                "rp_user_data",
                format!("{} cannot travel in RP-DATA", tpdu.kind()),
            ));
        }
        Ok(Self {
            message_reference,
            service_centre,
            tpdu,
        })
    }
}

impl Encodable for RpData {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.tpdu.is_report() {
            return Err(CodecError::field(
                "rp_user_data",
                format!("{} cannot travel in RP-DATA", self.tpdu.kind()),
            ));
        }
        let direction = self.direction();
        buf.put_u8(mti(MTI_DATA, direction));
        buf.put_u8(self.message_reference);
        match direction {
            Direction::MsToSc => {
                Address::encode_rp(None, buf)?;
                Address::encode_rp(Some(&self.service_centre), buf)?;
            }
            Direction::ScToMs => {
                Address::encode_rp(Some(&self.service_centre), buf)?;
                Address::encode_rp(None, buf)?;
            }
        }
        encode_tpdu(buf, &self.tpdu)
    }
}

/// RP-ACK, optionally carrying an SMS-SUBMIT-REPORT or SMS-DELIVER-REPORT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpAck {
    pub direction: Direction,
    pub message_reference: u8,
    pub tpdu: Option<Tpdu>,
}

impl RpAck {
    pub fn new(direction: Direction, message_reference: u8) -> Self {
        Self {
            direction,
            message_reference,
            tpdu: None,
        }
    }

    builder_setters!(tpdu: Option<Tpdu>);
}

impl Encodable for RpAck {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(mti(MTI_ACK, self.direction));
        buf.put_u8(self.message_reference);
        encode_report(buf, self.tpdu.as_ref(), self.direction)
    }
}

/// RP-ERROR with its cause, an optional diagnostic and an optional report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpError {
    pub direction: Direction,
    pub message_reference: u8,
    pub cause: RpCause,
    pub diagnostic: Option<u8>,
    pub tpdu: Option<Tpdu>,
}

impl RpError {
    pub fn new(direction: Direction, message_reference: u8, cause: RpCause) -> Self {
        Self {
            direction,
            message_reference,
            cause,
            diagnostic: None,
            tpdu: None,
        }
    }

    builder_setters!(diagnostic: Option<u8>, tpdu: Option<Tpdu>);
}

impl Encodable for RpError {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(mti(MTI_ERROR, self.direction));
        buf.put_u8(self.message_reference);
        let cause = u8::from(self.cause);
        if cause & 0x80 != 0 {
            return Err(CodecError::field("rp_cause", format!("{cause} exceeds 127")));
        }
        match self.diagnostic {
            Some(diagnostic) => buf.put_slice(&[2, cause, diagnostic]),
            None => buf.put_slice(&[1, cause]),
        }
        encode_report(buf, self.tpdu.as_ref(), self.direction)
    }
}

/// RP-SMMA: the mobile station has memory available again
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpMemoryAvailable {
    pub message_reference: u8,
}

/// Any relay-layer PDU
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rpdu {
    Data(RpData),
    Ack(RpAck),
    Error(RpError),
    MemoryAvailable(RpMemoryAvailable),
}

impl Rpdu {
    pub fn message_reference(&self) -> u8 {
        match self {
            Rpdu::Data(data) => data.message_reference,
            Rpdu::Ack(ack) => ack.message_reference,
            Rpdu::Error(error) => error.message_reference,
            Rpdu::MemoryAvailable(smma) => smma.message_reference,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Rpdu::Data(data) => data.direction(),
            Rpdu::Ack(ack) => ack.direction,
            Rpdu::Error(error) => error.direction,
            Rpdu::MemoryAvailable(_) => Direction::MsToSc,
        }
    }

    /// RP-DATA and RP-SMMA open a relay transaction; RP-ACK and RP-ERROR close it
    pub fn is_request(&self) -> bool {
        matches!(self, Rpdu::Data(_) | Rpdu::MemoryAvailable(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Rpdu::Data(_) => "RP-DATA",
            Rpdu::Ack(_) => "RP-ACK",
            Rpdu::Error(_) => "RP-ERROR",
            Rpdu::MemoryAvailable(_) => "RP-SMMA",
        }
    }
}

impl Encodable for Rpdu {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Rpdu::Data(data) => data.encode(buf),
            Rpdu::Ack(ack) => ack.encode(buf),
            Rpdu::Error(error) => error.encode(buf),
            Rpdu::MemoryAvailable(smma) => {
                buf.put_u8(MTI_MEMORY_AVAILABLE);
                buf.put_u8(smma.message_reference);
                Ok(())
            }
        }
    }
}

impl Decodable for Rpdu {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mti = decode_u8(buf)? & MTI_MASK;
        let direction = direction_of(mti);
        match mti & !0x01 {
            MTI_DATA => Ok(Rpdu::Data(RpData::decode_body(direction, buf)?)),
            MTI_ACK => {
                let message_reference = decode_u8(buf)?;
                let tpdu = decode_report(buf, direction)?;
                Ok(Rpdu::Ack(RpAck {
                    direction,
                    message_reference,
                    tpdu,
                }))
            }
            MTI_ERROR => {
                let message_reference = decode_u8(buf)?;
                let cause = decode_lv(buf)?;
                let (cause, diagnostic) = match cause[..] {
                    [cause] => (cause, None),
                    [cause, diagnostic] => (cause, Some(diagnostic)),
                    _ => {
                        return Err(CodecError::field(
                            "rp_cause",
                            format!("length {} is not 1 or 2", cause.len()),
                        ));
                    }
                };
                let tpdu = decode_report(buf, direction)?;
                Ok(Rpdu::Error(RpError {
                    direction,
                    message_reference,
                    cause: RpCause::from(cause & 0x7F),
                    diagnostic,
                    tpdu,
                }))
            }
            MTI_MEMORY_AVAILABLE if direction == Direction::MsToSc => {
                Ok(Rpdu::MemoryAvailable(RpMemoryAvailable {
                    message_reference: decode_u8(buf)?,
                }))
            }
            _ => Err(CodecError::UnknownMessageType {
                layer: Layer::Relay,
                value: mti,
            }),
        }
    }
}

impl From<RpData> for Rpdu {
    fn from(value: RpData) -> Self {
        Rpdu::Data(value)
    }
}

impl From<RpAck> for Rpdu {
    fn from(value: RpAck) -> Self {
        Rpdu::Ack(value)
    }
}

impl From<RpError> for Rpdu {
    fn from(value: RpError) -> Self {
        Rpdu::Error(value)
    }
}

impl From<RpMemoryAvailable> for Rpdu {
    fn from(value: RpMemoryAvailable) -> Self {
        Rpdu::MemoryAvailable(value)
    }
}

impl fmt::Display for Rpdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (MR {})", self.kind(), self.message_reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Timestamp, UserData};
    use crate::tpdu::{Deliver, DeliverReport, Submit, SubmitReport};

    fn service_centre() -> Address {
        Address::international("447785016005").unwrap()
    }

    fn submit() -> Tpdu {
        Submit::new(0x10, Address::international("1234").unwrap(), UserData::new("hi")).into()
    }

    #[test]
    fn rp_data_towards_network() {
        let data = Rpdu::from(RpData::new(0x05, service_centre(), submit()));
        let bytes = data.to_bytes().unwrap();
        assert_eq!(
            &bytes[..11],
            &[0x00, 0x05, 0x00, 0x07, 0x91, 0x44, 0x77, 0x58, 0x10, 0x06, 0x50]
        );
        let tpdu = submit().to_bytes().unwrap();
        assert_eq!(bytes[11] as usize, tpdu.len());
        assert_eq!(&bytes[12..], &tpdu[..]);
        assert_eq!(Rpdu::from_bytes(&bytes).unwrap(), data);
        assert!(data.is_request());
        assert_eq!(data.direction(), Direction::MsToSc);
    }

    #[test]
    fn rp_data_towards_mobile() {
        let deliver = Deliver::new(
            Address::international("1234").unwrap(),
            Timestamp::from_unix(1_300_771_540, 36),
            UserData::new("hello"),
        );
        let data = Rpdu::from(RpData::new(0xFE, service_centre(), deliver.into()));
        let bytes = data.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0x01, 0xFE, 0x07, 0x91]);
        assert_eq!(bytes[10], 0x00);
        assert_eq!(Rpdu::from_bytes(&bytes).unwrap(), data);
    }

    #[test]
    fn rp_data_rejects_filled_placeholder() {
        let original = Rpdu::from(RpData::new(0x05, service_centre(), submit()))
            .to_bytes()
            .unwrap();
        // Swap placeholder and service centre so the originator side is filled
        let mut bytes = original[..2].to_vec();
        bytes.extend_from_slice(&original[3..11]);
        bytes.push(0x00);
        bytes.extend_from_slice(&original[11..]);
        assert!(matches!(
            Rpdu::from_bytes(&bytes),
            Err(CodecError::FieldValidation { field: "rp_address", .. })
        ));
    }

    #[test]
    fn rp_data_rejects_reports() {
        let data = RpData::new(1, service_centre(), DeliverReport::default().into());
        assert!(data.to_bytes().is_err());
    }

    #[test]
    fn rp_ack_with_report() {
        let report = SubmitReport::new(Timestamp::from_unix(1_300_771_540, 36));
        let ack = Rpdu::from(RpAck::new(Direction::ScToMs, 0x05).tpdu(Some(report.into())));
        let bytes = ack.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0x03, 0x05, 0x41, 0x09]);
        assert_eq!(Rpdu::from_bytes(&bytes).unwrap(), ack);
        assert!(!ack.is_request());
    }

    #[test]
    fn rp_ack_rejects_report_in_wrong_direction() {
        let ack = RpAck::new(Direction::ScToMs, 0x05).tpdu(Some(DeliverReport::default().into()));
        assert!(ack.to_bytes().is_err());
    }

    #[test]
    fn rp_error_with_diagnostic_and_report() {
        let report = DeliverReport::default().failure_cause(Some(0xD3));
        let error = Rpdu::from(
            RpError::new(Direction::MsToSc, 0x22, RpCause::MemoryCapacityExceeded)
                .diagnostic(Some(0x01))
                .tpdu(Some(report.into())),
        );
        let bytes = error.to_bytes().unwrap();
        assert_eq!(
            &bytes[..],
            &[0x04, 0x22, 0x02, 0x16, 0x01, 0x41, 0x03, 0x00, 0xD3, 0x00]
        );
        assert_eq!(Rpdu::from_bytes(&bytes).unwrap(), error);
    }

    #[test]
    fn rp_error_minimal() {
        let bytes = [0x05, 0x01, 0x01, 0x2F];
        let error = Rpdu::from_bytes(&bytes).unwrap();
        assert_eq!(
            error,
            Rpdu::Error(RpError::new(
                Direction::ScToMs,
                0x01,
                RpCause::ResourcesUnavailable
            ))
        );
        assert_eq!(error.to_bytes().unwrap().as_ref(), &bytes);
    }

    #[test]
    fn rp_error_bad_cause_length() {
        assert!(Rpdu::from_bytes(&[0x04, 0x01, 0x00]).is_err());
    }

    #[test]
    fn memory_available() {
        let smma = Rpdu::from(RpMemoryAvailable {
            message_reference: 0x77,
        });
        let bytes = smma.to_bytes().unwrap();
        assert_eq!(&bytes[..], &[0x06, 0x77]);
        assert_eq!(Rpdu::from_bytes(&bytes).unwrap(), smma);
        assert_eq!(smma.to_string(), "RP-SMMA (MR 119)");
    }

    #[test]
    fn unknown_message_types() {
        for mti in [0x07, 0x0F] {
            assert_eq!(
                Rpdu::from_bytes(&[mti, 0x00]),
                Err(CodecError::UnknownMessageType {
                    layer: Layer::Relay,
                    value: 0x07
                })
            );
        }
    }
}
