// ABOUTME: Transfer-layer PDUs: the six TPDU kinds and the direction-aware decoder that selects between them
// ABOUTME: Also holds the TP-PI parameter block shared by the report kinds

mod command;
mod deliver;
mod deliver_report;
mod status_report;
mod submit;
mod submit_report;

pub use command::Command;
pub use deliver::Deliver;
pub use deliver_report::DeliverReport;
pub use status_report::StatusReport;
pub use submit::Submit;
pub use submit_report::SubmitReport;

use crate::codec::{
    CodecError, Decodable, Encodable, Layer, decode_u8, ensure_consumed, peek_u8,
};
use crate::datatypes::{CharSet, DataCoding, MAX_USER_DATA_LEN, UserData};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Which way a message travels between the mobile station and the service centre
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Mobile station to service centre (mobile originated)
    MsToSc,
    /// Service centre to mobile station (mobile terminated)
    ScToMs,
}

impl Direction {
    /// The opposite direction
    pub fn reverse(self) -> Self {
        match self {
            Direction::MsToSc => Direction::ScToMs,
            Direction::ScToMs => Direction::MsToSc,
        }
    }
}

/// Any transfer-layer PDU
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tpdu {
    Submit(Submit),
    Deliver(Deliver),
    Command(Command),
    StatusReport(StatusReport),
    SubmitReport(SubmitReport),
    DeliverReport(DeliverReport),
}

impl Tpdu {
    /// Decode one TPDU from the cursor; the direction disambiguates TP-MTI
    pub fn decode(direction: Direction, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mti = peek_u8(buf)? & 0x03;
        let tpdu = match (direction, mti) {
            (Direction::MsToSc, DeliverReport::MTI) => {
                Tpdu::DeliverReport(DeliverReport::decode(buf)?)
            }
            (Direction::MsToSc, Submit::MTI) => Tpdu::Submit(Submit::decode(buf)?),
            (Direction::MsToSc, Command::MTI) => Tpdu::Command(Command::decode(buf)?),
            (Direction::ScToMs, Deliver::MTI) => Tpdu::Deliver(Deliver::decode(buf)?),
            (Direction::ScToMs, SubmitReport::MTI) => {
                Tpdu::SubmitReport(SubmitReport::decode(buf)?)
            }
            (Direction::ScToMs, StatusReport::MTI) => {
                Tpdu::StatusReport(StatusReport::decode(buf)?)
            }
            (_, value) => {
                return Err(CodecError::UnknownMessageType {
                    layer: Layer::Transfer,
                    value,
                });
            }
        };
        Ok(tpdu)
    }

    /// Decode a complete TPDU, rejecting trailing bytes
    pub fn from_bytes(direction: Direction, bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let tpdu = Self::decode(direction, &mut cursor)?;
        ensure_consumed(&cursor)?;
        Ok(tpdu)
    }

    /// Direction this TPDU travels in
    pub fn direction(&self) -> Direction {
        match self {
            Tpdu::Submit(_) => Submit::DIRECTION,
            Tpdu::Deliver(_) => Deliver::DIRECTION,
            Tpdu::Command(_) => Command::DIRECTION,
            Tpdu::StatusReport(_) => StatusReport::DIRECTION,
            Tpdu::SubmitReport(_) => SubmitReport::DIRECTION,
            Tpdu::DeliverReport(_) => DeliverReport::DIRECTION,
        }
    }

    /// True for the kinds that only travel inside RP-ACK or RP-ERROR
    pub fn is_report(&self) -> bool {
        matches!(self, Tpdu::SubmitReport(_) | Tpdu::DeliverReport(_))
    }

    /// Short name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Tpdu::Submit(_) => "SMS-SUBMIT",
            Tpdu::Deliver(_) => "SMS-DELIVER",
            Tpdu::Command(_) => "SMS-COMMAND",
            Tpdu::StatusReport(_) => "SMS-STATUS-REPORT",
            Tpdu::SubmitReport(_) => "SMS-SUBMIT-REPORT",
            Tpdu::DeliverReport(_) => "SMS-DELIVER-REPORT",
        }
    }
}

impl Encodable for Tpdu {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Tpdu::Submit(pdu) => pdu.encode(buf),
            Tpdu::Deliver(pdu) => pdu.encode(buf),
            Tpdu::Command(pdu) => pdu.encode(buf),
            Tpdu::StatusReport(pdu) => pdu.encode(buf),
            Tpdu::SubmitReport(pdu) => pdu.encode(buf),
            Tpdu::DeliverReport(pdu) => pdu.encode(buf),
        }
    }
}

impl fmt::Display for Tpdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

const PI_PROTOCOL_ID: u8 = 0x01;
const PI_DATA_CODING: u8 = 0x02;
const PI_USER_DATA: u8 = 0x04;
const PI_EXTENSION: u8 = 0x80;

/// Optional TP-PID, TP-DCS and TP-UD announced by the TP-PI octet
///
/// User data without an explicit coding scheme is read and written with
/// the default alphabet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportParameters {
    pub protocol_id: Option<u8>,
    pub data_coding: Option<DataCoding>,
    pub user_data: Option<UserData>,
}

impl ReportParameters {
    /// TP-PI octet for the fields present
    pub fn indicator(&self) -> u8 {
        let mut pi = 0;
        if self.protocol_id.is_some() {
            pi |= PI_PROTOCOL_ID;
        }
        if self.data_coding.is_some() {
            pi |= PI_DATA_CODING;
        }
        if self.user_data.is_some() {
            pi |= PI_USER_DATA;
        }
        pi
    }

    pub fn is_empty(&self) -> bool {
        self.indicator() == 0
    }

    /// TP-UDHI for the first octet
    pub fn udhi(&self) -> bool {
        self.user_data.as_ref().is_some_and(UserData::udhi)
    }

    fn charset(&self) -> CharSet {
        self.data_coding.unwrap_or_default().charset()
    }

    /// Write TP-PI and the fields it announces
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.indicator());
        self.encode_fields(buf)
    }

    /// Write only the announced fields, for layouts that separate them from TP-PI
    pub(crate) fn encode_fields(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if let Some(pid) = self.protocol_id {
            buf.put_u8(pid);
        }
        if let Some(dcs) = self.data_coding {
            dcs.encode(buf)?;
        }
        if let Some(ud) = &self.user_data {
            ud.encode(buf, self.charset(), MAX_USER_DATA_LEN)?;
        }
        Ok(())
    }

    /// Read TP-PI and the fields it announces
    pub(crate) fn decode(buf: &mut Cursor<&[u8]>, udhi: bool) -> Result<Self, CodecError> {
        let pi = Self::decode_indicator(buf)?;
        Self::decode_fields(pi, buf, udhi)
    }

    pub(crate) fn decode_indicator(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
        let pi = decode_u8(buf)?;
        if pi & PI_EXTENSION != 0 {
            return Err(CodecError::field(
                "parameter_indicator",
                "extended parameter indicator is not supported",
            ));
        }
        Ok(pi)
    }

    /// Read the fields announced by an already decoded TP-PI
    pub(crate) fn decode_fields(
        pi: u8,
        buf: &mut Cursor<&[u8]>,
        udhi: bool,
    ) -> Result<Self, CodecError> {
        let mut params = ReportParameters::default();
        if pi & PI_PROTOCOL_ID != 0 {
            params.protocol_id = Some(decode_u8(buf)?);
        }
        if pi & PI_DATA_CODING != 0 {
            params.data_coding = Some(DataCoding::decode(buf)?);
        }
        if pi & PI_USER_DATA != 0 {
            params.user_data = Some(UserData::decode(
                buf,
                params.charset(),
                udhi,
                MAX_USER_DATA_LEN,
            )?);
        }
        Ok(params)
    }
}

/// TP-FCS is present when the octet after the first has bit 7 set, since every
/// defined failure cause is 0x80 or above and TP-PI never uses its extension bit
pub(crate) fn decode_failure_cause(buf: &mut Cursor<&[u8]>) -> Result<Option<u8>, CodecError> {
    if peek_u8(buf)? & 0x80 != 0 {
        Ok(Some(decode_u8(buf)?))
    } else {
        Ok(None)
    }
}

pub(crate) fn encode_failure_cause(
    buf: &mut BytesMut,
    failure_cause: Option<u8>,
) -> Result<(), CodecError> {
    if let Some(fcs) = failure_cause {
        if fcs & 0x80 == 0 {
            return Err(CodecError::field(
                "failure_cause",
                format!("{fcs:#04x} is below the defined range"),
            ));
        }
        buf.put_u8(fcs);
    }
    Ok(())
}

/// Set `bit` in `octet` when `flag` is true
pub(crate) fn flag(flag: bool, bit: u8) -> u8 {
    if flag { 1 << bit } else { 0 }
}

/// Test `bit` of `octet`
pub(crate) fn bit(octet: u8, bit: u8) -> bool {
    octet & (1 << bit) != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Address, InformationElement, NumberingPlan, Timestamp, TypeOfNumber};

    #[test]
    fn decodes_by_direction() {
        let submit = Submit::new(7, Address::international("1234").unwrap(), UserData::new("hi"));
        let bytes = Tpdu::from(submit.clone()).to_bytes().unwrap();
        assert_eq!(
            Tpdu::from_bytes(Direction::MsToSc, &bytes).unwrap(),
            Tpdu::Submit(submit)
        );
        // The same MTI read in the other direction is a submit report
        assert!(Tpdu::from_bytes(Direction::ScToMs, &bytes).is_err());
    }

    #[test]
    fn reserved_mti_is_unknown() {
        assert_eq!(
            Tpdu::from_bytes(Direction::MsToSc, &[0x03]),
            Err(CodecError::UnknownMessageType {
                layer: Layer::Transfer,
                value: 0x03
            })
        );
    }

    #[test]
    fn trailing_bytes_rejected() {
        let report = DeliverReport::default();
        let mut bytes = Tpdu::from(report).to_bytes().unwrap().to_vec();
        bytes.push(0x00);
        assert_eq!(
            Tpdu::from_bytes(Direction::MsToSc, &bytes),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn direction_and_kind() {
        let deliver = Deliver::new(
            Address::new(TypeOfNumber::Unknown, NumberingPlan::Unknown, "1").unwrap(),
            Timestamp::from_unix(0, 0),
            UserData::new("x"),
        );
        let tpdu = Tpdu::from(deliver);
        assert_eq!(tpdu.direction(), Direction::ScToMs);
        assert_eq!(tpdu.direction().reverse(), Direction::MsToSc);
        assert_eq!(tpdu.to_string(), "SMS-DELIVER");
        assert!(!tpdu.is_report());
        assert!(Tpdu::from(SubmitReport::new(Timestamp::from_unix(0, 0))).is_report());
    }

    #[test]
    fn parameters_default_to_gsm7() {
        let params = ReportParameters {
            protocol_id: None,
            data_coding: None,
            user_data: Some(UserData::new("ok").with_element(InformationElement::ConcatenatedSm {
                reference: 1,
                max: 2,
                seq: 1,
            })),
        };
        assert_eq!(params.indicator(), 0x04);
        assert!(params.udhi());
        let mut buf = BytesMut::new();
        params.encode(&mut buf).unwrap();
        let mut cursor = Cursor::new(&buf[..]);
        assert_eq!(ReportParameters::decode(&mut cursor, true).unwrap(), params);
    }

    #[test]
    fn failure_cause_detection() {
        let data = [0xC0, 0x00];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(decode_failure_cause(&mut cursor).unwrap(), Some(0xC0));
        assert_eq!(decode_failure_cause(&mut cursor).unwrap(), None);
        let mut buf = BytesMut::new();
        assert!(encode_failure_cause(&mut buf, Some(0x10)).is_err());
    }
}
