use crate::codec::{CodecError, Decodable, Encodable, decode_u8};
use crate::datatypes::{Address, Timestamp};
use crate::macros::{builder_setters, impl_tpdu_kind};
use crate::tpdu::{Direction, ReportParameters, bit, flag};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// SMS-STATUS-REPORT: the outcome of a previously submitted message
/// (TS 23.040 9.2.2.3).
///
/// TP-PI and the optional fields after it are written only when at least one
/// optional field is present, and read only when octets remain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusReport {
    /// More messages are waiting in the service centre (TP-MMS bit clear)
    pub more_messages: bool,
    /// TP-LP
    pub loop_prevention: bool,
    /// TP-SRQ: the report answers an SMS-COMMAND rather than an SMS-SUBMIT
    pub status_report_qualifier: bool,
    /// TP-MR of the message this report is about
    pub message_reference: u8,
    /// TP-RA
    pub recipient: Address,
    /// TP-SCTS
    pub timestamp: Timestamp,
    /// TP-DT
    pub discharge_time: Timestamp,
    /// TP-ST
    pub status: u8,
    pub parameters: ReportParameters,
}

impl_tpdu_kind!(StatusReport, 0x02, Direction::ScToMs);

impl StatusReport {
    pub fn new(
        message_reference: u8,
        recipient: Address,
        timestamp: Timestamp,
        discharge_time: Timestamp,
        status: u8,
    ) -> Self {
        Self {
            more_messages: false,
            loop_prevention: false,
            status_report_qualifier: false,
            message_reference,
            recipient,
            timestamp,
            discharge_time,
            status,
            parameters: ReportParameters::default(),
        }
    }

    builder_setters!(
        more_messages: bool,
        loop_prevention: bool,
        status_report_qualifier: bool,
        parameters: ReportParameters,
    );

    fn first_octet(&self) -> u8 {
        Self::MTI
            | flag(!self.more_messages, 2)
            | flag(self.loop_prevention, 3)
            | flag(self.status_report_qualifier, 5)
            | flag(self.parameters.udhi(), 6)
    }
}

impl Encodable for StatusReport {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.first_octet());
        buf.put_u8(self.message_reference);
        self.recipient.encode(buf)?;
        self.timestamp.encode(buf)?;
        self.discharge_time.encode(buf)?;
        buf.put_u8(self.status);
        if !self.parameters.is_empty() {
            self.parameters.encode(buf)?;
        }
        Ok(())
    }
}

impl Decodable for StatusReport {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        Self::check_mti(first)?;

        let message_reference = decode_u8(buf)?;
        let recipient = Address::decode(buf)?;
        let timestamp = Timestamp::decode(buf)?;
        let discharge_time = Timestamp::decode(buf)?;
        let status = decode_u8(buf)?;
        let parameters = if buf.has_remaining() {
            ReportParameters::decode(buf, bit(first, 6))?
        } else {
            ReportParameters::default()
        };

        Ok(Self {
            more_messages: !bit(first, 2),
            loop_prevention: bit(first, 3),
            status_report_qualifier: bit(first, 5),
            message_reference,
            recipient,
            timestamp,
            discharge_time,
            status,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{DataCoding, UserData};

    fn report() -> StatusReport {
        StatusReport::new(
            0x5A,
            Address::international("447700900123").unwrap(),
            Timestamp::from_unix(1_300_771_540, 36),
            Timestamp::from_unix(1_300_771_600, 36),
            0x00,
        )
    }

    #[test]
    fn without_parameters_omits_indicator() {
        let bytes = report().to_bytes().unwrap();
        // FO, MR, 8-octet address, two timestamps, status
        assert_eq!(bytes.len(), 1 + 1 + 8 + 7 + 7 + 1);
        assert_eq!(bytes[0], 0x06);
        assert_eq!(StatusReport::from_bytes(&bytes).unwrap(), report());
    }

    #[test]
    fn with_parameters() {
        let report = report()
            .more_messages(true)
            .status_report_qualifier(true)
            .parameters(ReportParameters {
                protocol_id: Some(0x00),
                data_coding: Some(DataCoding::gsm7()),
                user_data: Some(UserData::new("delivered")),
            });
        let bytes = report.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x02 | 0x20);
        assert_eq!(bytes[25], 0x07);
        assert_eq!(StatusReport::from_bytes(&bytes).unwrap(), report);
    }

    #[test]
    fn invalid_discharge_time() {
        let mut bytes = report().to_bytes().unwrap().to_vec();
        // month semi-octets of TP-DT
        bytes[18] = 0x31;
        assert!(StatusReport::from_bytes(&bytes).is_err());
    }
}
