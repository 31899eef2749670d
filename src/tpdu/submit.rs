use crate::codec::{CodecError, Decodable, Encodable, decode_u8};
use crate::datatypes::{Address, DataCoding, MAX_USER_DATA_LEN, UserData, ValidityPeriod};
use crate::macros::{builder_setters, impl_tpdu_kind};
use crate::tpdu::{Direction, bit, flag};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// SMS-SUBMIT: a short message sent from the mobile station to the service centre
/// (TS 23.040 9.2.2.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submit {
    /// TP-RD: ask the service centre to reject a duplicate of a still-held message
    pub reject_duplicates: bool,
    /// TP-SRR: a status report is requested
    pub status_report_request: bool,
    /// TP-RP: reply path is set
    pub reply_path: bool,
    /// TP-MR
    pub message_reference: u8,
    /// TP-DA
    pub destination: Address,
    /// TP-PID
    pub protocol_id: u8,
    /// TP-DCS
    pub data_coding: DataCoding,
    /// TP-VP, whose format also selects TP-VPF
    pub validity_period: ValidityPeriod,
    /// TP-UD, whose header presence also selects TP-UDHI
    pub user_data: UserData,
}

impl_tpdu_kind!(Submit, 0x01, Direction::MsToSc);

impl Submit {
    /// A submit with default flags, PID 0 and GSM 7-bit coding
    pub fn new(message_reference: u8, destination: Address, user_data: UserData) -> Self {
        Self {
            reject_duplicates: false,
            status_report_request: false,
            reply_path: false,
            message_reference,
            destination,
            protocol_id: 0,
            data_coding: DataCoding::default(),
            validity_period: ValidityPeriod::NotPresent,
            user_data,
        }
    }

    builder_setters!(
        reject_duplicates: bool,
        status_report_request: bool,
        reply_path: bool,
        protocol_id: u8,
        data_coding: DataCoding,
        validity_period: ValidityPeriod,
    );

    fn first_octet(&self) -> u8 {
        Self::MTI
            | flag(self.reject_duplicates, 2)
            | (self.validity_period.vpf() << 3)
            | flag(self.status_report_request, 5)
            | flag(self.user_data.udhi(), 6)
            | flag(self.reply_path, 7)
    }
}

impl Encodable for Submit {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.first_octet());
        buf.put_u8(self.message_reference);
        self.destination.encode(buf)?;
        buf.put_u8(self.protocol_id);
        self.data_coding.encode(buf)?;
        self.validity_period.encode(buf)?;
        self.user_data
            .encode(buf, self.data_coding.charset(), MAX_USER_DATA_LEN)
    }
}

impl Decodable for Submit {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        Self::check_mti(first)?;

        let message_reference = decode_u8(buf)?;
        let destination = Address::decode(buf)?;
        let protocol_id = decode_u8(buf)?;
        let data_coding = DataCoding::decode(buf)?;
        let validity_period = ValidityPeriod::decode((first >> 3) & 0x03, buf)?;
        let user_data = UserData::decode(
            buf,
            data_coding.charset(),
            bit(first, 6),
            MAX_USER_DATA_LEN,
        )?;

        Ok(Self {
            reject_duplicates: bit(first, 2),
            status_report_request: bit(first, 5),
            reply_path: bit(first, 7),
            message_reference,
            destination,
            protocol_id,
            data_coding,
            validity_period,
            user_data,
        })
    }
}
