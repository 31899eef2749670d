use crate::codec::{CodecError, Decodable, Encodable, decode_u8};
use crate::datatypes::{Address, DataCoding, MAX_USER_DATA_LEN, Timestamp, UserData};
use crate::macros::{builder_setters, impl_tpdu_kind};
use crate::tpdu::{Direction, bit, flag};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// SMS-DELIVER: a short message delivered from the service centre to the mobile
/// station (TS 23.040 9.2.2.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deliver {
    /// More messages are waiting in the service centre (TP-MMS bit clear)
    pub more_messages: bool,
    /// TP-LP: loop prevention
    pub loop_prevention: bool,
    /// TP-SRI: a status report will be returned to the originator
    pub status_report_indication: bool,
    /// TP-RP: reply path is set
    pub reply_path: bool,
    /// TP-OA
    pub originator: Address,
    /// TP-PID
    pub protocol_id: u8,
    /// TP-DCS
    pub data_coding: DataCoding,
    /// TP-SCTS
    pub timestamp: Timestamp,
    /// TP-UD
    pub user_data: UserData,
}

impl_tpdu_kind!(Deliver, 0x00, Direction::ScToMs);

impl Deliver {
    /// A deliver with default flags, PID 0 and GSM 7-bit coding
    pub fn new(originator: Address, timestamp: Timestamp, user_data: UserData) -> Self {
        Self {
            more_messages: false,
            loop_prevention: false,
            status_report_indication: false,
            reply_path: false,
            originator,
            protocol_id: 0,
            data_coding: DataCoding::default(),
            timestamp,
            user_data,
        }
    }

    builder_setters!(
        more_messages: bool,
        loop_prevention: bool,
        status_report_indication: bool,
        reply_path: bool,
        protocol_id: u8,
        data_coding: DataCoding,
    );

    fn first_octet(&self) -> u8 {
        Self::MTI
            | flag(!self.more_messages, 2)
            | flag(self.loop_prevention, 3)
            | flag(self.status_report_indication, 5)
            | flag(self.user_data.udhi(), 6)
            | flag(self.reply_path, 7)
    }
}

impl Encodable for Deliver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.first_octet());
        self.originator.encode(buf)?;
        buf.put_u8(self.protocol_id);
        self.data_coding.encode(buf)?;
        self.timestamp.encode(buf)?;
        self.user_data
            .encode(buf, self.data_coding.charset(), MAX_USER_DATA_LEN)
    }
}

impl Decodable for Deliver {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        Self::check_mti(first)?;

        let originator = Address::decode(buf)?;
        let protocol_id = decode_u8(buf)?;
        let data_coding = DataCoding::decode(buf)?;
        let timestamp = Timestamp::decode(buf)?;
        let user_data = UserData::decode(
            buf,
            data_coding.charset(),
            bit(first, 6),
            MAX_USER_DATA_LEN,
        )?;

        Ok(Self {
            more_messages: !bit(first, 2),
            loop_prevention: bit(first, 3),
            status_report_indication: bit(first, 5),
            reply_path: bit(first, 7),
            originator,
            protocol_id,
            data_coding,
            timestamp,
            user_data,
        })
    }
}
