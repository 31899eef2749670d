use crate::codec::{CodecError, Decodable, Encodable, decode_u8};
use crate::datatypes::{Address, CharSet, MAX_COMMAND_DATA_LEN, UserData};
use crate::macros::{builder_setters, impl_tpdu_kind};
use crate::tpdu::{Direction, bit, flag};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// SMS-COMMAND: an operation on a previously submitted message
/// (TS 23.040 9.2.2.4). TP-CD is always carried as 8-bit data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// TP-SRR: a status report is requested
    pub status_report_request: bool,
    /// TP-MR
    pub message_reference: u8,
    /// TP-PID
    pub protocol_id: u8,
    /// TP-CT
    pub command_type: u8,
    /// TP-MN: reference of the message the command applies to
    pub message_number: u8,
    /// TP-DA
    pub destination: Address,
    /// TP-CD
    pub command_data: UserData,
}

impl_tpdu_kind!(Command, 0x02, Direction::MsToSc);

impl Command {
    /// Command type asking for a status report on a submitted message
    pub const ENQUIRY: u8 = 0x00;
    pub const CANCEL_STATUS_REPORT: u8 = 0x01;
    pub const DELETE: u8 = 0x02;
    pub const ENABLE_STATUS_REPORT: u8 = 0x03;

    pub fn new(
        message_reference: u8,
        command_type: u8,
        message_number: u8,
        destination: Address,
    ) -> Self {
        Self {
            status_report_request: false,
            message_reference,
            protocol_id: 0,
            command_type,
            message_number,
            destination,
            command_data: UserData::default(),
        }
    }

    builder_setters!(
        status_report_request: bool,
        protocol_id: u8,
        command_data: UserData,
    );

    fn first_octet(&self) -> u8 {
        Self::MTI | flag(self.status_report_request, 5) | flag(self.command_data.udhi(), 6)
    }
}

impl Encodable for Command {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(self.first_octet());
        buf.put_u8(self.message_reference);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.command_type);
        buf.put_u8(self.message_number);
        self.destination.encode(buf)?;
        self.command_data
            .encode(buf, CharSet::EightBit, MAX_COMMAND_DATA_LEN)
    }
}

impl Decodable for Command {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        Self::check_mti(first)?;

        let message_reference = decode_u8(buf)?;
        let protocol_id = decode_u8(buf)?;
        let command_type = decode_u8(buf)?;
        let message_number = decode_u8(buf)?;
        let destination = Address::decode(buf)?;
        let command_data = UserData::decode(
            buf,
            CharSet::EightBit,
            bit(first, 6),
            MAX_COMMAND_DATA_LEN,
        )?;

        Ok(Self {
            status_report_request: bit(first, 5),
            message_reference,
            protocol_id,
            command_type,
            message_number,
            destination,
            command_data,
        })
    }
}
