use crate::codec::{CodecError, Decodable, Encodable, decode_u8};
use crate::macros::{builder_setters, impl_tpdu_kind};
use crate::tpdu::{
    Direction, ReportParameters, bit, decode_failure_cause, encode_failure_cause, flag,
};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// SMS-DELIVER-REPORT: the mobile station's answer to an SMS-DELIVER or
/// SMS-STATUS-REPORT (TS 23.040 9.2.2.1a).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliverReport {
    /// TP-FCS, only for the RP-ERROR form
    pub failure_cause: Option<u8>,
    pub parameters: ReportParameters,
}

impl_tpdu_kind!(DeliverReport, 0x00, Direction::MsToSc);

impl DeliverReport {
    builder_setters!(
        failure_cause: Option<u8>,
        parameters: ReportParameters,
    );
}

impl Encodable for DeliverReport {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(Self::MTI | flag(self.parameters.udhi(), 6));
        encode_failure_cause(buf, self.failure_cause)?;
        self.parameters.encode(buf)
    }
}

impl Decodable for DeliverReport {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        Self::check_mti(first)?;

        let failure_cause = decode_failure_cause(buf)?;
        let parameters = ReportParameters::decode(buf, bit(first, 6))?;
        Ok(Self {
            failure_cause,
            parameters,
        })
    }
}
