use crate::codec::{CodecError, Decodable, Encodable, decode_u8};
use crate::datatypes::Timestamp;
use crate::macros::{builder_setters, impl_tpdu_kind};
use crate::tpdu::{
    Direction, ReportParameters, bit, decode_failure_cause, encode_failure_cause, flag,
};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// SMS-SUBMIT-REPORT: the service centre's answer to an SMS-SUBMIT or
/// SMS-COMMAND (TS 23.040 9.2.2.2a). Carried inside RP-ACK, or inside RP-ERROR
/// with a failure cause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitReport {
    /// TP-FCS, only for the RP-ERROR form
    pub failure_cause: Option<u8>,
    /// TP-SCTS
    pub timestamp: Timestamp,
    pub parameters: ReportParameters,
}

impl_tpdu_kind!(SubmitReport, 0x01, Direction::ScToMs);

impl SubmitReport {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            failure_cause: None,
            timestamp,
            parameters: ReportParameters::default(),
        }
    }

    builder_setters!(
        failure_cause: Option<u8>,
        parameters: ReportParameters,
    );
}

impl Encodable for SubmitReport {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(Self::MTI | flag(self.parameters.udhi(), 6));
        encode_failure_cause(buf, self.failure_cause)?;
        // TP-SCTS sits between TP-PI and the fields it announces
        buf.put_u8(self.parameters.indicator());
        self.timestamp.encode(buf)?;
        self.parameters.encode_fields(buf)
    }
}

impl Decodable for SubmitReport {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        Self::check_mti(first)?;

        let failure_cause = decode_failure_cause(buf)?;
        let pi = ReportParameters::decode_indicator(buf)?;
        let timestamp = Timestamp::decode(buf)?;
        let parameters = ReportParameters::decode_fields(pi, buf, bit(first, 6))?;

        Ok(Self {
            failure_cause,
            timestamp,
            parameters,
        })
    }
}
