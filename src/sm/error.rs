// ABOUTME: Error type shared by the relay and connection state machines and their collaborators
// ABOUTME: Separates RP-ERROR and CP-ERROR outcomes from codec faults and opaque transport failures

use crate::codec::CodecError;
use crate::datatypes::{CpCause, RpCause};
use crate::tpdu::Tpdu;
use thiserror::Error;

/// Outcome of a failed relay or connection transaction
///
/// Collaborators return the same type, so that a `Relay` or `Connection`
/// failure reported by the application is carried onto the wire as RP-ERROR
/// or CP-ERROR, while any other failure is treated as unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmsError {
    /// RP-ERROR outcome, possibly carrying a report TPDU
    #[error("Relay error: {cause}")]
    Relay {
        cause: RpCause,
        diagnostic: Option<u8>,
        report: Option<Tpdu>,
    },

    /// CP-ERROR outcome
    #[error("Connection error: {0}")]
    Connection(CpCause),

    /// Encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A PDU of the wrong kind was handed to the state machine
    #[error("Unexpected PDU: expected {expected}, got {actual}")]
    UnexpectedPdu { expected: String, actual: String },

    /// Collaborator failure with no protocol meaning
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for state machine operations
pub type SmsResult<T> = Result<T, SmsError>;

impl SmsError {
    /// RP-ERROR outcome without diagnostic or report
    pub fn relay(cause: RpCause) -> Self {
        SmsError::Relay {
            cause,
            diagnostic: None,
            report: None,
        }
    }

    /// The RP cause, if this is an RP-ERROR outcome
    pub fn relay_cause(&self) -> Option<RpCause> {
        match self {
            SmsError::Relay { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    /// The CP cause, if this is a CP-ERROR outcome
    pub fn connection_cause(&self) -> Option<CpCause> {
        match self {
            SmsError::Connection(cause) => Some(*cause),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causes_and_messages() {
        let error = SmsError::relay(RpCause::ResourcesUnavailable);
        assert_eq!(error.relay_cause(), Some(RpCause::ResourcesUnavailable));
        assert_eq!(error.connection_cause(), None);
        assert_eq!(error.to_string(), "Relay error: RP cause 47");

        let error = SmsError::Connection(CpCause::InvalidTransactionId);
        assert_eq!(error.connection_cause(), Some(CpCause::InvalidTransactionId));
        assert_eq!(error.to_string(), "Connection error: CP cause 81");
    }

    #[test]
    fn codec_errors_convert() {
        let error: SmsError = CodecError::Incomplete.into();
        assert_eq!(error, SmsError::Codec(CodecError::Incomplete));
    }
}
