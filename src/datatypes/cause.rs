// ABOUTME: RP-Cause and CP-Cause values carried in RP-ERROR and CP-ERROR
// ABOUTME: Unknown cause values are preserved so they survive a decode/encode cycle

use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;

/// RP-Cause (TS 24.011 8.2.5.4)
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RpCause {
    UnassignedNumber = 1,
    OperatorDeterminedBarring = 8,
    CallBarred = 10,
    ShortMessageTransferRejected = 21,
    MemoryCapacityExceeded = 22,
    DestinationOutOfOrder = 27,
    UnidentifiedSubscriber = 28,
    FacilityRejected = 29,
    UnknownSubscriber = 30,
    NetworkOutOfOrder = 38,
    TemporaryFailure = 41,
    Congestion = 42,
    ResourcesUnavailable = 47,
    FacilityNotSubscribed = 50,
    FacilityNotImplemented = 69,
    InvalidReference = 81,
    SemanticallyIncorrectMessage = 95,
    InvalidMandatoryInformation = 96,
    MessageTypeNonExistent = 97,
    MessageNotCompatible = 98,
    InformationElementNonExistent = 99,
    ProtocolError = 111,
    Interworking = 127,
    #[num_enum(catch_all)]
    Other(u8),
}

/// CP-Cause (TS 24.011 8.1.4.2)
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CpCause {
    NetworkFailure = 17,
    Congestion = 22,
    InvalidTransactionId = 81,
    SemanticallyIncorrectMessage = 95,
    InvalidMandatoryInformation = 96,
    MessageTypeNonExistent = 97,
    MessageNotCompatible = 98,
    InformationElementNonExistent = 99,
    ProtocolError = 111,
    #[num_enum(catch_all)]
    Other(u8),
}

impl fmt::Display for RpCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RP cause {}", u8::from(*self))
    }
}

impl fmt::Display for CpCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CP cause {}", u8::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_causes() {
        assert_eq!(RpCause::from(42), RpCause::Congestion);
        assert_eq!(RpCause::from(47), RpCause::ResourcesUnavailable);
        assert_eq!(u8::from(RpCause::ProtocolError), 111);
        assert_eq!(CpCause::from(98), CpCause::MessageNotCompatible);
        assert_eq!(u8::from(CpCause::InvalidTransactionId), 81);
    }

    #[test]
    fn unknown_causes_preserved() {
        assert_eq!(RpCause::from(200), RpCause::Other(200));
        assert_eq!(u8::from(RpCause::Other(200)), 200);
        assert_eq!(CpCause::from(1), CpCause::Other(1));
        assert_eq!(CpCause::Other(1).to_string(), "CP cause 1");
    }
}
