//! GSM/3GPP short message service protocol stack
//!
//! Wire codecs for the three SMS layers and the state machines that drive
//! the lower two:
//!
//! * [`tpdu`] - transfer layer (TS 23.040): SMS-SUBMIT, SMS-DELIVER and friends
//! * [`rpdu`] - relay layer (TS 24.011): RP-DATA, RP-ACK, RP-ERROR, RP-SMMA
//! * [`cpdu`] - connection layer (TS 24.011): CP-DATA, CP-ACK, CP-ERROR
//! * [`datatypes`] - field codecs: GSM 7-bit alphabet, data coding scheme,
//!   validity period, user data header, addresses and timestamps
//! * [`sm`] - relay (SMR) and connection (SMC) state machines
//!
//! # Examples
//!
//! ## Encoding an SMS-SUBMIT
//!
//! ```rust
//! use sms::datatypes::{Address, DataCoding, UserData, ValidityPeriod};
//! use sms::tpdu::{Direction, Submit, Tpdu};
//! use sms::Encodable;
//!
//! let submit = Submit::new(1, Address::international("447700900123")?, UserData::new("Hello"))
//!     .data_coding(DataCoding::gsm7())
//!     .validity_period(ValidityPeriod::Relative(167));
//! let bytes = Tpdu::from(submit.clone()).to_bytes()?;
//!
//! let decoded = Tpdu::from_bytes(Direction::MsToSc, &bytes)?;
//! assert_eq!(decoded, Tpdu::Submit(submit));
//! # Ok::<(), sms::CodecError>(())
//! ```
//!
//! ## Decoding a received envelope
//!
//! ```rust
//! use sms::cpdu::Cpdu;
//! use sms::rpdu::Rpdu;
//! use sms::Decodable;
//!
//! let cpdu = Cpdu::from_bytes(&[0x09, 0x01, 0x02, 0x06, 0x2A])?;
//! if let Cpdu::Data { payload, .. } = cpdu {
//!     let rpdu = Rpdu::from_bytes(&payload)?;
//!     assert_eq!(rpdu.kind(), "RP-SMMA");
//!     assert_eq!(rpdu.message_reference(), 42);
//! }
//! # Ok::<(), sms::CodecError>(())
//! ```

pub mod codec;
pub mod cpdu;
pub mod datatypes;
mod macros;
pub mod rpdu;
pub mod sm;
pub mod tpdu;


// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Layer};

// Re-export the PDU unions and state machines for easy access
pub use cpdu::{Cpdu, TransactionId};
pub use rpdu::Rpdu;
pub use sm::{
    Connection, ConnectionConfig, ControlTransport, Relay, RelayConfig, RelayTransport,
    SmsError, SmsResult, TransportHandler,
};
pub use tpdu::{Direction, Tpdu};
