// ABOUTME: Relay (SMR) and connection (SMC) state machines with their collaborators and configuration
// ABOUTME: Holds the request handling both layers share: collaborator outcome to RP-ACK or RP-ERROR

//! SMS state machines
//!
//! * [`Relay`] runs the RP layer: one transaction per message reference,
//!   guarded by TR1M.
//! * [`Connection`] runs the CP layer: one transaction per transaction
//!   identifier, with CP-ACK handshakes guarded by TC1M.
//!
//! Both own their correlation tables, call the application through
//! [`TransportHandler`] and emit PDUs through their transport trait. Failures
//! that have a wire representation are sent to the peer and also returned
//! to the caller as [`SmsError::Relay`] or [`SmsError::Connection`].

mod config;
mod connection;
mod error;
mod relay;
mod slots;
mod traits;

pub use config::{ConnectionConfig, RelayConfig};
pub use connection::{Connection, TRANSACTION_SLOTS};
pub use error::{SmsError, SmsResult};
pub use relay::{REFERENCE_SLOTS, Relay};
pub use traits::{ControlTransport, RelayTransport, TransportHandler};

use crate::datatypes::{CpCause, Timestamp};
use crate::rpdu::{RpAck, RpError, Rpdu};
use crate::tpdu::{DeliverReport, Direction, SubmitReport, Tpdu};
use tracing::warn;

/// Hand an inbound RP-DATA or RP-SMMA to the application and build the RP
/// response to send back.
///
/// An error means the outcome cannot be expressed as RP-ACK or RP-ERROR.
pub(crate) async fn serve_request<T: TransportHandler>(
    handler: &T,
    request: Rpdu,
) -> SmsResult<Rpdu> {
    let mr = request.message_reference();
    let direction = request.direction().reverse();
    match request {
        Rpdu::Data(data) => {
            let answers_submit = matches!(data.tpdu, Tpdu::Submit(_) | Tpdu::Command(_));
            match handler.transport_request(data.tpdu).await {
                Ok(report) => {
                    let report = report.unwrap_or_else(|| plain_report(answers_submit));
                    check_report(&report, direction)?;
                    Ok(RpAck::new(direction, mr).tpdu(Some(report)).into())
                }
                Err(err) => relay_failure(err, direction, mr),
            }
        }
        Rpdu::MemoryAvailable(_) => match handler.memory_available().await {
            Ok(()) => Ok(RpAck::new(direction, mr).into()),
            Err(err) => relay_failure(err, direction, mr),
        },
        other => Err(SmsError::UnexpectedPdu {
            expected: "RP-DATA or RP-SMMA".to_string(),
            actual: other.kind().to_string(),
        }),
    }
}

/// What the caller of a served request learns once the response is sent
pub(crate) fn outcome(response: &Rpdu) -> SmsResult<()> {
    match response {
        Rpdu::Error(error) => Err(SmsError::Relay {
            cause: error.cause,
            diagnostic: error.diagnostic,
            report: error.tpdu.clone(),
        }),
        _ => Ok(()),
    }
}

fn plain_report(answers_submit: bool) -> Tpdu {
    if answers_submit {
        SubmitReport::new(Timestamp::now()).into()
    } else {
        DeliverReport::default().into()
    }
}

fn check_report(report: &Tpdu, direction: Direction) -> SmsResult<()> {
    if report.is_report() && report.direction() == direction {
        return Ok(());
    }
    warn!("Collaborator answered with {}, which cannot be sent back", report.kind());
    Err(SmsError::Connection(CpCause::ProtocolError))
}

fn relay_failure(err: SmsError, direction: Direction, mr: u8) -> SmsResult<Rpdu> {
    match err {
        SmsError::Relay {
            cause,
            diagnostic,
            report,
        } => {
            if let Some(report) = &report {
                check_report(report, direction)?;
            }
            Ok(RpError::new(direction, mr, cause)
                .diagnostic(diagnostic)
                .tpdu(report)
                .into())
        }
        SmsError::Connection(cause) => Err(SmsError::Connection(cause)),
        other => {
            warn!("Collaborator failed without a protocol cause: {}", other);
            Err(SmsError::Connection(CpCause::ProtocolError))
        }
    }
}
