// ABOUTME: Collaborator interfaces the state machines call out to
// ABOUTME: Native async trait methods whose futures are Send so transactions can run on spawned tasks

use crate::cpdu::Cpdu;
use crate::rpdu::Rpdu;
use crate::sm::error::SmsResult;
use crate::tpdu::Tpdu;
use std::future::Future;

/// Lower transport for the connection layer
///
/// Implementations hand the CP-layer PDU to whatever signalling channel
/// carries it. They may use `async fn` directly.
pub trait ControlTransport: Send + Sync + 'static {
    fn send_control(&self, cpdu: Cpdu) -> impl Future<Output = SmsResult<()>> + Send;
}

/// Lower transport for the relay layer
///
/// Returning `SmsError::Connection` marks a CP-layer failure, which the relay
/// reports as RP cause 47; any other error becomes cause 111.
pub trait RelayTransport: Send + Sync + 'static {
    fn relay_request(&self, rpdu: Rpdu) -> impl Future<Output = SmsResult<()>> + Send;
}

/// Application side that consumes inbound short messages
pub trait TransportHandler: Send + Sync + 'static {
    /// Deliver an inbound SMS-SUBMIT, SMS-COMMAND, SMS-DELIVER or SMS-STATUS-REPORT.
    ///
    /// `Ok(Some(report))` is sent back inside RP-ACK. `Ok(None)` lets the state
    /// machine build a plain report. `Err(SmsError::Relay { .. })` is answered
    /// with RP-ERROR and `Err(SmsError::Connection(_))` with CP-ERROR.
    fn transport_request(&self, tpdu: Tpdu)
    -> impl Future<Output = SmsResult<Option<Tpdu>>> + Send;

    /// The peer announced that it has memory available again (RP-SMMA)
    fn memory_available(&self) -> impl Future<Output = SmsResult<()>> + Send;
}
