// ABOUTME: Connection-layer state machine (SMC) with one transaction per CP transaction identifier
// ABOUTME: Runs the CP-DATA/CP-ACK handshake under TC1M and serves inbound requests on spawned tasks

use crate::codec::{CodecError, Decodable};
use crate::cpdu::{Cpdu, TransactionId};
use crate::datatypes::{CpCause, RpCause};
use crate::rpdu::Rpdu;
use crate::sm::config::ConnectionConfig;
use crate::sm::error::{SmsError, SmsResult};
use crate::sm::serve_request;
use crate::sm::slots::{Claim, Slots};
use crate::sm::traits::{ControlTransport, TransportHandler};
use std::sync::Arc;
use tracing::{debug, warn};

/// Transaction identifiers per direction; the TI flag tells the tables apart
pub const TRANSACTION_SLOTS: usize = 8;

struct Inner<C, T> {
    transport: C,
    handler: T,
    config: ConnectionConfig,
    /// Transactions this side opened (TI flag clear when sent, set when received)
    outgoing: Slots<Cpdu>,
    /// Transactions the peer opened
    incoming: Slots<Cpdu>,
}

/// Connection-layer state machine
///
/// Cloning is cheap; the receive path calls [`Connection::receive`] on one
/// clone while callers wait in [`Connection::send`] on others.
pub struct Connection<C, T> {
    inner: Arc<Inner<C, T>>,
}

impl<C, T> Clone for Connection<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// Cause for an RPDU that could not be decoded
fn decode_cause(err: &CodecError) -> CpCause {
    match err {
        CodecError::UnknownMessageType { .. } => CpCause::MessageTypeNonExistent,
        _ => CpCause::SemanticallyIncorrectMessage,
    }
}

impl<C: ControlTransport, T: TransportHandler> Connection<C, T> {
    pub fn new(transport: C, handler: T, config: ConnectionConfig) -> Self {
        let outgoing = Slots::new(TRANSACTION_SLOTS, usize::from(config.initial_transaction));
        let incoming = Slots::new(TRANSACTION_SLOTS, 0);
        Self {
            inner: Arc::new(Inner {
                transport,
                handler,
                config,
                outgoing,
                incoming,
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Transaction identifiers available for `send`
    pub fn free_outgoing(&self) -> usize {
        self.inner.outgoing.available()
    }

    /// Transaction identifiers available to the peer
    pub fn free_incoming(&self) -> usize {
        self.inner.incoming.available()
    }

    /// Send an RPDU in CP-DATA on a fresh transaction.
    ///
    /// For RP-DATA and RP-SMMA the RP response arriving on the same
    /// transaction is acknowledged and returned; other RPDUs complete once
    /// CP-ACK arrives and return `None`.
    pub async fn send(&self, rpdu: Rpdu) -> SmsResult<Option<Rpdu>> {
        let mut claim = self.inner.outgoing.claim().ok_or_else(|| {
            warn!("No free transaction identifier for {}", rpdu);
            SmsError::relay(RpCause::Congestion)
        })?;
        let ti = TransactionId {
            flag: false,
            value: claim.index() as u8,
        };
        debug!("{} claimed for {}", ti, rpdu);

        let data = Cpdu::data(ti, &rpdu)?;
        let mut pending = self.deliver_data(&mut claim, data).await?;
        if !rpdu.is_request() {
            return Ok(None);
        }

        loop {
            let event = match pending.take() {
                Some(event) => Some(event),
                None => match claim.recv_timeout(self.inner.config.tr1m).await {
                    Some(event) => Some(event),
                    None => claim.finish(),
                },
            };
            match event {
                Some(Cpdu::Data { payload, .. }) => {
                    return self.accept_response(ti, &rpdu, &payload).await.map(Some);
                }
                Some(Cpdu::Ack { .. }) => debug!("Repeated CP-ACK on {}", ti),
                Some(Cpdu::Error { cause, .. }) => {
                    warn!("Peer aborted {} with {}", ti, cause);
                    return Err(SmsError::Connection(cause));
                }
                None => {
                    warn!("TR1M expired on {}", ti);
                    return Err(SmsError::relay(RpCause::ResourcesUnavailable));
                }
            }
        }
    }

    /// Handle a CP-layer PDU received from the peer
    pub async fn receive(&self, cpdu: Cpdu) -> SmsResult<()> {
        let ti = cpdu.ti();
        let index = usize::from(ti.value);

        if ti.flag {
            // The peer is answering a transaction this side opened
            return match self.inner.outgoing.deliver(index, cpdu) {
                Ok(()) => Ok(()),
                Err(cpdu) => self.stray(cpdu).await,
            };
        }

        match cpdu {
            Cpdu::Data { payload, .. } => self.open_incoming(ti, &payload).await,
            other => match self.inner.incoming.deliver(index, other) {
                Ok(()) => Ok(()),
                Err(other) => self.stray(other).await,
            },
        }
    }

    /// Decode and handle raw CP-layer bytes; an unknown message type is
    /// answered with CP-ERROR 97
    pub async fn receive_bytes(&self, bytes: &[u8]) -> SmsResult<()> {
        match Cpdu::from_bytes(bytes) {
            Ok(cpdu) => self.receive(cpdu).await,
            Err(CodecError::UnknownMessageType { value, .. }) => {
                warn!("Unknown CP message type {:#04x}", value);
                match bytes.first().map(|&octet| TransactionId::from_octet(octet)) {
                    Some(Ok(ti)) => {
                        self.reject(ti.reverse(), CpCause::MessageTypeNonExistent)
                            .await
                    }
                    _ => Err(SmsError::Connection(CpCause::MessageTypeNonExistent)),
                }
            }
            Err(err) => {
                warn!("Dropping undecodable CP message: {}", err);
                Err(err.into())
            }
        }
    }

    async fn emit(&self, cpdu: Cpdu) -> SmsResult<()> {
        debug!("Emitting {}", cpdu);
        self.inner.transport.send_control(cpdu).await
    }

    /// Send CP-ERROR and report the same cause to the caller
    async fn reject<X>(&self, ti: TransactionId, cause: CpCause) -> SmsResult<X> {
        self.emit(Cpdu::Error { ti, cause }).await?;
        Err(SmsError::Connection(cause))
    }

    /// A CP message for a transaction that is not waiting for it
    async fn stray(&self, cpdu: Cpdu) -> SmsResult<()> {
        warn!("{} does not match a waiting transaction", cpdu);
        match cpdu {
            // Never answer an error with an error
            Cpdu::Error { .. } => Err(SmsError::Connection(CpCause::InvalidTransactionId)),
            other => {
                self.reject(other.ti().reverse(), CpCause::InvalidTransactionId)
                    .await
            }
        }
    }

    /// Emit CP-DATA until CP-ACK arrives, retransmitting on TC1M expiry.
    ///
    /// A CP-DATA from the peer implies the acknowledgement and is returned.
    async fn deliver_data(&self, claim: &mut Claim<Cpdu>, data: Cpdu) -> SmsResult<Option<Cpdu>> {
        let ti = data.ti();
        let mut retransmissions = 0;
        loop {
            self.emit(data.clone()).await?;
            match claim.recv_timeout(self.inner.config.tc1m).await {
                Some(Cpdu::Ack { .. }) => {
                    debug!("CP-DATA on {} acknowledged", ti);
                    return Ok(None);
                }
                Some(Cpdu::Error { cause, .. }) => {
                    warn!("Peer rejected CP-DATA on {} with {}", ti, cause);
                    return Err(SmsError::Connection(cause));
                }
                Some(data @ Cpdu::Data { .. }) => {
                    debug!("CP-DATA on {} taken as acknowledgement", ti);
                    return Ok(Some(data));
                }
                None if retransmissions < self.inner.config.max_retransmissions => {
                    retransmissions += 1;
                    warn!("TC1M expired on {}, retransmission {}", ti, retransmissions);
                }
                None => {
                    warn!("TC1M expired on {}, giving up", ti);
                    return Err(SmsError::Connection(CpCause::NetworkFailure));
                }
            }
        }
    }

    /// Validate the RP response to an outgoing request and acknowledge it
    async fn accept_response(
        &self,
        ti: TransactionId,
        request: &Rpdu,
        payload: &[u8],
    ) -> SmsResult<Rpdu> {
        let response = match Rpdu::from_bytes(payload) {
            Ok(response) => response,
            Err(err) => {
                warn!("Undecodable RP response on {}: {}", ti, err);
                return self.reject(ti, decode_cause(&err)).await;
            }
        };
        if response.is_request() || response.direction() != request.direction().reverse() {
            warn!("{} cannot answer {} on {}", response, request, ti);
            return self.reject(ti, CpCause::MessageNotCompatible).await;
        }
        if response.message_reference() != request.message_reference() {
            warn!("{} does not answer {} on {}", response, request, ti);
            return self.reject(ti, CpCause::InvalidTransactionId).await;
        }
        self.emit(Cpdu::Ack { ti }).await?;
        Ok(response)
    }

    /// CP-DATA with the peer's TI flag: a new request, or a retransmission of one in progress
    async fn open_incoming(&self, ti: TransactionId, payload: &[u8]) -> SmsResult<()> {
        let index = usize::from(ti.value);
        let reply = ti.reverse();
        if self.inner.incoming.is_claimed(index) {
            debug!("Retransmitted CP-DATA on {}, acknowledging again", ti);
            return self.emit(Cpdu::Ack { ti: reply }).await;
        }

        let request = match Rpdu::from_bytes(payload) {
            Ok(request) if request.is_request() => request,
            Ok(other) => {
                warn!("{} on idle {} does not open a transaction", other, ti);
                return self.reject(reply, CpCause::MessageNotCompatible).await;
            }
            Err(CodecError::UnknownMessageType { value, .. }) => {
                warn!("Unknown RP message type {:#04x} on idle {}", value, ti);
                return self.reject(reply, CpCause::MessageNotCompatible).await;
            }
            Err(err) => {
                warn!("Malformed RP message on {}: {}", ti, err);
                return self.reject(reply, CpCause::SemanticallyIncorrectMessage).await;
            }
        };

        let Some(claim) = self.inner.incoming.claim_at(index) else {
            return self.emit(Cpdu::Ack { ti: reply }).await;
        };
        debug!("{} claimed for {}", ti, request);
        self.emit(Cpdu::Ack { ti: reply }).await?;

        let this = self.clone();
        tokio::spawn(async move { this.serve_incoming(claim, reply, request).await });
        Ok(())
    }

    /// Transaction task for a request the peer opened
    async fn serve_incoming(self, mut claim: Claim<Cpdu>, ti: TransactionId, request: Rpdu) {
        let reply = match serve_request(&self.inner.handler, request).await {
            Ok(response) => Cpdu::data(ti, &response).map_err(SmsError::from),
            Err(err) => Err(err),
        };
        let data = match reply {
            Ok(data) => data,
            Err(err) => {
                let cause = err
                    .connection_cause()
                    .unwrap_or(CpCause::ProtocolError);
                warn!("Answering {} with CP-ERROR: {}", ti, err);
                if let Err(err) = self.emit(Cpdu::Error { ti, cause }).await {
                    warn!("Could not send CP-ERROR on {}: {}", ti, err);
                }
                return;
            }
        };

        match self.deliver_data(&mut claim, data).await {
            Ok(_) => debug!("{} complete", ti),
            Err(err) => warn!("{} ended without acknowledgement: {}", ti, err),
        }
    }
}
