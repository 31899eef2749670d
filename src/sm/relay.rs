// ABOUTME: Relay-layer state machine (SMR) with one transaction per RP message reference
// ABOUTME: Sends RP-DATA and RP-SMMA under TR1M and answers inbound requests through the transport handler

use crate::datatypes::RpCause;
use crate::rpdu::{RpData, RpMemoryAvailable, Rpdu};
use crate::sm::config::RelayConfig;
use crate::sm::error::{SmsError, SmsResult};
use crate::sm::slots::{Slots, Undelivered};
use crate::sm::traits::{RelayTransport, TransportHandler};
use crate::sm::{outcome, serve_request};
use crate::tpdu::{Direction, Tpdu};
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of concurrent relay transactions, one per message reference value
pub const REFERENCE_SLOTS: usize = 256;

struct Inner<R, T> {
    transport: R,
    handler: T,
    config: RelayConfig,
    /// Keyed by the direction the answer must travel in
    slots: Slots<Rpdu, Direction>,
}

/// Relay-layer state machine
///
/// Cloning is cheap and every clone drives the same message reference table,
/// so the receive path can run `indication` while other tasks wait in
/// `transfer`.
pub struct Relay<R, T> {
    inner: Arc<Inner<R, T>>,
}

impl<R, T> Clone for Relay<R, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RelayTransport, T: TransportHandler> Relay<R, T> {
    pub fn new(transport: R, handler: T, config: RelayConfig) -> Self {
        let slots = Slots::new(REFERENCE_SLOTS, usize::from(config.initial_reference));
        Self {
            inner: Arc::new(Inner {
                transport,
                handler,
                config,
                slots,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Message references not held by a transaction
    pub fn free_references(&self) -> usize {
        self.inner.slots.available()
    }

    /// Send a short message in RP-DATA and wait for the peer's answer.
    ///
    /// Returns the report carried by RP-ACK, or `SmsError::Relay` for RP-ERROR,
    /// TR1M expiry (cause 47) and reference exhaustion (cause 42).
    pub async fn transfer(&self, tpdu: Tpdu) -> SmsResult<Option<Tpdu>> {
        if tpdu.is_report() {
            return Err(SmsError::UnexpectedPdu {
                expected: "SMS-SUBMIT, SMS-COMMAND, SMS-DELIVER or SMS-STATUS-REPORT".to_string(),
                actual: tpdu.kind().to_string(),
            });
        }
        let inner = &self.inner;
        let answer = tpdu.direction().reverse();
        let mut claim = inner.slots.claim_keyed(answer).ok_or_else(|| {
            warn!("No free message reference for {}", tpdu.kind());
            SmsError::relay(RpCause::Congestion)
        })?;
        let mr = claim.index() as u8;
        debug!("Claimed MR {} for {}", mr, tpdu.kind());

        let request = Rpdu::from(RpData::new(mr, inner.config.service_centre.clone(), tpdu));
        self.send_request(request).await?;

        let response = match claim.recv_timeout(inner.config.tr1m).await {
            Some(response) => Some(response),
            None => claim.finish(),
        };
        drop(claim);

        match response {
            Some(Rpdu::Ack(ack)) => {
                debug!("MR {} acknowledged", mr);
                Ok(ack.tpdu)
            }
            Some(Rpdu::Error(error)) => {
                debug!("MR {} rejected with {}", mr, error.cause);
                Err(SmsError::Relay {
                    cause: error.cause,
                    diagnostic: error.diagnostic,
                    report: error.tpdu,
                })
            }
            other => Err(expired(mr, other)),
        }
    }

    /// Notify the peer with RP-SMMA and wait for its answer
    pub async fn memory_available(&self) -> SmsResult<()> {
        let inner = &self.inner;
        let mut claim = inner.slots.claim_keyed(Direction::ScToMs).ok_or_else(|| {
            warn!("No free message reference for RP-SMMA");
            SmsError::relay(RpCause::Congestion)
        })?;
        let mr = claim.index() as u8;
        debug!("Claimed MR {} for RP-SMMA", mr);

        self.send_request(RpMemoryAvailable { message_reference: mr }.into())
            .await?;

        let response = match claim.recv_timeout(inner.config.tr1m).await {
            Some(response) => Some(response),
            None => claim.finish(),
        };
        drop(claim);

        match response {
            Some(Rpdu::Ack(_)) => Ok(()),
            Some(Rpdu::Error(error)) => Err(SmsError::Relay {
                cause: error.cause,
                diagnostic: error.diagnostic,
                report: error.tpdu,
            }),
            other => Err(expired(mr, other)),
        }
    }

    /// Handle an RP-layer PDU received from the peer.
    ///
    /// RP-ACK and RP-ERROR complete the transaction holding their message
    /// reference, provided they travel opposite to its request; otherwise
    /// they are refused with cause 98 and the transaction keeps waiting.
    /// RP-DATA and RP-SMMA go to the transport handler and its outcome is
    /// sent back as RP-ACK or RP-ERROR.
    pub async fn indication(&self, rpdu: Rpdu) -> SmsResult<()> {
        if !rpdu.is_request() {
            let mr = usize::from(rpdu.message_reference());
            let answers = |answer: &Direction, rpdu: &Rpdu| rpdu.direction() == *answer;
            return match self.inner.slots.deliver_if(mr, rpdu, answers) {
                Ok(()) => Ok(()),
                Err(Undelivered::Refused(rpdu)) => {
                    warn!("{} travels the same way as its request", rpdu);
                    Err(SmsError::relay(RpCause::MessageNotCompatible))
                }
                Err(Undelivered::NoOwner(rpdu)) => {
                    warn!("{} does not match a waiting transaction", rpdu);
                    Err(SmsError::relay(RpCause::InvalidReference))
                }
            };
        }

        debug!("Serving {}", rpdu);
        let response = serve_request(&self.inner.handler, rpdu).await?;
        debug!("Answering with {}", response);
        self.inner.transport.relay_request(response.clone()).await?;
        outcome(&response)
    }

    async fn send_request(&self, request: Rpdu) -> SmsResult<()> {
        debug!("Sending {}", request);
        self.inner
            .transport
            .relay_request(request)
            .await
            .map_err(|err| {
                warn!("Lower layer refused the request: {}", err);
                match err {
                    // Already an RP outcome, e.g. from a Connection underneath
                    SmsError::Relay { .. } => err,
                    SmsError::Connection(_) => SmsError::relay(RpCause::ResourcesUnavailable),
                    _ => SmsError::relay(RpCause::ProtocolError),
                }
            })
    }
}

/// Outcome of a transaction that ended without RP-ACK or RP-ERROR
fn expired(mr: u8, response: Option<Rpdu>) -> SmsError {
    match response {
        None => warn!("TR1M expired for MR {}", mr),
        Some(other) => warn!("Unexpected {} for MR {}", other, mr),
    }
    SmsError::relay(RpCause::ResourcesUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Address, CpCause, Timestamp, UserData};
    use crate::rpdu::{RpAck, RpError};
    use crate::tpdu::{Direction, Submit, SubmitReport};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Outbox(mpsc::UnboundedSender<Rpdu>);

    impl RelayTransport for Outbox {
        async fn relay_request(&self, rpdu: Rpdu) -> SmsResult<()> {
            self.0
                .send(rpdu)
                .map_err(|_| SmsError::Connection(CpCause::NetworkFailure))
        }
    }

    struct Accept;

    impl TransportHandler for Accept {
        async fn transport_request(&self, _tpdu: Tpdu) -> SmsResult<Option<Tpdu>> {
            Ok(None)
        }

        async fn memory_available(&self) -> SmsResult<()> {
            Ok(())
        }
    }

    fn relay() -> (Relay<Outbox, Accept>, mpsc::UnboundedReceiver<Rpdu>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = RelayConfig::new(Address::international("447785016005").unwrap());
        (Relay::new(Outbox(tx), Accept, config), rx)
    }

    fn submit() -> Tpdu {
        Submit::new(1, Address::international("1234").unwrap(), UserData::new("hi")).into()
    }

    #[tokio::test]
    async fn transfer_returns_acknowledged_report() {
        let (relay, mut sent) = relay();
        let task = tokio::spawn({
            let relay = relay.clone();
            async move { relay.transfer(submit()).await }
        });

        let request = sent.recv().await.unwrap();
        assert_eq!(request.kind(), "RP-DATA");
        assert_eq!(relay.free_references(), REFERENCE_SLOTS - 1);

        let report = Tpdu::from(SubmitReport::new(Timestamp::from_unix(1_300_771_540, 0)));
        let ack =
            RpAck::new(Direction::ScToMs, request.message_reference()).tpdu(Some(report.clone()));
        relay.indication(ack.into()).await.unwrap();

        assert_eq!(task.await.unwrap(), Ok(Some(report)));
        assert_eq!(relay.free_references(), REFERENCE_SLOTS);
    }

    #[tokio::test]
    async fn transfer_returns_rp_error() {
        let (relay, mut sent) = relay();
        let task = tokio::spawn({
            let relay = relay.clone();
            async move { relay.transfer(submit()).await }
        });
        let mr = sent.recv().await.unwrap().message_reference();
        let error =
            RpError::new(Direction::ScToMs, mr, RpCause::UnknownSubscriber).diagnostic(Some(1));
        relay.indication(error.into()).await.unwrap();

        assert_eq!(
            task.await.unwrap(),
            Err(SmsError::Relay {
                cause: RpCause::UnknownSubscriber,
                diagnostic: Some(1),
                report: None,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tr1m_expiry_releases_reference() {
        let (relay, mut sent) = relay();
        let task = tokio::spawn({
            let relay = relay.clone();
            async move { relay.transfer(submit()).await }
        });
        let mr = sent.recv().await.unwrap().message_reference();
        tokio::time::sleep(Duration::from_secs(36)).await;

        assert_eq!(
            task.await.unwrap().unwrap_err().relay_cause(),
            Some(RpCause::ResourcesUnavailable)
        );
        assert_eq!(relay.free_references(), REFERENCE_SLOTS);
        // A late answer no longer matches anything
        let late = RpAck::new(Direction::ScToMs, mr);
        assert_eq!(
            relay.indication(late.into()).await,
            Err(SmsError::relay(RpCause::InvalidReference))
        );
    }

    #[tokio::test]
    async fn answer_in_request_direction_is_refused() {
        let (relay, mut sent) = relay();
        let task = tokio::spawn({
            let relay = relay.clone();
            async move { relay.transfer(submit()).await }
        });
        let mr = sent.recv().await.unwrap().message_reference();

        // A submit travels MS to SC, so its answer cannot
        let echoed = RpAck::new(Direction::MsToSc, mr);
        assert_eq!(
            relay.indication(echoed.into()).await,
            Err(SmsError::relay(RpCause::MessageNotCompatible))
        );
        assert_eq!(relay.free_references(), REFERENCE_SLOTS - 1);

        relay
            .indication(RpAck::new(Direction::ScToMs, mr).into())
            .await
            .unwrap();
        assert_eq!(task.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn lower_layer_rp_outcome_passes_through() {
        struct Busy;

        impl RelayTransport for Busy {
            async fn relay_request(&self, _rpdu: Rpdu) -> SmsResult<()> {
                Err(SmsError::relay(RpCause::Congestion))
            }
        }

        let config = RelayConfig::new(Address::international("447785016005").unwrap());
        let relay = Relay::new(Busy, Accept, config);
        assert_eq!(
            relay.transfer(submit()).await,
            Err(SmsError::relay(RpCause::Congestion))
        );
        assert_eq!(relay.free_references(), REFERENCE_SLOTS);
    }

    #[tokio::test]
    async fn lower_layer_failure_maps_to_cause() {
        let (relay, sent) = relay();
        drop(sent);
        assert_eq!(
            relay.transfer(submit()).await,
            Err(SmsError::relay(RpCause::ResourcesUnavailable))
        );
        assert_eq!(relay.free_references(), REFERENCE_SLOTS);
    }

    #[tokio::test]
    async fn reports_cannot_be_transferred() {
        let (relay, _sent) = relay();
        let report = Tpdu::from(SubmitReport::new(Timestamp::from_unix(1_300_771_540, 0)));
        assert!(matches!(
            relay.transfer(report).await,
            Err(SmsError::UnexpectedPdu { .. })
        ));
    }

    #[tokio::test]
    async fn references_follow_the_seed() {
        let (tx, mut sent) = mpsc::unbounded_channel();
        let config = RelayConfig::default().with_initial_reference(255);
        let relay = Relay::new(Outbox(tx), Accept, config);
        for expected in [255u8, 0] {
            let task = tokio::spawn({
                let relay = relay.clone();
                async move { relay.memory_available().await }
            });
            let request = sent.recv().await.unwrap();
            assert_eq!(request.message_reference(), expected);
            relay
                .indication(RpAck::new(Direction::ScToMs, expected).into())
                .await
                .unwrap();
            task.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn inbound_request_is_acknowledged() {
        let (relay, mut sent) = relay();
        let smma = Rpdu::from(RpMemoryAvailable {
            message_reference: 12,
        });
        relay.indication(smma).await.unwrap();
        assert_eq!(
            sent.recv().await.unwrap(),
            Rpdu::Ack(RpAck::new(Direction::ScToMs, 12))
        );
    }
}
