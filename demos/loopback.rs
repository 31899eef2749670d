// ABOUTME: Loopback example wiring a handset and a service centre stack over in-memory channels
// ABOUTME: Submits short messages through the relay and connection layers and prints the reports

//! # SMS Loopback
//!
//! Runs two protocol stacks in one process:
//!
//! * a handset, where a [`Relay`] sends RP-DATA through a [`Connection`]
//! * a service centre, whose [`Connection`] hands every submit to a handler
//!   that answers with an SMS-SUBMIT-REPORT
//!
//! CP messages travel between the two connections over channels, logged in
//! both directions.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example loopback -- --to 447700900123 --text "Hello there"
//!
//! # Several messages in parallel, with protocol debugging
//! cargo run --example loopback -- -d --to 447700900123 --text "Hi" --count 5
//! ```

use argh::FromArgs;
use sms::cpdu::Cpdu;
use sms::datatypes::{Address, Timestamp, UserData, ValidityPeriod};
use sms::rpdu::Rpdu;
use sms::tpdu::{Submit, SubmitReport, Tpdu};
use sms::{
    Connection, ConnectionConfig, ControlTransport, Encodable, Relay, RelayConfig,
    RelayTransport, SmsError, SmsResult, TransportHandler,
};
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Submit short messages over a loopback SMS stack
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the destination number in international format
    #[argh(option)]
    to: String,

    /// the message text
    #[argh(option)]
    text: String,

    /// the service centre address (default: 447785016005)
    #[argh(option)]
    service_centre: Option<String>,

    /// number of messages to submit at once (default: 1)
    #[argh(option)]
    count: Option<usize>,
}

/// Carries CP messages to the other side of the loopback
struct Wire {
    name: &'static str,
    tx: mpsc::UnboundedSender<Cpdu>,
}

impl ControlTransport for Wire {
    async fn send_control(&self, cpdu: Cpdu) -> SmsResult<()> {
        let bytes = cpdu.to_bytes()?;
        debug!("{} -> {} {:02X?}", self.name, cpdu, &bytes[..]);
        self.tx
            .send(cpdu)
            .map_err(|_| SmsError::Transport("loopback closed".into()))
    }
}

/// Handset application; it never receives anything in this example
struct Handset;

impl TransportHandler for Handset {
    async fn transport_request(&self, tpdu: Tpdu) -> SmsResult<Option<Tpdu>> {
        info!("Handset received {}", tpdu);
        Ok(None)
    }

    async fn memory_available(&self) -> SmsResult<()> {
        Ok(())
    }
}

/// Service centre application accepting every submit
struct ServiceCentre;

impl TransportHandler for ServiceCentre {
    async fn transport_request(&self, tpdu: Tpdu) -> SmsResult<Option<Tpdu>> {
        if let Tpdu::Submit(submit) = &tpdu {
            info!(
                "Service centre accepted MR {} for {}: {:?}",
                submit.message_reference, submit.destination, submit.user_data.text
            );
        }
        Ok(Some(SubmitReport::new(Timestamp::now()).into()))
    }

    async fn memory_available(&self) -> SmsResult<()> {
        info!("Handset has memory available");
        Ok(())
    }
}

/// Relay transport running each RP message through the handset connection
///
/// RP responses returned by the connection are handed back to the relay.
struct ConnectionLink {
    connection: Connection<Wire, Handset>,
    responses: mpsc::UnboundedSender<Rpdu>,
}

impl RelayTransport for ConnectionLink {
    async fn relay_request(&self, rpdu: Rpdu) -> SmsResult<()> {
        if let Some(response) = self.connection.send(rpdu).await? {
            let _ = self.responses.send(response);
        }
        Ok(())
    }
}

/// Feed every CP message arriving on `rx` into `connection`
fn pump<T: TransportHandler>(
    mut rx: mpsc::UnboundedReceiver<Cpdu>,
    connection: Connection<Wire, T>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(cpdu) = rx.recv().await {
            if let Err(e) = connection.receive(cpdu).await {
                warn!("Receive failed: {}", e);
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let service_centre = Address::international(
        cli_args.service_centre.as_deref().unwrap_or("447785016005"),
    )?;
    let destination = Address::international(&cli_args.to)?;
    let count = cli_args.count.unwrap_or(1);

    let (handset_tx, handset_rx) = mpsc::unbounded_channel();
    let (centre_tx, centre_rx) = mpsc::unbounded_channel();

    let handset = Connection::new(
        Wire {
            name: "MS",
            tx: handset_tx,
        },
        Handset,
        ConnectionConfig::default(),
    );
    let centre = Connection::new(
        Wire {
            name: "SC",
            tx: centre_tx,
        },
        ServiceCentre,
        ConnectionConfig::default(),
    );
    let to_centre = pump(handset_rx, centre.clone());
    let to_handset = pump(centre_rx, handset.clone());

    let (responses_tx, mut responses_rx) = mpsc::unbounded_channel();
    let relay = Relay::new(
        ConnectionLink {
            connection: handset,
            responses: responses_tx,
        },
        Handset,
        RelayConfig::new(service_centre).with_tr1m(Duration::from_secs(10)),
    );
    let indications = tokio::spawn({
        let relay = relay.clone();
        async move {
            while let Some(response) = responses_rx.recv().await {
                if let Err(e) = relay.indication(response).await {
                    warn!("Indication failed: {}", e);
                }
            }
        }
    });

    let submits: Vec<_> = (0..count)
        .map(|i| {
            let relay = relay.clone();
            let submit = Submit::new(
                i as u8,
                destination.clone(),
                UserData::new(cli_args.text.clone()),
            )
            .status_report_request(true)
            .validity_period(ValidityPeriod::Relative(167));
            tokio::spawn(async move { relay.transfer(submit.into()).await })
        })
        .collect();

    for (i, submit) in submits.into_iter().enumerate() {
        match submit.await? {
            Ok(Some(Tpdu::SubmitReport(report))) => {
                info!("Message {} accepted at {}", i, report.timestamp)
            }
            Ok(other) => info!("Message {} accepted: {:?}", i, other),
            Err(e) => warn!("Message {} failed: {}", i, e),
        }
    }

    indications.abort();
    to_centre.abort();
    to_handset.abort();
    Ok(())
}
