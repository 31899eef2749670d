// ABOUTME: Timer and seed configuration for the relay and connection state machines
// ABOUTME: Builder-style configs with the TS 24.011 default timer values

use crate::datatypes::{Address, AddressValue, NumberingPlan, TbcdString, TypeOfNumber};
use std::time::Duration;

/// Configuration for the relay layer (SMR)
///
/// # Example
///
/// ```rust
/// use sms::datatypes::Address;
/// use sms::sm::RelayConfig;
/// use std::time::Duration;
///
/// let config = RelayConfig::new(Address::international("447785016005").unwrap())
///     .with_tr1m(Duration::from_secs(40))
///     .with_initial_reference(17);
/// assert_eq!(config.tr1m, Duration::from_secs(40));
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Wait for RP-ACK or RP-ERROR after sending RP-DATA or RP-SMMA (default: 35 seconds)
    pub tr1m: Duration,

    /// First message reference the allocator tries (default: 0)
    ///
    /// Allocation continues from the slot after the last one claimed.
    pub initial_reference: u8,

    /// Service centre address carried in every RP-DATA (default: empty international number)
    pub service_centre: Address,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            tr1m: Duration::from_secs(35),
            initial_reference: 0,
            service_centre: Address {
                ton: TypeOfNumber::International,
                npi: NumberingPlan::Isdn,
                value: AddressValue::Digits(TbcdString::default()),
            },
        }
    }
}

impl RelayConfig {
    /// Create a relay configuration for the given service centre
    pub fn new(service_centre: Address) -> Self {
        Self {
            service_centre,
            ..Default::default()
        }
    }

    pub fn with_tr1m(mut self, tr1m: Duration) -> Self {
        self.tr1m = tr1m;
        self
    }

    pub fn with_initial_reference(mut self, initial_reference: u8) -> Self {
        self.initial_reference = initial_reference;
        self
    }

    pub fn with_service_centre(mut self, service_centre: Address) -> Self {
        self.service_centre = service_centre;
        self
    }
}

/// Configuration for the connection layer (SMC)
///
/// # Example
///
/// ```rust
/// use sms::sm::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::default()
///     .with_tc1m(Duration::from_secs(10))
///     .with_max_retransmissions(2);
/// assert_eq!(config.tr1m, Duration::from_secs(35));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Wait for CP-ACK after sending CP-DATA (default: 20 seconds)
    pub tc1m: Duration,

    /// CP-DATA retransmissions when TC1M expires before giving up (default: 1)
    pub max_retransmissions: u32,

    /// Wait for the RP response after an RP-DATA or RP-SMMA was acknowledged (default: 35 seconds)
    pub tr1m: Duration,

    /// First transaction identifier value the allocator tries, 0 to 7 (default: 0)
    pub initial_transaction: u8,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            tc1m: Duration::from_secs(20),
            max_retransmissions: 1,
            tr1m: Duration::from_secs(35),
            initial_transaction: 0,
        }
    }
}

impl ConnectionConfig {
    pub fn with_tc1m(mut self, tc1m: Duration) -> Self {
        self.tc1m = tc1m;
        self
    }

    pub fn with_max_retransmissions(mut self, max_retransmissions: u32) -> Self {
        self.max_retransmissions = max_retransmissions;
        self
    }

    pub fn with_tr1m(mut self, tr1m: Duration) -> Self {
        self.tr1m = tr1m;
        self
    }

    pub fn with_initial_transaction(mut self, initial_transaction: u8) -> Self {
        self.initial_transaction = initial_transaction;
        self
    }
}
