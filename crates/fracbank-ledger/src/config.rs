//! Ledger configuration

use fracbank_types::Amount;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Initial payment-asset cost of one prepaid stream unit
    #[serde(default = "default_stream_unit_cost")]
    pub stream_unit_cost: Amount,

    /// Cap given to a class first referenced by mint or setStreams
    #[serde(default)]
    pub default_max_supply: Amount,

    /// Events buffered per subscriber before slow receivers lag
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            stream_unit_cost: default_stream_unit_cost(),
            default_max_supply: Amount::zero(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_stream_unit_cost() -> Amount {
    Amount::new(1000)
}

fn default_event_capacity() -> usize {
    1024
}
