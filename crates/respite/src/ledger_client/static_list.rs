//! static redemption ledger.
//!
//! validates codes against a list from the config file. useful for
//! air-gapped deployments and tests. codes are single-use per process
//! lifetime; durable single-use needs a real ledger.

use std::collections::HashMap;
use std::sync::Mutex;

use respite_gate::ledger::{LedgerError, RedemptionLedger};
use respite_types::{Redemption, StaticCode};

/// redemption ledger backed by a configured code list.
pub struct StaticLedger {
    codes: Mutex<HashMap<String, Redemption>>,
}

impl StaticLedger {
    /// create a ledger from the configured code entries.
    pub fn new(codes: Vec<StaticCode>) -> Self {
        let codes = codes
            .into_iter()
            .map(|entry| {
                (
                    entry.code,
                    Redemption {
                        kind: entry.kind,
                        duration_secs: entry.duration_secs,
                    },
                )
            })
            .collect();
        Self {
            codes: Mutex::new(codes),
        }
    }
}

impl RedemptionLedger for StaticLedger {
    async fn redeem(&self, code: String) -> Result<Option<Redemption>, LedgerError> {
        let mut codes = self.codes.lock().expect("ledger mutex poisoned");
        Ok(codes.remove(&code))
    }
}
