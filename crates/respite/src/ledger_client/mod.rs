//! concrete redemption ledgers implementing the gate's code interface.

mod http;
mod static_list;

pub use http::HttpLedger;
pub use static_list::StaticLedger;

use respite_gate::RedemptionLedgerBoxed;
use respite_types::LedgerConfig;

/// construct a boxed redemption ledger from config.
pub fn from_config(config: &LedgerConfig) -> Box<dyn RedemptionLedgerBoxed> {
    match config {
        LedgerConfig::Http { url, token } => {
            Box::new(HttpLedger::new(url.clone(), token.clone()))
        }
        LedgerConfig::Static { codes } => Box::new(StaticLedger::new(codes.clone())),
    }
}
