//! test utilities: recording and failing collaborator doubles.
//!
//! these live in the crate proper (not behind `cfg(test)`) so the server
//! crate's integration tests can drive a gate against them too.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use respite_db::{GateRecord, GateStore};
use respite_types::Redemption;

use crate::gateway::{GatewayError, RuleGateway};
use crate::ledger::{LedgerError, RedemptionLedger};

/// a rule gateway that records every successful `set_blocking` call and
/// can be told to fail on demand.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    inner: Arc<RecordingInner>,
}

#[derive(Default)]
struct RecordingInner {
    calls: Mutex<Vec<bool>>,
    fail: AtomicBool,
}

impl RecordingGateway {
    /// create a gateway that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// make subsequent calls fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.inner.fail.store(fail, Ordering::SeqCst);
    }

    /// the values successfully applied so far, in order.
    pub fn calls(&self) -> Vec<bool> {
        self.inner.calls.lock().expect("gateway mutex poisoned").clone()
    }
}

impl RuleGateway for RecordingGateway {
    async fn set_blocking(&self, enabled: bool) -> Result<(), GatewayError> {
        if self.inner.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Backend("gateway offline".to_string()));
        }
        self.inner
            .calls
            .lock()
            .expect("gateway mutex poisoned")
            .push(enabled);
        Ok(())
    }
}

/// an in-memory single-use code ledger.
#[derive(Clone, Default)]
pub struct FakeLedger {
    inner: Arc<FakeLedgerInner>,
}

#[derive(Default)]
struct FakeLedgerInner {
    codes: Mutex<HashMap<String, Redemption>>,
    redeem_calls: AtomicUsize,
}

impl FakeLedger {
    /// create an empty ledger: every code is invalid.
    pub fn new() -> Self {
        Self::default()
    }

    /// register a redeemable code. codes are single-use.
    pub fn insert_code(&self, code: &str, redemption: Redemption) {
        self.inner
            .codes
            .lock()
            .expect("ledger mutex poisoned")
            .insert(code.to_string(), redemption);
    }

    /// how many times `redeem` has been called.
    pub fn redeem_calls(&self) -> usize {
        self.inner.redeem_calls.load(Ordering::SeqCst)
    }
}

impl RedemptionLedger for FakeLedger {
    async fn redeem(&self, code: String) -> Result<Option<Redemption>, LedgerError> {
        self.inner.redeem_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inner
            .codes
            .lock()
            .expect("ledger mutex poisoned")
            .remove(&code))
    }
}

/// a store whose every operation fails, for exercising the
/// abort-on-store-failure contract.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableStore;

impl GateStore for UnavailableStore {
    async fn ping(&self) -> respite_db::Result<()> {
        Err(respite_db::Error::Connection("store offline".to_string()))
    }

    async fn get_gate_state(&self) -> respite_db::Result<Option<GateRecord>> {
        Err(respite_db::Error::Connection("store offline".to_string()))
    }

    async fn upsert_gate_state(&self, _record: &GateRecord) -> respite_db::Result<GateRecord> {
        Err(respite_db::Error::Connection("store offline".to_string()))
    }
}
