//! the access gate state machine.
//!
//! the gate owns two states - `BLOCKED` (no active grant) and `GRANTED`
//! (blocking disabled until an expiry) - and the transitions between
//! them. the source of truth for "is a grant running" is the persisted
//! expiry timestamp, never an in-memory flag: the process can be killed
//! and relaunched at any point, including exactly at expiry, and
//! [`AccessGate::initialize`] reconciles the stored state with the clock.
//!
//! every operation serialises on one internal mutex, so cancelling and
//! replacing the scheduled expiry task is atomic with respect to other
//! operations. only one expiry task is ever live; starting a grant
//! replaces it, never stacks another.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use respite_db::{GateRecord, GateStore};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::gateway::RuleGatewayBoxed;
use crate::ledger::RedemptionLedgerBoxed;
use crate::quota;

/// gate policy knobs, usually derived from config.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    /// free grants permitted per quota window.
    pub max_free_grants: u32,
    /// enforced wait after a privileged grant before another code
    /// redemption is accepted.
    pub cooldown_window: Duration,
    /// length of the free-grant quota window.
    pub quota_window: Duration,
}

impl GatePolicy {
    /// build a policy from the gate section of the config file.
    pub fn from_config(config: &respite_types::GateConfig) -> Self {
        Self {
            max_free_grants: config.max_free_grants,
            cooldown_window: Duration::seconds(config.cooldown_window_secs as i64),
            quota_window: Duration::seconds(config.quota_window_secs as i64),
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::from_config(&respite_types::GateConfig::default())
    }
}

/// the two observable gate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// no active grant; blocking is enabled.
    Blocked,
    /// a grant is active; blocking is disabled until the expiry.
    Granted,
}

/// a point-in-time snapshot of the gate, as returned by status queries.
///
/// readers only ever see this snapshot; the gate is the sole writer of
/// the underlying state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateStatus {
    /// blocked or granted, derived from the expiry against the clock.
    pub state: GateState,
    /// whole seconds left on the active grant; `None` when blocked.
    pub remaining_seconds: Option<i64>,
    /// original length of the active grant, for progress display.
    pub grant_duration_secs: Option<i64>,
    /// free grants left in the current quota window.
    pub quota_remaining: u32,
    /// whole seconds left on the privileged-grant cooldown; `None` when
    /// no cooldown is running.
    pub cooldown_remaining_seconds: Option<i64>,
}

/// result of a start-grant operation.
///
/// these are expected outcomes, not errors - infrastructure failures are
/// [`Error`](crate::Error) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// the grant is active until `expiry`.
    Granted {
        /// when the grant ends.
        expiry: DateTime<Utc>,
    },
    /// the daily free-grant quota is exhausted.
    QuotaExceeded,
    /// a privileged grant was requested during the cooldown window.
    InCooldown {
        /// when the cooldown ends.
        until: DateTime<Utc>,
    },
    /// the ledger rejected the code (invalid or already used).
    InvalidCode,
}

/// in-memory runtime state guarded by the gate's mutex.
struct Runtime {
    /// the single scheduled expiry task, if any. always replaced, never
    /// stacked.
    expiry_task: Option<JoinHandle<()>>,
    /// last blocking value successfully applied to the rule gateway.
    /// `None` means unknown (fresh process or failed call) and forces
    /// the next apply through.
    applied_blocking: Option<bool>,
}

struct Inner<S> {
    store: S,
    gateway: Box<dyn RuleGatewayBoxed>,
    ledger: Box<dyn RedemptionLedgerBoxed>,
    clock: Arc<dyn Clock>,
    policy: GatePolicy,
    runtime: Mutex<Runtime>,
}

/// the access gate.
///
/// cheap to clone; all clones share the same state and serialise on the
/// same mutex. exactly one instance should be active per store.
pub struct AccessGate<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for AccessGate<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GateStore + 'static> AccessGate<S> {
    /// create a new gate over the given collaborators.
    ///
    /// [`initialize`](Self::initialize) must be called before any other
    /// operation.
    pub fn new(
        store: S,
        gateway: Box<dyn RuleGatewayBoxed>,
        ledger: Box<dyn RedemptionLedgerBoxed>,
        clock: Arc<dyn Clock>,
        policy: GatePolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                gateway,
                ledger,
                clock,
                policy,
                runtime: Mutex::new(Runtime {
                    expiry_task: None,
                    applied_blocking: None,
                }),
            }),
        }
    }

    /// reconcile persisted state with the clock at process start.
    ///
    /// must be the first operation run. idempotent: calling it again
    /// with no intervening events yields the same observable state and
    /// no redundant gateway call.
    pub async fn initialize(&self) -> Result<GateStatus> {
        let mut rt = self.inner.runtime.lock().await;
        let mut record = self.load_or_init().await?;
        let now = self.inner.clock.now();

        match record.expiry_time {
            Some(expiry) if expiry > now => {
                info!(%expiry, "restoring active grant from store");
                self.schedule_expiry_locked(&mut rt, expiry);
                self.apply_blocking_locked(&mut rt, false).await?;
            }
            Some(stale) => {
                info!(%stale, "clearing grant that expired while down");
                self.expire_now_locked(&mut rt, &mut record, true).await?;
            }
            None => {
                self.apply_blocking_locked(&mut rt, true).await?;
            }
        }

        self.normalize_quota(&mut record, now).await?;
        Ok(self.snapshot(&record, now))
    }

    /// start a free grant out of the daily quota.
    ///
    /// starting while a grant is already active is a renewal: the prior
    /// countdown is discarded and a fresh expiry takes its place.
    pub async fn start_free(&self, duration: Duration) -> Result<StartOutcome> {
        let mut rt = self.inner.runtime.lock().await;
        let mut record = self.load_or_init().await?;
        let now = self.inner.clock.now();

        // the lazy quota reset happens before the guard is evaluated, so
        // a request arriving at the boundary sees the fresh window
        self.normalize_quota(&mut record, now).await?;

        if record.free_grants_used >= self.inner.policy.max_free_grants {
            debug!(
                used = record.free_grants_used,
                max = self.inner.policy.max_free_grants,
                "free grant refused: quota exhausted"
            );
            return Ok(StartOutcome::QuotaExceeded);
        }

        let expiry = now + duration;
        record.expiry_time = Some(expiry);
        record.grant_duration_secs = Some(duration.num_seconds());
        record.free_grants_used += 1;
        let record = self.inner.store.upsert_gate_state(&record).await?;

        self.schedule_expiry_locked(&mut rt, expiry);
        info!(
            %expiry,
            used = record.free_grants_used,
            "free grant started"
        );
        self.apply_blocking_locked(&mut rt, false).await?;

        Ok(StartOutcome::Granted { expiry })
    }

    /// start a grant by redeeming a code against the ledger.
    ///
    /// the cooldown guard is checked first so a code is never spent on a
    /// request that would be refused anyway. when the ledger reports a
    /// purchased duration it overrides `duration`.
    pub async fn start_paid(&self, duration: Duration, code: String) -> Result<StartOutcome> {
        let mut rt = self.inner.runtime.lock().await;
        let mut record = self.load_or_init().await?;
        let now = self.inner.clock.now();

        if let Some(until) = record.cooldown_until {
            if now < until {
                debug!(%until, "code redemption refused: in cooldown");
                return Ok(StartOutcome::InCooldown { until });
            }
        }

        let redemption = match self.inner.ledger.redeem(code).await {
            Ok(Some(redemption)) => redemption,
            Ok(None) => {
                debug!("code redemption refused by ledger");
                return Ok(StartOutcome::InvalidCode);
            }
            Err(e) => return Err(Error::Ledger(e)),
        };

        let granted = redemption
            .duration_secs
            .map(|secs| Duration::seconds(secs as i64))
            .unwrap_or(duration);
        let expiry = now + granted;
        record.expiry_time = Some(expiry);
        record.grant_duration_secs = Some(granted.num_seconds());
        if redemption.kind.requires_cooldown() {
            record.cooldown_until = Some(now + self.inner.policy.cooldown_window);
        }
        let record = self.inner.store.upsert_gate_state(&record).await?;

        self.schedule_expiry_locked(&mut rt, expiry);
        info!(
            %expiry,
            kind = ?redemption.kind,
            cooldown_until = ?record.cooldown_until,
            "code grant started"
        );
        self.apply_blocking_locked(&mut rt, false).await?;

        Ok(StartOutcome::Granted { expiry })
    }

    /// end the current grant immediately.
    ///
    /// unconditional and idempotent: calling it while already blocked is
    /// a no-op that still clears any stray scheduled expiry task.
    pub async fn force_expire(&self) -> Result<()> {
        let mut rt = self.inner.runtime.lock().await;
        let mut record = self.load_or_init().await?;

        if record.expiry_time.is_some() {
            info!("grant force-expired");
            self.expire_now_locked(&mut rt, &mut record, true).await?;
        } else {
            // already blocked; just make sure no stale task lingers
            if let Some(handle) = rt.expiry_task.take() {
                handle.abort();
            }
            self.apply_blocking_locked(&mut rt, true).await?;
        }

        Ok(())
    }

    /// a point-in-time snapshot of the gate.
    ///
    /// a status read is an observation: a grant whose expiry has passed
    /// is collapsed here (blocking re-enabled) and the quota window is
    /// lazily reset, exactly as for grant requests.
    pub async fn status(&self) -> Result<GateStatus> {
        let mut rt = self.inner.runtime.lock().await;
        let mut record = self.load_or_init().await?;
        let now = self.inner.clock.now();

        if let Some(expiry) = record.expiry_time {
            if now >= expiry {
                info!(%expiry, "grant expired, observed on status read");
                self.expire_now_locked(&mut rt, &mut record, true).await?;
            }
        }

        self.normalize_quota(&mut record, now).await?;
        Ok(self.snapshot(&record, now))
    }

    /// whether an expiry task is currently scheduled.
    pub async fn has_pending_expiry(&self) -> bool {
        let rt = self.inner.runtime.lock().await;
        rt.expiry_task.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// abort the scheduled expiry task, if any.
    ///
    /// used on graceful shutdown; the persisted expiry remains and the
    /// next `initialize` picks it up.
    pub async fn shutdown(&self) {
        let mut rt = self.inner.runtime.lock().await;
        if let Some(handle) = rt.expiry_task.take() {
            handle.abort();
        }
    }

    /// load the singleton record, creating it with defaults on first use.
    async fn load_or_init(&self) -> Result<GateRecord> {
        if let Some(record) = self.inner.store.get_gate_state().await? {
            return Ok(record);
        }
        debug!("seeding default gate state");
        let record = self.inner.store.upsert_gate_state(&GateRecord::default()).await?;
        Ok(record)
    }

    /// collapse the current grant: clear the persisted expiry, re-enable
    /// blocking and drop the task handle.
    ///
    /// `abort_task` must be false when called from inside the expiry
    /// task itself - aborting the running task would cancel the
    /// transition at its next await point.
    async fn expire_now_locked(
        &self,
        rt: &mut Runtime,
        record: &mut GateRecord,
        abort_task: bool,
    ) -> Result<()> {
        record.expiry_time = None;
        record.grant_duration_secs = None;
        *record = self.inner.store.upsert_gate_state(record).await?;

        match rt.expiry_task.take() {
            Some(handle) if abort_task => handle.abort(),
            _ => {}
        }

        self.apply_blocking_locked(rt, true).await
    }

    /// reset the free-grant counter when its window has lapsed.
    ///
    /// persisted before any guard is evaluated. a `quota_reset_at` still
    /// in the future is left untouched so bursts of requests cannot push
    /// the reset forward.
    async fn normalize_quota(&self, record: &mut GateRecord, now: DateTime<Utc>) -> Result<()> {
        if quota::quota_reset_due(record.quota_reset_at, now) {
            record.free_grants_used = 0;
            record.quota_reset_at = Some(now + self.inner.policy.quota_window);
            *record = self.inner.store.upsert_gate_state(record).await?;
            debug!(reset_at = ?record.quota_reset_at, "free-grant quota window reset");
        }
        Ok(())
    }

    /// tell the rule gateway which way to flip, skipping the call when
    /// the desired value is already applied.
    ///
    /// on failure the applied value is marked unknown so the next
    /// transition (or the next restart) retries unconditionally; the
    /// caller's committed state stands either way.
    async fn apply_blocking_locked(&self, rt: &mut Runtime, enabled: bool) -> Result<()> {
        if rt.applied_blocking == Some(enabled) {
            return Ok(());
        }
        match self.inner.gateway.set_blocking(enabled).await {
            Ok(()) => {
                rt.applied_blocking = Some(enabled);
                debug!(enabled, "rule gateway updated");
                Ok(())
            }
            Err(e) => {
                rt.applied_blocking = None;
                warn!(enabled, error = %e, "rule gateway call failed");
                Err(Error::Gateway(e))
            }
        }
    }

    /// cancel the prior scheduled expiry task and schedule a new one.
    fn schedule_expiry_locked(&self, rt: &mut Runtime, expiry: DateTime<Utc>) {
        if let Some(handle) = rt.expiry_task.take() {
            handle.abort();
        }

        let now = self.inner.clock.now();
        let delay = (expiry - now).to_std().unwrap_or(std::time::Duration::ZERO);
        let gate = self.clone();

        rt.expiry_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = gate.expire_if_due().await {
                warn!(error = %e, "scheduled expiry failed");
            }
        }));
    }

    /// body of the scheduled expiry task.
    ///
    /// self-checks the persisted expiry against the clock: a stale task
    /// that survived a renewal finds the expiry moved and does nothing.
    async fn expire_if_due(&self) -> Result<()> {
        let mut rt = self.inner.runtime.lock().await;
        let Some(mut record) = self.inner.store.get_gate_state().await? else {
            return Ok(());
        };
        let now = self.inner.clock.now();

        match record.expiry_time {
            Some(expiry) if now >= expiry => {
                info!(%expiry, "grant expired");
                self.expire_now_locked(&mut rt, &mut record, false).await
            }
            _ => Ok(()),
        }
    }

    /// derive the observable snapshot from a record. `active` comes from
    /// the expiry against the clock, never from a stored flag.
    fn snapshot(&self, record: &GateRecord, now: DateTime<Utc>) -> GateStatus {
        let active = record.expiry_time.is_some_and(|expiry| expiry > now);
        GateStatus {
            state: if active {
                GateState::Granted
            } else {
                GateState::Blocked
            },
            remaining_seconds: record
                .expiry_time
                .filter(|_| active)
                .map(|expiry| quota::seconds_until(expiry, now)),
            grant_duration_secs: if active { record.grant_duration_secs } else { None },
            quota_remaining: quota::quota_remaining(
                record.free_grants_used,
                self.inner.policy.max_free_grants,
            ),
            cooldown_remaining_seconds: record
                .cooldown_until
                .filter(|until| *until > now)
                .map(|until| quota::seconds_until(until, now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use crate::test_utils::{FakeLedger, RecordingGateway, UnavailableStore};
    use respite_db::RespiteDb;
    use respite_types::{GrantKind, Redemption};

    fn test_policy() -> GatePolicy {
        GatePolicy {
            max_free_grants: 3,
            cooldown_window: Duration::hours(6),
            quota_window: Duration::hours(24),
        }
    }

    /// a manual clock frozen on a whole second, so timestamps written
    /// through the store compare exactly after the roundtrip.
    fn frozen_clock() -> Arc<ManualClock> {
        use chrono::SubsecRound;
        Arc::new(ManualClock::new(Utc::now().trunc_subsecs(0)))
    }

    async fn setup_gate(
        clock: Arc<dyn Clock>,
    ) -> (AccessGate<RespiteDb>, RespiteDb, RecordingGateway, FakeLedger) {
        let db = RespiteDb::new_in_memory().await.unwrap();
        let gateway = RecordingGateway::new();
        let ledger = FakeLedger::new();
        let gate = AccessGate::new(
            db.clone(),
            Box::new(gateway.clone()),
            Box::new(ledger.clone()),
            clock,
            test_policy(),
        );
        (gate, db, gateway, ledger)
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (gate, _db, gateway, _ledger) = setup_gate(Arc::new(SystemClock)).await;

        let first = gate.initialize().await.unwrap();
        let second = gate.initialize().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.state, GateState::Blocked);
        // one actual transition, one gateway call
        assert_eq!(gateway.calls(), vec![true]);
    }

    #[tokio::test]
    async fn test_initialize_restores_active_grant() {
        let clock = frozen_clock();
        let (gate, db, gateway, _ledger) = setup_gate(clock.clone()).await;

        // a previous process persisted a grant with 30s left
        let record = GateRecord {
            expiry_time: Some(clock.now() + Duration::seconds(30)),
            grant_duration_secs: Some(60),
            ..Default::default()
        };
        db.upsert_gate_state(&record).await.unwrap();

        let status = gate.initialize().await.unwrap();
        assert_eq!(status.state, GateState::Granted);
        assert_eq!(status.remaining_seconds, Some(30));
        assert_eq!(status.grant_duration_secs, Some(60));
        assert_eq!(gateway.calls(), vec![false]);
        assert!(gate.has_pending_expiry().await);
    }

    #[tokio::test]
    async fn test_initialize_clears_stale_expiry() {
        let clock = frozen_clock();
        let (gate, db, gateway, _ledger) = setup_gate(clock.clone()).await;

        // the grant expired while the process was down
        let record = GateRecord {
            expiry_time: Some(clock.now() - Duration::seconds(1)),
            grant_duration_secs: Some(60),
            ..Default::default()
        };
        db.upsert_gate_state(&record).await.unwrap();

        let status = gate.initialize().await.unwrap();
        assert_eq!(status.state, GateState::Blocked);
        assert_eq!(gateway.calls(), vec![true]);

        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert!(stored.expiry_time.is_none());
        assert!(stored.grant_duration_secs.is_none());
    }

    #[tokio::test]
    async fn test_start_free_grants_and_counts() {
        let clock = frozen_clock();
        let (gate, db, gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        let outcome = gate.start_free(Duration::seconds(600)).await.unwrap();
        let expected_expiry = clock.now() + Duration::seconds(600);
        assert_eq!(
            outcome,
            StartOutcome::Granted {
                expiry: expected_expiry
            }
        );

        let status = gate.status().await.unwrap();
        assert_eq!(status.state, GateState::Granted);
        assert_eq!(status.quota_remaining, 2);
        assert_eq!(status.remaining_seconds, Some(600));

        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert_eq!(stored.free_grants_used, 1);
        assert_eq!(stored.expiry_time, Some(expected_expiry));
        assert_eq!(gateway.calls(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_renewal_replaces_expiry() {
        let clock = frozen_clock();
        let (gate, db, gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        gate.start_free(Duration::seconds(60)).await.unwrap();
        gate.start_free(Duration::seconds(300)).await.unwrap();

        // the second grant replaced the first: one timer, at +300s
        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert_eq!(
            stored.expiry_time,
            Some(clock.now() + Duration::seconds(300))
        );
        assert_eq!(stored.free_grants_used, 2);
        assert!(gate.has_pending_expiry().await);

        // renewal is not a blocked->granted transition, so no second
        // gateway call
        assert_eq!(gateway.calls(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_quota_boundary() {
        let clock = frozen_clock();
        let (gate, db, _gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        for _ in 0..3 {
            let outcome = gate.start_free(Duration::seconds(60)).await.unwrap();
            assert!(matches!(outcome, StartOutcome::Granted { .. }));
        }

        let before = db.get_gate_state().await.unwrap().unwrap();
        let outcome = gate.start_free(Duration::seconds(60)).await.unwrap();
        assert_eq!(outcome, StartOutcome::QuotaExceeded);

        // the refused request mutated nothing
        let after = db.get_gate_state().await.unwrap().unwrap();
        assert_eq!(after.expiry_time, before.expiry_time);
        assert_eq!(after.free_grants_used, 3);
    }

    #[tokio::test]
    async fn test_quota_lazy_reset() {
        let clock = frozen_clock();
        let (gate, db, _gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        for _ in 0..3 {
            gate.start_free(Duration::seconds(60)).await.unwrap();
        }
        assert_eq!(
            gate.start_free(Duration::seconds(60)).await.unwrap(),
            StartOutcome::QuotaExceeded
        );

        // cross the reset boundary; the next request sees a fresh window
        clock.advance(Duration::hours(24) + Duration::seconds(1));
        let outcome = gate.start_free(Duration::seconds(60)).await.unwrap();
        assert!(matches!(outcome, StartOutcome::Granted { .. }));

        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert_eq!(stored.free_grants_used, 1);
    }

    #[tokio::test]
    async fn test_quota_reset_not_pushed_forward() {
        let clock = frozen_clock();
        let (gate, db, _gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        let seeded = db.get_gate_state().await.unwrap().unwrap();
        let reset_at = seeded.quota_reset_at.unwrap();

        // a flurry of observations inside the window must not move it
        clock.advance(Duration::hours(1));
        gate.status().await.unwrap();
        gate.start_free(Duration::seconds(60)).await.unwrap();

        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert_eq!(stored.quota_reset_at, Some(reset_at));
    }

    #[tokio::test]
    async fn test_privileged_code_sets_cooldown() {
        let clock = frozen_clock();
        let (gate, db, _gateway, ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        ledger.insert_code(
            "VIP-1",
            Redemption {
                kind: GrantKind::Privileged,
                duration_secs: None,
            },
        );
        ledger.insert_code(
            "VIP-2",
            Redemption {
                kind: GrantKind::Privileged,
                duration_secs: None,
            },
        );

        let outcome = gate
            .start_paid(Duration::seconds(1800), "VIP-1".to_string())
            .await
            .unwrap();
        assert!(matches!(outcome, StartOutcome::Granted { .. }));

        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert_eq!(stored.cooldown_until, Some(clock.now() + Duration::hours(6)));

        // a second redemption inside the window is refused before the
        // ledger is consulted - the code is not spent
        let redeems_before = ledger.redeem_calls();
        let outcome = gate
            .start_paid(Duration::seconds(1800), "VIP-2".to_string())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            StartOutcome::InCooldown {
                until: clock.now() + Duration::hours(6)
            }
        );
        assert_eq!(ledger.redeem_calls(), redeems_before);

        // the cooldown outlives the grant itself
        clock.advance(Duration::seconds(1801));
        let status = gate.status().await.unwrap();
        assert_eq!(status.state, GateState::Blocked);
        assert!(status.cooldown_remaining_seconds.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_standard_code_sets_no_cooldown() {
        let clock = frozen_clock();
        let (gate, db, _gateway, ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        ledger.insert_code(
            "PLAIN-1",
            Redemption {
                kind: GrantKind::Standard,
                duration_secs: None,
            },
        );

        gate.start_paid(Duration::seconds(600), "PLAIN-1".to_string())
            .await
            .unwrap();

        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert!(stored.cooldown_until.is_none());
    }

    #[tokio::test]
    async fn test_invalid_code_mutates_nothing() {
        let clock = frozen_clock();
        let (gate, db, _gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        let outcome = gate
            .start_paid(Duration::seconds(600), "NOPE".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, StartOutcome::InvalidCode);

        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert!(stored.expiry_time.is_none());
        assert!(stored.cooldown_until.is_none());
    }

    #[tokio::test]
    async fn test_ledger_duration_overrides_request() {
        let clock = frozen_clock();
        let (gate, _db, _gateway, ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        ledger.insert_code(
            "HOUR-1",
            Redemption {
                kind: GrantKind::Standard,
                duration_secs: Some(3600),
            },
        );

        let outcome = gate
            .start_paid(Duration::seconds(60), "HOUR-1".to_string())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Granted {
                expiry: clock.now() + Duration::seconds(3600)
            }
        );
    }

    #[tokio::test]
    async fn test_expiry_fires_and_reblocks() {
        let (gate, db, gateway, _ledger) = setup_gate(Arc::new(SystemClock)).await;
        gate.initialize().await.unwrap();

        gate.start_free(Duration::seconds(1)).await.unwrap();
        assert!(gate.has_pending_expiry().await);

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

        assert_eq!(gateway.calls(), vec![true, false, true]);
        assert!(!gate.has_pending_expiry().await);
        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert!(stored.expiry_time.is_none());
    }

    #[tokio::test]
    async fn test_rapid_renewals_fire_once() {
        let (gate, _db, gateway, _ledger) = setup_gate(Arc::new(SystemClock)).await;
        gate.initialize().await.unwrap();

        gate.start_free(Duration::seconds(1)).await.unwrap();
        gate.start_free(Duration::seconds(1)).await.unwrap();
        gate.start_free(Duration::seconds(1)).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2000)).await;

        // three rapid renewals, one blocked transition: no stale task
        // double-applied the re-block
        assert_eq!(gateway.calls(), vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_renewal_outlives_first_timer() {
        let (gate, _db, _gateway, _ledger) = setup_gate(Arc::new(SystemClock)).await;
        gate.initialize().await.unwrap();

        gate.start_free(Duration::seconds(1)).await.unwrap();
        gate.start_free(Duration::seconds(3)).await.unwrap();

        // past the first grant's expiry, the renewed grant still runs
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        let status = gate.status().await.unwrap();
        assert_eq!(status.state, GateState::Granted);
    }

    #[tokio::test]
    async fn test_force_expire_is_idempotent() {
        let clock = frozen_clock();
        let (gate, db, gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        gate.start_free(Duration::seconds(600)).await.unwrap();
        gate.force_expire().await.unwrap();

        let status = gate.status().await.unwrap();
        assert_eq!(status.state, GateState::Blocked);
        assert!(!gate.has_pending_expiry().await);
        assert!(db.get_gate_state().await.unwrap().unwrap().expiry_time.is_none());

        // calling again while blocked is a no-op
        gate.force_expire().await.unwrap();
        assert_eq!(gateway.calls(), vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_store_failure_aborts_transition() {
        let gateway = RecordingGateway::new();
        let gate = AccessGate::new(
            UnavailableStore,
            Box::new(gateway.clone()),
            Box::new(FakeLedger::new()),
            Arc::new(SystemClock),
            test_policy(),
        );

        assert!(matches!(gate.initialize().await, Err(Error::Store(_))));
        assert!(matches!(
            gate.start_free(Duration::seconds(60)).await,
            Err(Error::Store(_))
        ));

        // no transition committed, so the gateway was never touched
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_surfaces_but_grant_stands() {
        let clock = frozen_clock();
        let (gate, db, gateway, _ledger) = setup_gate(clock.clone()).await;
        gate.initialize().await.unwrap();

        gateway.set_fail(true);
        let result = gate.start_free(Duration::seconds(600)).await;
        assert!(matches!(result, Err(Error::Gateway(_))));

        // the committed grant stands even though the gateway disagreed
        let stored = db.get_gate_state().await.unwrap().unwrap();
        assert!(stored.expiry_time.is_some());

        // once the gateway recovers, the next transition reapplies
        gateway.set_fail(false);
        gate.force_expire().await.unwrap();
        assert_eq!(gateway.calls(), vec![true, true]);
    }
}
