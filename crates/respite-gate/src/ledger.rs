//! redemption ledger trait.
//!
//! the ledger is the external authority on grant codes. redemption is
//! treated as atomic here: a code is either accepted (with its kind and
//! optional purchased duration) or rejected. reconciling a non-atomic
//! backing ledger is the collaborator's concern, not the gate's.

use thiserror::Error;

use respite_types::Redemption;

/// errors from ledger operations.
///
/// a rejected code is NOT an error - `redeem` returns `Ok(None)` for
/// invalid or already-used codes.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// the ledger could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// the ledger answered with something unintelligible.
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// trait for redemption ledgers.
pub trait RedemptionLedger: Send + Sync {
    /// redeem a grant code.
    ///
    /// returns `Ok(Some(_))` when the code is valid, `Ok(None)` when the
    /// ledger rejects it (invalid or already used), `Err` when the ledger
    /// itself is unavailable.
    fn redeem(
        &self,
        code: String,
    ) -> impl std::future::Future<Output = Result<Option<Redemption>, LedgerError>> + Send;
}

/// object-safe wrapper for [`RedemptionLedger`], used for dynamic dispatch.
pub trait RedemptionLedgerBoxed: Send + Sync {
    /// redeem a grant code.
    fn redeem(
        &self,
        code: String,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Option<Redemption>, LedgerError>> + Send + '_>,
    >;
}

impl<T: RedemptionLedger> RedemptionLedgerBoxed for T {
    fn redeem(
        &self,
        code: String,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Option<Redemption>, LedgerError>> + Send + '_>,
    > {
        Box::pin(RedemptionLedger::redeem(self, code))
    }
}
