//! grant kinds and redemption results
//!
//! a grant is a time-boxed period during which blocking is disabled.
//! free grants come out of the daily quota; code-redeemed grants are
//! classified by the ledger into one of the [`GrantKind`]s below.

use serde::{Deserialize, Serialize};

/// the class of a code-redeemed grant, as reported by the redemption ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    /// a plain purchased grant. no cooldown applies.
    Standard,

    /// a privileged grant. successful redemption starts the cooldown
    /// window, during which further code redemptions are rejected.
    Privileged,
}

impl GrantKind {
    /// whether a successful grant of this kind starts the cooldown window.
    pub fn requires_cooldown(&self) -> bool {
        matches!(self, GrantKind::Privileged)
    }
}

/// a successful code redemption returned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    /// the kind of grant this code unlocks.
    pub kind: GrantKind,

    /// grant length encoded in the code, in seconds.
    ///
    /// when present this overrides the duration the caller asked for -
    /// the code says what was purchased. when absent the requested
    /// duration is used.
    pub duration_secs: Option<u64>,
}
