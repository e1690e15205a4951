//! quota and cooldown arithmetic.
//!
//! pure functions over timestamps, kept separate from the state machine
//! so the boundary cases can be tested without a store or a runtime.

use chrono::{DateTime, Utc};

/// whether the free-grant counter is due for its lazy reset.
///
/// an absent `quota_reset_at` counts as already expired, so the very
/// first observation seeds a fresh window.
pub fn quota_reset_due(quota_reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match quota_reset_at {
        None => true,
        Some(reset_at) => now >= reset_at,
    }
}

/// free grants left in the current window.
pub fn quota_remaining(used: u32, max_free_grants: u32) -> u32 {
    max_free_grants.saturating_sub(used)
}

/// whether a privileged-grant request must be rejected right now.
pub fn cooldown_active(cooldown_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match cooldown_until {
        None => false,
        Some(until) => now < until,
    }
}

/// whole seconds until `deadline`, clamped to zero.
pub fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_reset_due_when_absent() {
        assert!(quota_reset_due(None, Utc::now()));
    }

    #[test]
    fn test_reset_due_exactly_at_boundary() {
        let now = Utc::now();
        // a request arriving exactly at the reset time sees a fresh quota
        assert!(quota_reset_due(Some(now), now));
        assert!(quota_reset_due(Some(now - Duration::seconds(1)), now));
        assert!(!quota_reset_due(Some(now + Duration::seconds(1)), now));
    }

    #[test]
    fn test_quota_remaining_saturates() {
        assert_eq!(quota_remaining(0, 3), 3);
        assert_eq!(quota_remaining(3, 3), 0);
        // counter beyond max (e.g. max lowered in config) must not wrap
        assert_eq!(quota_remaining(5, 3), 0);
    }

    #[test]
    fn test_cooldown_boundaries() {
        let now = Utc::now();
        assert!(!cooldown_active(None, now));
        assert!(cooldown_active(Some(now + Duration::seconds(1)), now));
        // cooldown ends exactly at the deadline
        assert!(!cooldown_active(Some(now), now));
        assert!(!cooldown_active(Some(now - Duration::seconds(1)), now));
    }

    #[test]
    fn test_seconds_until_clamps() {
        let now = Utc::now();
        assert_eq!(seconds_until(now + Duration::seconds(30), now), 30);
        assert_eq!(seconds_until(now - Duration::seconds(30), now), 0);
    }
}
