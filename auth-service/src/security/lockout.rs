//! Account lockout policy.
//!
//! Pure decision logic over a user's `(login_attempts, account_locked,
//! updated_at)` state. Every call site that needs a lockout decision goes
//! through this one component; persistence of the resulting transition is
//! the orchestrator's job.

use chrono::{DateTime, Duration, Utc};

use crate::models::User;

/// Lockout thresholds, fixed at startup from configuration.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_attempts: i32,
    lockout_duration: Duration,
}

impl LockoutPolicy {
    pub fn new(max_attempts: i32, lockout_duration_ms: u64) -> Self {
        Self {
            max_attempts,
            lockout_duration: Duration::milliseconds(lockout_duration_ms as i64),
        }
    }

    /// Whether this many failed attempts crosses the lock threshold.
    pub fn locks_after(&self, attempts: i32) -> bool {
        attempts >= self.max_attempts
    }

    /// Lazy unlock check: a locked account becomes unlockable once the
    /// window measured from the last record mutation has elapsed. Only
    /// evaluated when the user next tries to log in; there is no sweep.
    pub fn should_unlock(&self, user: &User, now: DateTime<Utc>) -> bool {
        user.account_locked && now > user.updated_at + self.lockout_duration
    }

    /// Whether the user may authenticate right now. Disabled accounts never
    /// can; locked accounts only once the lockout window has elapsed.
    pub fn can_login(&self, user: &User, now: DateTime<Utc>) -> bool {
        if !user.enabled {
            return false;
        }
        if user.account_locked {
            return self.should_unlock(user, now);
        }
        true
    }
}
