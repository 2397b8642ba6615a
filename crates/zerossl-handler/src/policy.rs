//! Enrollment bounds.

use std::time::Duration;

/// Default number of challenge verification attempts.
pub const DEFAULT_VERIFY_TRIALS: u32 = 6;

/// Default delay between certificate status polls.
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(200);

/// Default time to wait for a certificate to be issued.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(180);

/// Default certificate validity requested from the CA.
pub const DEFAULT_VALIDITY_DAYS: u32 = 90;

/// Retry and timing bounds of one enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentPolicy {
    /// Verification attempts before giving up.
    pub verify_trials: u32,
    /// Delay between status polls.
    pub poll_delay: Duration,
    /// Upper bound on polling.
    pub poll_timeout: Duration,
    /// Requested validity in days.
    pub validity_days: u32,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            verify_trials: DEFAULT_VERIFY_TRIALS,
            poll_delay: DEFAULT_POLL_DELAY,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}
