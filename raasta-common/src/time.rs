//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Linear backoff: `base * attempt`, saturating
pub fn linear_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_linear_backoff_grows_with_attempt() {
        let base = Duration::from_millis(1000);
        assert_eq!(linear_backoff(base, 1), Duration::from_secs(1));
        assert_eq!(linear_backoff(base, 2), Duration::from_secs(2));
        assert!(linear_backoff(base, 3) > linear_backoff(base, 2));
    }

    #[test]
    fn test_linear_backoff_saturates() {
        assert_eq!(linear_backoff(Duration::MAX, 2), Duration::MAX);
    }
}
