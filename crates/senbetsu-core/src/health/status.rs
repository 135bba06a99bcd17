use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ReleaseMarker, SourceId};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Quarantine length for each escalation level.
pub const ESCALATION_BACKOFF: [Duration; 9] = [
    Duration::ZERO,
    Duration::from_secs(5 * MINUTE),
    Duration::from_secs(15 * MINUTE),
    Duration::from_secs(30 * MINUTE),
    Duration::from_secs(HOUR),
    Duration::from_secs(3 * HOUR),
    Duration::from_secs(6 * HOUR),
    Duration::from_secs(12 * HOUR),
    Duration::from_secs(24 * HOUR),
];

pub const MAX_ESCALATION_LEVEL: u32 = (ESCALATION_BACKOFF.len() - 1) as u32;

/// Back-off implied by `level`, clamped to the table.
pub fn backoff_for_level(level: u32) -> Duration {
    ESCALATION_BACKOFF[level.min(MAX_ESCALATION_LEVEL) as usize]
}

/// Health record for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source_id: SourceId,
    /// Always within `0..=MAX_ESCALATION_LEVEL`.
    pub escalation_level: u32,
    pub initial_failure: Option<DateTime<Utc>>,
    pub most_recent_failure: Option<DateTime<Utc>>,
    pub disabled_until: Option<DateTime<Utc>>,
    pub last_continuous_sync: Option<DateTime<Utc>>,
    pub last_sync_marker: Option<ReleaseMarker>,
}

impl SourceStatus {
    pub fn new(source_id: SourceId) -> Self {
        Self {
            source_id,
            escalation_level: 0,
            initial_failure: None,
            most_recent_failure: None,
            disabled_until: None,
            last_continuous_sync: None,
            last_sync_marker: None,
        }
    }

    pub fn is_disabled_at(&self, now: DateTime<Utc>) -> bool {
        self.disabled_until.is_some_and(|until| until > now)
    }

    pub fn backoff(&self) -> Duration {
        backoff_for_level(self.escalation_level)
    }

    /// Apply a failure observed at `now`.
    pub(crate) fn escalate(&mut self, now: DateTime<Utc>, minimum_backoff: Option<Duration>) {
        if self.escalation_level == 0 {
            self.initial_failure = Some(now);
        }
        self.most_recent_failure = Some(now);
        self.escalation_level = (self.escalation_level + 1).min(MAX_ESCALATION_LEVEL);

        if let Some(minimum) = minimum_backoff {
            while self.escalation_level < MAX_ESCALATION_LEVEL && self.backoff() < minimum {
                self.escalation_level += 1;
            }
        }

        let backoff = TimeDelta::seconds(self.backoff().as_secs() as i64);
        self.disabled_until = Some(now + backoff);
    }

    /// Apply a success. Returns `false` when there was nothing to recover.
    pub(crate) fn recover(&mut self) -> bool {
        if self.escalation_level == 0 {
            return false;
        }
        self.escalation_level -= 1;
        self.disabled_until = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_table_is_ordered() {
        assert!(ESCALATION_BACKOFF.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(MAX_ESCALATION_LEVEL, 8);
        assert_eq!(backoff_for_level(42), Duration::from_secs(24 * HOUR));
    }

    #[test]
    fn test_first_failure_stamps_initial() {
        let mut status = SourceStatus::new(1);
        status.escalate(now(), None);
        assert_eq!(status.escalation_level, 1);
        assert_eq!(status.initial_failure, Some(now()));
        assert_eq!(status.most_recent_failure, Some(now()));
        assert_eq!(status.disabled_until, Some(now() + TimeDelta::minutes(5)));
    }

    #[test]
    fn test_later_failure_keeps_initial() {
        let mut status = SourceStatus::new(1);
        status.escalate(now(), None);
        let later = now() + TimeDelta::minutes(10);
        status.escalate(later, None);
        assert_eq!(status.initial_failure, Some(now()));
        assert_eq!(status.most_recent_failure, Some(later));
        assert_eq!(status.escalation_level, 2);
    }

    #[test]
    fn test_minimum_backoff_escalates_further() {
        let mut status = SourceStatus::new(1);
        status.escalation_level = 3;
        // Next level implies 1h; a 2h minimum pushes it to 3h.
        status.escalate(now(), Some(Duration::from_secs(2 * HOUR)));
        assert_eq!(status.escalation_level, 5);
        assert!(status.backoff() >= Duration::from_secs(2 * HOUR));
        assert_eq!(status.disabled_until, Some(now() + TimeDelta::hours(3)));
    }

    #[test]
    fn test_minimum_backoff_caps_at_max_level() {
        let mut status = SourceStatus::new(1);
        status.escalate(now(), Some(Duration::from_secs(48 * HOUR)));
        assert_eq!(status.escalation_level, MAX_ESCALATION_LEVEL);
        assert_eq!(status.disabled_until, Some(now() + TimeDelta::hours(24)));
    }

    #[test]
    fn test_recover_single_step() {
        let mut status = SourceStatus::new(1);
        status.escalate(now(), None);
        status.escalate(now(), None);
        assert!(status.recover());
        assert_eq!(status.escalation_level, 1);
        assert_eq!(status.disabled_until, None);
        assert!(status.recover());
        assert!(!status.recover());
        assert_eq!(status.escalation_level, 0);
    }
}
