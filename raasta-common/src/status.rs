//! Moderation status machine
//!
//! ```text
//! pending ──► verified ──► resolved
//!    │
//!    └──────► rejected
//! ```
//!
//! `rejected` and `resolved` are terminal. Authorization of the moderator is handled
//! outside this crate; only the ordering is enforced here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::report::{Report, UserId};
use crate::{time, Error, Result};

/// Moderation status of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Newly submitted, awaiting moderation
    #[default]
    Pending,
    /// Confirmed by a moderator
    Verified,
    /// Verified condition has cleared
    Resolved,
    /// Dismissed by a moderator
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Rejected => "rejected",
        }
    }

    /// No transition leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Rejected)
    }

    /// Whether `self → next` is a legal move
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Verified)
                | (ReportStatus::Pending, ReportStatus::Rejected)
                | (ReportStatus::Verified, ReportStatus::Resolved)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "verified" => Ok(ReportStatus::Verified),
            "resolved" => Ok(ReportStatus::Resolved),
            "rejected" => Ok(ReportStatus::Rejected),
            other => Err(Error::validation(
                "status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl Report {
    /// Move the report to `next`, recording the moderator on verification
    ///
    /// `verified_by`/`verified_at` are written only on the transition into `verified`
    /// and never touched afterwards. Resolving records `actual_resolution_time` and any
    /// notes supplied.
    pub fn transition(
        &mut self,
        next: ReportStatus,
        moderator: UserId,
        notes: Option<String>,
    ) -> Result<ReportStatus> {
        self.ensure_active()?;

        let current = self.status;
        if !current.can_transition_to(next) {
            return Err(Error::StateConflict(format!(
                "cannot move report {} from {} to {}",
                self.id(),
                current,
                next
            )));
        }

        let now = time::now();
        match next {
            ReportStatus::Verified => {
                self.verified_by = Some(moderator);
                self.verified_at = Some(now);
            }
            ReportStatus::Resolved => {
                self.actual_resolution_time = Some(now);
                if notes.is_some() {
                    self.resolution_notes = notes;
                }
            }
            ReportStatus::Rejected => {
                if notes.is_some() {
                    self.resolution_notes = notes;
                }
            }
            ReportStatus::Pending => {}
        }
        self.status = next;

        tracing::info!(
            report_id = %self.id(),
            from = %current,
            to = %next,
            moderator = %moderator,
            "Report status changed"
        );

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;
    use uuid::Uuid;

    #[test]
    fn test_transition_table() {
        use ReportStatus::*;
        let all = [Pending, Verified, Resolved, Rejected];
        let allowed = [(Pending, Verified), (Pending, Rejected), (Verified, Resolved)];

        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_pending_to_resolved_is_rejected() {
        let mut report = sample_report();
        let err = report
            .transition(ReportStatus::Resolved, Uuid::new_v4(), None)
            .unwrap_err();
        assert!(matches!(err, Error::StateConflict(_)));
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(report.actual_resolution_time.is_none());
    }

    #[test]
    fn test_verify_then_resolve_sets_verification_once() {
        let mut report = sample_report();
        let moderator = Uuid::new_v4();

        report
            .transition(ReportStatus::Verified, moderator, None)
            .unwrap();
        assert_eq!(report.status, ReportStatus::Verified);
        assert_eq!(report.verified_by, Some(moderator));
        let verified_at = report.verified_at.expect("verified_at set");

        let other_moderator = Uuid::new_v4();
        report
            .transition(
                ReportStatus::Resolved,
                other_moderator,
                Some("Road cleared".into()),
            )
            .unwrap();
        assert_eq!(report.status, ReportStatus::Resolved);
        assert_eq!(report.verified_by, Some(moderator));
        assert_eq!(report.verified_at, Some(verified_at));
        assert_eq!(report.resolution_notes.as_deref(), Some("Road cleared"));
        assert!(report.actual_resolution_time.is_some());
    }

    #[test]
    fn test_terminal_states_refuse_all_transitions() {
        let mut rejected = sample_report();
        rejected
            .transition(ReportStatus::Rejected, Uuid::new_v4(), None)
            .unwrap();
        for next in [ReportStatus::Pending, ReportStatus::Verified, ReportStatus::Resolved] {
            assert!(rejected.transition(next, Uuid::new_v4(), None).is_err());
        }
        assert!(rejected.verified_by.is_none());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("verified".parse::<ReportStatus>().unwrap(), ReportStatus::Verified);
        assert!("archived".parse::<ReportStatus>().is_err());
    }
}
