//! Engagement operations on a report
//!
//! Every operation is safe to repeat: a client that retries after a timeout cannot push
//! the report into a different state than a single successful call would. Likes and
//! votes are keyed by user; comments are append-only and not deduplicated.
//!
//! All operations refuse inactive reports with a not-found error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::report::{Comment, Like, Report, UserId, View, VoteEntry};
use crate::{time, validation, Error, Result};

/// Derived counters returned from every engagement operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementCounts {
    pub like_count: usize,
    pub comment_count: usize,
    pub vote_score: i64,
    pub views: u64,
}

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(Error::validation(
                "voteType",
                format!("vote must be 'up' or 'down', got '{}'", other),
            )),
        }
    }
}

impl Report {
    /// Current derived counters
    pub fn counts(&self) -> EngagementCounts {
        EngagementCounts {
            like_count: self.like_count(),
            comment_count: self.comment_count(),
            vote_score: self.vote_score(),
            views: self.views,
        }
    }

    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.likes.iter().any(|like| like.user == user)
    }

    /// The user's current vote, if any
    pub fn vote_of(&self, user: UserId) -> Option<VoteDirection> {
        if self.votes.up.iter().any(|v| v.user == user) {
            Some(VoteDirection::Up)
        } else if self.votes.down.iter().any(|v| v.user == user) {
            Some(VoteDirection::Down)
        } else {
            None
        }
    }

    /// Like the report; liking twice is a no-op
    pub fn like(&mut self, user: UserId) -> Result<EngagementCounts> {
        self.ensure_active()?;
        if !self.is_liked_by(user) {
            self.likes.push(Like {
                user,
                liked_at: time::now(),
            });
        }
        Ok(self.counts())
    }

    /// Remove the user's like; removing an absent like is a no-op
    pub fn unlike(&mut self, user: UserId) -> Result<EngagementCounts> {
        self.ensure_active()?;
        self.likes.retain(|like| like.user != user);
        Ok(self.counts())
    }

    /// Cast or switch a vote
    ///
    /// The user is removed from both lists before being added to the requested one, so
    /// they are never in both and a repeated identical vote changes nothing but the
    /// timestamp.
    pub fn vote(&mut self, user: UserId, direction: VoteDirection) -> Result<EngagementCounts> {
        self.ensure_active()?;

        self.votes.up.retain(|v| v.user != user);
        self.votes.down.retain(|v| v.user != user);

        let entry = VoteEntry {
            user,
            voted_at: time::now(),
        };
        match direction {
            VoteDirection::Up => self.votes.up.push(entry),
            VoteDirection::Down => self.votes.down.push(entry),
        }
        Ok(self.counts())
    }

    /// Append a comment; identical text still creates a new comment
    pub fn comment(&mut self, user: UserId, text: &str) -> Result<EngagementCounts> {
        self.ensure_active()?;
        validation::validate_comment(text)?;

        self.comments.push(Comment {
            id: Uuid::new_v4(),
            user,
            text: text.trim().to_string(),
            created_at: time::now(),
        });
        Ok(self.counts())
    }

    /// Record that the user viewed the report
    ///
    /// Only the first view per user increments the counter, so `views` tracks the number
    /// of distinct viewers recorded here.
    pub fn record_view(&mut self, user: UserId) -> Result<EngagementCounts> {
        self.ensure_active()?;
        if !self.viewed_by.iter().any(|view| view.user == user) {
            self.viewed_by.push(View {
                user,
                viewed_at: time::now(),
            });
            self.views += 1;
        }
        Ok(self.counts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    fn strip_timestamps(report: &Report) -> (Vec<UserId>, Vec<UserId>, Vec<UserId>) {
        (
            report.likes().iter().map(|l| l.user).collect(),
            report.votes().up().iter().map(|v| v.user).collect(),
            report.votes().down().iter().map(|v| v.user).collect(),
        )
    }

    #[test]
    fn test_like_is_idempotent() {
        let mut report = sample_report();
        let user = Uuid::new_v4();

        let first = report.like(user).unwrap();
        let snapshot = report.clone();
        let second = report.like(user).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.like_count, 1);
        assert_eq!(report, snapshot);
    }

    #[test]
    fn test_two_users_like() {
        let mut report = sample_report();
        report.like(Uuid::new_v4()).unwrap();
        let counts = report.like(Uuid::new_v4()).unwrap();
        assert_eq!(counts.like_count, 2);
    }

    #[test]
    fn test_unlike_absent_is_noop() {
        let mut report = sample_report();
        let liker = Uuid::new_v4();
        report.like(liker).unwrap();

        let counts = report.unlike(Uuid::new_v4()).unwrap();
        assert_eq!(counts.like_count, 1);

        assert_eq!(report.unlike(liker).unwrap().like_count, 0);
        assert_eq!(report.unlike(liker).unwrap().like_count, 0);
    }

    #[test]
    fn test_repeat_vote_is_idempotent() {
        let mut report = sample_report();
        let user = Uuid::new_v4();

        report.vote(user, VoteDirection::Up).unwrap();
        let once = strip_timestamps(&report);
        let counts = report.vote(user, VoteDirection::Up).unwrap();

        assert_eq!(strip_timestamps(&report), once);
        assert_eq!(counts.vote_score, 1);
    }

    #[test]
    fn test_switching_vote_leaves_user_in_one_set() {
        let mut report = sample_report();
        let user = Uuid::new_v4();

        report.vote(user, VoteDirection::Up).unwrap();
        let counts = report.vote(user, VoteDirection::Down).unwrap();

        assert!(report.votes().up().iter().all(|v| v.user != user));
        assert_eq!(report.votes().down().len(), 1);
        assert_eq!(report.vote_of(user), Some(VoteDirection::Down));
        assert_eq!(counts.vote_score, -1);
    }

    #[test]
    fn test_vote_sets_stay_disjoint_under_mixed_sequence() {
        let mut report = sample_report();
        let users: Vec<UserId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let plan = [
            (0, VoteDirection::Up),
            (1, VoteDirection::Down),
            (0, VoteDirection::Down),
            (2, VoteDirection::Up),
            (1, VoteDirection::Up),
            (3, VoteDirection::Down),
            (0, VoteDirection::Up),
            (2, VoteDirection::Up),
        ];

        for (idx, direction) in plan {
            report.vote(users[idx], direction).unwrap();
            for user in &users {
                let in_up = report.votes().up().iter().any(|v| v.user == *user);
                let in_down = report.votes().down().iter().any(|v| v.user == *user);
                assert!(!(in_up && in_down), "user in both vote sets");
            }
        }

        // 0 up, 1 up, 2 up, 3 down
        assert_eq!(report.vote_score(), 2);
    }

    #[test]
    fn test_comments_append_without_dedup() {
        let mut report = sample_report();
        let user = Uuid::new_v4();

        report.comment(user, "Still blocked").unwrap();
        let counts = report.comment(user, "Still blocked").unwrap();

        assert_eq!(counts.comment_count, 2);
        assert_ne!(report.comments()[0].id, report.comments()[1].id);
    }

    #[test]
    fn test_comment_validation_leaves_report_untouched() {
        let mut report = sample_report();
        let err = report.comment(Uuid::new_v4(), &"x".repeat(201)).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(report.comment_count(), 0);
    }

    #[test]
    fn test_comment_count_never_decreases() {
        let mut report = sample_report();
        let user = Uuid::new_v4();
        let mut last = 0;
        for i in 0..5 {
            report.comment(user, &format!("update {}", i)).unwrap();
            report.like(user).unwrap();
            report.unlike(user).unwrap();
            report.vote(user, VoteDirection::Down).unwrap();
            assert!(report.comment_count() > last);
            last = report.comment_count();
        }
    }

    #[test]
    fn test_repeat_view_counts_once() {
        let mut report = sample_report();
        let viewer = Uuid::new_v4();

        report.record_view(viewer).unwrap();
        let counts = report.record_view(viewer).unwrap();
        assert_eq!(counts.views, 1);

        let counts = report.record_view(Uuid::new_v4()).unwrap();
        assert_eq!(counts.views, 2);
        assert_eq!(report.viewed_by().len(), 2);
    }

    #[test]
    fn test_inactive_report_refuses_engagement() {
        let mut report = sample_report();
        let author = report.reported_by();
        report.deactivate(author).unwrap();
        let user = Uuid::new_v4();

        assert!(matches!(report.like(user), Err(Error::NotFound(_))));
        assert!(matches!(report.unlike(user), Err(Error::NotFound(_))));
        assert!(matches!(report.vote(user, VoteDirection::Up), Err(Error::NotFound(_))));
        assert!(matches!(report.comment(user, "hi"), Err(Error::NotFound(_))));
        assert!(matches!(report.record_view(user), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_vote_direction_parsing() {
        assert_eq!("up".parse::<VoteDirection>().unwrap(), VoteDirection::Up);
        assert!("sideways".parse::<VoteDirection>().is_err());
    }
}
