//! Report aggregate
//!
//! A [`Report`] owns its engagement collections (likes, votes, comments, viewers). They
//! are embedded in the aggregate and stored with it, so one report is one consistency
//! boundary. Nothing outside this crate can mutate them except through the operations in
//! [`crate::engagement`] and [`crate::status`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::geo::{self, GeoPoint};
use crate::status::ReportStatus;
use crate::{time, validation, Error, Result};

/// Identifier of a report
pub type ReportId = Uuid;

/// Identifier of a user (owned by the external account service)
pub type UserId = Uuid;

/// Kind of traffic condition being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Accident,
    Police,
    Pothole,
    Construction,
    Congestion,
    Closure,
    Weather,
    Vip,
}

impl ReportType {
    pub const ALL: [ReportType; 8] = [
        ReportType::Accident,
        ReportType::Police,
        ReportType::Pothole,
        ReportType::Construction,
        ReportType::Congestion,
        ReportType::Closure,
        ReportType::Weather,
        ReportType::Vip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Accident => "accident",
            ReportType::Police => "police",
            ReportType::Pothole => "pothole",
            ReportType::Construction => "construction",
            ReportType::Congestion => "congestion",
            ReportType::Closure => "closure",
            ReportType::Weather => "weather",
            ReportType::Vip => "vip",
        }
    }

    /// Title used when the reporter does not supply one, e.g. "Pothole Report"
    pub fn default_title(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{}{} Report", first.to_uppercase(), chars.as_str()),
            None => "Report".to_string(),
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::validation("type", format!("unknown report type '{}'", s)))
    }
}

/// Reporter's estimate of how bad the condition is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(Error::validation(
                "severity",
                format!("unknown severity '{}'", other),
            )),
        }
    }
}

/// Free-text location of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

impl Location {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            city: None,
            state: None,
            country: default_country(),
        }
    }
}

/// Handle to a photo held by the photo store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub url: String,
    pub public_id: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub user: UserId,
    pub liked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEntry {
    pub user: UserId,
    pub voted_at: DateTime<Utc>,
}

/// Up and down votes; a user is in at most one of the two lists
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Votes {
    pub(crate) up: Vec<VoteEntry>,
    pub(crate) down: Vec<VoteEntry>,
}

impl Votes {
    pub fn up(&self) -> &[VoteEntry] {
        &self.up
    }

    pub fn down(&self) -> &[VoteEntry] {
        &self.down
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub user: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub user: UserId,
    pub viewed_at: DateTime<Utc>,
}

/// Fields supplied by a reporter when creating a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub title: Option<String>,
    pub description: String,
    pub location: Location,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub estimated_resolution_time: Option<String>,
}

impl NewReport {
    pub fn new(report_type: ReportType, description: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            report_type,
            title: None,
            description: description.into(),
            location: Location::new(address),
            coordinates: None,
            severity: None,
            priority: None,
            tags: Vec::new(),
            estimated_resolution_time: None,
        }
    }
}

/// A user-submitted traffic report with its embedded engagement state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub(crate) id: ReportId,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub(crate) status: ReportStatus,
    pub(crate) reported_by: UserId,
    #[serde(default)]
    pub(crate) verified_by: Option<UserId>,
    #[serde(default)]
    pub(crate) verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub(crate) likes: Vec<Like>,
    #[serde(default)]
    pub(crate) comments: Vec<Comment>,
    #[serde(default)]
    pub(crate) votes: Votes,
    #[serde(default)]
    pub(crate) views: u64,
    #[serde(default)]
    pub(crate) viewed_by: Vec<View>,
    #[serde(default)]
    pub estimated_resolution_time: Option<String>,
    #[serde(default)]
    pub(crate) actual_resolution_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) resolution_notes: Option<String>,
    pub(crate) is_active: bool,
    pub priority: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    pub(crate) reported_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Report {
    /// Build a new report from validated reporter input
    ///
    /// Coordinates are re-sanitized here; an invalid point is dropped, not stored.
    pub fn create(new: NewReport, reported_by: UserId, photos: Vec<Photo>) -> Result<Self> {
        validation::validate_new_report(&new)?;

        let now = time::now();
        let title = new
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| new.report_type.default_title());

        Ok(Self {
            id: Uuid::new_v4(),
            report_type: new.report_type,
            title,
            description: new.description.trim().to_string(),
            location: new.location,
            coordinates: new.coordinates.and_then(geo::sanitize_point),
            severity: new.severity.unwrap_or_default(),
            status: ReportStatus::Pending,
            reported_by,
            verified_by: None,
            verified_at: None,
            photos,
            likes: Vec::new(),
            comments: Vec::new(),
            votes: Votes::default(),
            views: 0,
            viewed_by: Vec::new(),
            estimated_resolution_time: new.estimated_resolution_time,
            actual_resolution_time: None,
            resolution_notes: None,
            is_active: true,
            priority: new.priority.unwrap_or(validation::DEFAULT_PRIORITY),
            tags: new.tags,
            reported_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> ReportId {
        self.id
    }

    pub fn reported_by(&self) -> UserId {
        self.reported_by
    }

    pub fn coordinates(&self) -> Option<GeoPoint> {
        self.coordinates
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn verified_by(&self) -> Option<UserId> {
        self.verified_by
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn actual_resolution_time(&self) -> Option<DateTime<Utc>> {
        self.actual_resolution_time
    }

    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }

    pub fn likes(&self) -> &[Like] {
        &self.likes
    }

    pub fn votes(&self) -> &Votes {
        &self.votes
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn views(&self) -> u64 {
        self.views
    }

    pub fn viewed_by(&self) -> &[View] {
        &self.viewed_by
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn reported_at(&self) -> DateTime<Utc> {
        self.reported_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn vote_score(&self) -> i64 {
        self.votes.up.len() as i64 - self.votes.down.len() as i64
    }

    /// Inactive reports are invisible to engagement and listings
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(Error::report_not_found(self.id))
        }
    }

    /// Soft-delete the report; only its author may do so
    pub fn deactivate(&mut self, actor: UserId) -> Result<()> {
        self.ensure_active()?;
        if actor != self.reported_by {
            return Err(Error::Forbidden(format!(
                "only the reporter may delete report {}",
                self.id
            )));
        }
        self.is_active = false;
        Ok(())
    }

    /// Serializable view including the derived counters
    pub fn with_counts(&self) -> ReportWithCounts<'_> {
        ReportWithCounts {
            report: self,
            like_count: self.like_count(),
            comment_count: self.comment_count(),
            vote_score: self.vote_score(),
        }
    }

    /// Re-establish every aggregate invariant before the report is written
    ///
    /// Runs on every insert and update. Corrections are logged, never silent.
    pub fn prepare_for_save(&mut self) {
        self.updated_at = time::now();

        if let Some(point) = self.coordinates {
            if geo::sanitize_point(point).is_none() {
                warn!(report_id = %self.id, "Removing invalid coordinates from report");
                self.coordinates = None;
            }
        }

        let before = self.likes.len();
        let mut seen = std::collections::HashSet::new();
        self.likes.retain(|like| seen.insert(like.user));
        if self.likes.len() != before {
            warn!(report_id = %self.id, removed = before - self.likes.len(), "Removed duplicate likes");
        }

        self.normalize_votes();

        let mut viewers = std::collections::HashSet::new();
        self.viewed_by.retain(|view| viewers.insert(view.user));
        let recorded = self.viewed_by.len() as u64;
        if self.views < recorded {
            warn!(report_id = %self.id, views = self.views, recorded, "View counter behind viewer set");
            self.views = recorded;
        }
    }

    /// Keep each user in at most one vote list, keeping their most recent vote
    fn normalize_votes(&mut self) {
        let mut latest: std::collections::HashMap<UserId, (bool, DateTime<Utc>)> =
            std::collections::HashMap::new();
        for (is_up, entry) in self
            .votes
            .up
            .iter()
            .map(|e| (true, e))
            .chain(self.votes.down.iter().map(|e| (false, e)))
        {
            let keep = match latest.get(&entry.user) {
                Some((_, at)) => entry.voted_at > *at,
                None => true,
            };
            if keep {
                latest.insert(entry.user, (is_up, entry.voted_at));
            }
        }

        let total_before = self.votes.up.len() + self.votes.down.len();
        let mut kept = std::collections::HashSet::new();
        self.votes.up.retain(|e| {
            latest.get(&e.user) == Some(&(true, e.voted_at)) && kept.insert(e.user)
        });
        self.votes.down.retain(|e| {
            latest.get(&e.user) == Some(&(false, e.voted_at)) && kept.insert(e.user)
        });

        let total_after = self.votes.up.len() + self.votes.down.len();
        if total_after != total_before {
            warn!(
                report_id = %self.id,
                removed = total_before - total_after,
                "Removed conflicting or duplicate votes"
            );
        }
    }
}

/// Report serialized together with its derived counters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWithCounts<'a> {
    #[serde(flatten)]
    pub report: &'a Report,
    pub like_count: usize,
    pub comment_count: usize,
    pub vote_score: i64,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn sample_report() -> Report {
        let new = NewReport::new(
            ReportType::Pothole,
            "Pothole near junction",
            "Ring Road, Lajpat Nagar",
        );
        Report::create(new, Uuid::new_v4(), Vec::new()).expect("valid sample report")
    }

    #[test]
    fn test_create_applies_defaults() {
        let report = sample_report();
        assert_eq!(report.status(), ReportStatus::Pending);
        assert_eq!(report.severity, Severity::Medium);
        assert_eq!(report.priority, 1);
        assert_eq!(report.title, "Pothole Report");
        assert_eq!(report.location.country, "India");
        assert!(report.is_active());
        assert_eq!(report.like_count(), 0);
        assert_eq!(report.comment_count(), 0);
        assert_eq!(report.vote_score(), 0);
        assert_eq!(report.views(), 0);
    }

    #[test]
    fn test_create_drops_origin_coordinates() {
        let mut new = NewReport::new(ReportType::Pothole, "Pothole near junction", "Ring Road");
        new.coordinates = Some(GeoPoint {
            longitude: 0.0,
            latitude: 0.0,
        });
        let report = Report::create(new, Uuid::new_v4(), Vec::new()).unwrap();
        assert!(report.coordinates().is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("coordinates").is_none());
    }

    #[test]
    fn test_create_keeps_valid_coordinates_exactly() {
        let mut new = NewReport::new(ReportType::Pothole, "Pothole near junction", "Ring Road");
        new.coordinates = GeoPoint::new(77.2090, 28.6139);
        let report = Report::create(new, Uuid::new_v4(), Vec::new()).unwrap();
        let point = report.coordinates().unwrap();
        assert_eq!(point.longitude, 77.2090);
        assert_eq!(point.latitude, 28.6139);
    }

    #[test]
    fn test_type_parsing_and_titles() {
        assert_eq!("vip".parse::<ReportType>().unwrap(), ReportType::Vip);
        assert!("flood".parse::<ReportType>().is_err());
        assert_eq!(ReportType::Construction.default_title(), "Construction Report");
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
    }

    #[test]
    fn test_deactivate_only_by_reporter() {
        let mut report = sample_report();
        let err = report.deactivate(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(report.is_active());

        let author = report.reported_by();
        report.deactivate(author).unwrap();
        assert!(!report.is_active());
        assert!(matches!(report.deactivate(author), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_prepare_for_save_repairs_hand_built_state() {
        let mut report = sample_report();
        let user = Uuid::new_v4();
        let now = time::now();
        report.coordinates = Some(GeoPoint {
            longitude: f64::NAN,
            latitude: 12.0,
        });
        report.likes = vec![
            Like { user, liked_at: now },
            Like { user, liked_at: now },
        ];
        report.votes.up.push(VoteEntry {
            user,
            voted_at: now - Duration::seconds(5),
        });
        report.votes.down.push(VoteEntry { user, voted_at: now });

        report.prepare_for_save();

        assert!(report.coordinates().is_none());
        assert_eq!(report.like_count(), 1);
        assert!(report.votes().up().is_empty());
        assert_eq!(report.votes().down().len(), 1);
        assert_eq!(report.vote_score(), -1);
    }

    #[test]
    fn test_with_counts_serializes_derived_fields() {
        let report = sample_report();
        let value = serde_json::to_value(report.with_counts()).unwrap();
        assert_eq!(value["likeCount"], 0);
        assert_eq!(value["commentCount"], 0);
        assert_eq!(value["voteScore"], 0);
        assert_eq!(value["type"], "pothole");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["isActive"], true);
    }
}
