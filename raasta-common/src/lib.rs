//! # Raasta Common Library
//!
//! Shared code for the Raasta traffic-report services:
//! - Report aggregate with embedded engagement (likes, votes, comments, views)
//! - Coordinate sanitation for geotagged reports
//! - Moderation status machine
//! - SQLite persistence with per-report atomic updates
//! - Photo storage capability
//! - Configuration loading

pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod geo;
pub mod report;
pub mod status;
pub mod storage;
pub mod time;
pub mod validation;

pub use engagement::{EngagementCounts, VoteDirection};
pub use error::{Error, Result};
pub use geo::GeoPoint;
pub use report::{Location, NewReport, Photo, Report, ReportId, ReportType, Severity, UserId};
pub use status::ReportStatus;
pub use storage::{LocalPhotoStore, PhotoMeta, PhotoStore, StoredPhoto};
