//! # Raasta Client Library
//!
//! Client side of the traffic report service:
//! - Submission pipeline: local draft checks, coordinate pre-flight, multipart upload
//!   with progress, bounded retry with backoff, cancellation
//! - Typed errors for rendering to the reporter
//! - Engagement client for listing, likes, votes, comments and views

pub mod config;
pub mod credentials;
pub mod draft;
pub mod error;
pub mod pipeline;
pub mod reports_client;
pub mod transport;

pub use config::ClientConfig;
pub use credentials::{CredentialProvider, SessionContext, StaticToken};
pub use draft::{PhotoAttachment, PreparedSubmission, ReportDraft};
pub use error::SubmitError;
pub use pipeline::{DelayFn, Submitted, Submitter};
pub use reports_client::ReportsClient;
pub use transport::{Progress, ReqwestTransport, Transport, UploadProgress};
