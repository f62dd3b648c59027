//! Report drafts and their pre-flight checks
//!
//! A draft is what the reporter has filled in so far. [`ReportDraft::prepare`] checks it
//! locally and produces the exact payload every attempt will send.

use raasta_common::validation::{self, MAX_PHOTO_BYTES};
use raasta_common::{geo, GeoPoint, Location, PhotoMeta, ReportType, Severity};
use serde_json::Value;
use uuid::Uuid;

use crate::SubmitError;

/// Image attached to a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoAttachment {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl PhotoAttachment {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    fn meta(&self) -> PhotoMeta {
        PhotoMeta {
            content_type: self.content_type.clone(),
            file_name: Some(self.file_name.clone()),
            size: self.bytes.len(),
        }
    }
}

/// Reporter input before submission
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    pub report_type: Option<ReportType>,
    pub title: Option<String>,
    pub description: String,
    pub location: Option<Location>,
    /// Raw coordinates as captured, `{"coordinates": [lng, lat]}`
    pub coordinates: Option<Value>,
    pub severity: Option<Severity>,
    pub photo: Option<PhotoAttachment>,
}

impl ReportDraft {
    pub fn new(report_type: ReportType, description: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            report_type: Some(report_type),
            description: description.into(),
            location: Some(Location::new(address)),
            ..Self::default()
        }
    }

    pub fn with_coordinates(mut self, longitude: f64, latitude: f64) -> Self {
        self.coordinates = Some(serde_json::json!({
            "type": "Point",
            "coordinates": [longitude, latitude],
        }));
        self
    }

    pub fn with_raw_coordinates(mut self, raw: Value) -> Self {
        self.coordinates = Some(raw);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_photo(mut self, photo: PhotoAttachment) -> Self {
        self.photo = Some(photo);
        self
    }

    /// Check required fields and build the payload
    ///
    /// Coordinates that fail sanitation are left out of the payload rather than failing
    /// the draft. The returned submission carries a fresh idempotency key.
    pub fn prepare(&self) -> Result<PreparedSubmission, SubmitError> {
        let report_type = self
            .report_type
            .ok_or_else(|| SubmitError::validation("type", "Please select a report type"))?;

        let location = self
            .location
            .as_ref()
            .filter(|l| !l.address.trim().is_empty())
            .ok_or_else(|| SubmitError::validation("location", "Location is required"))?;

        validation::validate_description(&self.description)?;

        if let Some(photo) = &self.photo {
            validation::validate_photo(&photo.meta(), MAX_PHOTO_BYTES)?;
        }

        let coordinates = self.coordinates.as_ref().and_then(geo::sanitize);

        let mut fields = vec![
            ("type", report_type.as_str().to_string()),
            ("description", self.description.trim().to_string()),
            ("location", location_json(location)?),
        ];
        if let Some(title) = self.title.as_ref().filter(|t| !t.trim().is_empty()) {
            fields.push(("title", title.trim().to_string()));
        }
        if let Some(severity) = self.severity {
            fields.push(("severity", severity.as_str().to_string()));
        }
        if let Some(point) = coordinates {
            fields.push(("coordinates", compact_point(point)));
        }

        Ok(PreparedSubmission {
            fields,
            photo: self.photo.clone(),
            coordinates,
            idempotency_key: Uuid::new_v4().to_string(),
        })
    }
}

fn location_json(location: &Location) -> Result<String, SubmitError> {
    serde_json::to_string(location).map_err(|e| SubmitError::Unknown(e.to_string()))
}

/// GeoJSON point as sent in the `coordinates` form field
fn compact_point(point: GeoPoint) -> String {
    point.to_geojson().to_string()
}

/// Payload sent unchanged on every attempt of one submission
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    /// Text form fields in send order
    pub fields: Vec<(&'static str, String)>,
    pub photo: Option<PhotoAttachment>,
    /// Sanitized point, if one survived
    pub coordinates: Option<GeoPoint>,
    /// Sent as `Idempotency-Key`; identical across attempts
    pub idempotency_key: String,
}

impl PreparedSubmission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}
