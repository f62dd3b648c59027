//! Multipart body of `POST /api/reports`
//!
//! Text fields arrive as strings; `location`, `coordinates` and `tags` carry JSON.
//! At most one file part named `photo` is accepted.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use raasta_common::{geo, Error, Location, NewReport, PhotoMeta, ReportType, Severity};
use serde_json::Value;
use tracing::debug;

use crate::{ApiError, ApiResult};

/// Photo bytes received with a create request
#[derive(Debug)]
pub struct UploadedPhoto {
    pub bytes: Vec<u8>,
    pub meta: PhotoMeta,
}

/// Parsed create request
#[derive(Debug)]
pub struct CreateForm {
    pub new_report: NewReport,
    pub photo: Option<UploadedPhoto>,
}

#[derive(Default)]
struct Fields {
    report_type: Option<String>,
    title: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    location: Option<String>,
    coordinates: Option<String>,
    priority: Option<String>,
    tags: Option<String>,
    estimated_resolution_time: Option<String>,
}

/// Read every part of the form and build the reporter's input
pub async fn read_create_form(mut multipart: Multipart, max_photo_bytes: usize) -> ApiResult<CreateForm> {
    let mut fields = Fields::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                if photo.is_some() {
                    return Err(Error::validation("photo", "Only one photo may be attached").into());
                }
                photo = Some(read_photo(field, max_photo_bytes).await?);
            }
            "type" => fields.report_type = Some(text(field).await?),
            "title" => fields.title = Some(text(field).await?),
            "description" => fields.description = Some(text(field).await?),
            "severity" => fields.severity = Some(text(field).await?),
            "location" => fields.location = Some(text(field).await?),
            "coordinates" => fields.coordinates = Some(text(field).await?),
            "priority" => fields.priority = Some(text(field).await?),
            "tags" => fields.tags = Some(text(field).await?),
            "estimatedResolutionTime" => fields.estimated_resolution_time = Some(text(field).await?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(CreateForm {
        new_report: fields.into_new_report()?,
        photo,
    })
}

impl Fields {
    fn into_new_report(self) -> ApiResult<NewReport> {
        let report_type: ReportType = required(self.report_type, "type")?.trim().parse()?;
        let description = required(self.description, "description")?;
        let location = parse_location(&required(self.location, "location")?)?;

        let severity = match non_blank(self.severity) {
            Some(s) => Some(s.parse::<Severity>()?),
            None => None,
        };

        let priority = match non_blank(self.priority) {
            Some(p) => Some(p.parse::<u8>().map_err(|_| {
                Error::validation("priority", format!("priority must be a number, got '{}'", p))
            })?),
            None => None,
        };

        let coordinates = non_blank(self.coordinates).and_then(|raw| geo::sanitize_str(&raw));

        Ok(NewReport {
            report_type,
            title: non_blank(self.title),
            description,
            location,
            coordinates,
            severity,
            priority,
            tags: non_blank(self.tags).map(|t| parse_tags(&t)).unwrap_or_default(),
            estimated_resolution_time: non_blank(self.estimated_resolution_time),
        })
    }
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    non_blank(value).ok_or_else(|| Error::validation(field, format!("{} is required", field)).into())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `location` is a JSON object; a bare string is taken as the address
fn parse_location(raw: &str) -> ApiResult<Location> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return Ok(Location::new(trimmed));
    }
    serde_json::from_str(trimmed)
        .map_err(|_| Error::validation("location", "Invalid JSON format for location").into())
}

/// `tags` is a JSON array of strings, or a comma-separated list
fn parse_tags(raw: &str) -> Vec<String> {
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => raw.split(',').map(str::to_string).collect::<Vec<_>>(),
    };
    parsed
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

async fn text(field: Field<'_>) -> ApiResult<String> {
    field.text().await.map_err(multipart_error)
}

async fn read_photo(field: Field<'_>, max_photo_bytes: usize) -> ApiResult<UploadedPhoto> {
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let file_name = field.file_name().map(str::to_string);

    // Reject by type before reading the body.
    if !content_type.starts_with("image/") {
        return Err(Error::validation("photo", "Only image files are allowed").into());
    }

    let bytes = field.bytes().await.map_err(|e| {
        if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
            too_large(max_photo_bytes)
        } else {
            multipart_error(e)
        }
    })?;

    let meta = PhotoMeta {
        content_type,
        file_name,
        size: bytes.len(),
    };
    raasta_common::validation::validate_photo(&meta, max_photo_bytes)?;

    Ok(UploadedPhoto {
        bytes: bytes.to_vec(),
        meta,
    })
}

fn too_large(max_photo_bytes: usize) -> ApiError {
    Error::validation(
        "photo",
        format!(
            "File size too large. Maximum size is {}MB.",
            max_photo_bytes / (1024 * 1024)
        ),
    )
    .into()
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::BadRequest(err.body_text())
}
