//! Input limits and field validation shared by client pre-flight and server

use crate::report::NewReport;
use crate::storage::PhotoMeta;
use crate::{Error, Result};

/// Maximum description length in characters
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Maximum comment length in characters
pub const MAX_COMMENT_CHARS: usize = 200;

/// Maximum photo upload size (10 MiB)
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Listings return at most this many reports
pub const LIST_PAGE_SIZE: i64 = 100;

pub const DEFAULT_PRIORITY: u8 = 1;
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;

/// Validate reporter-supplied fields before a report is built
pub fn validate_new_report(new: &NewReport) -> Result<()> {
    validate_description(&new.description)?;

    if new.location.address.trim().is_empty() {
        return Err(Error::validation("location", "Location address is required"));
    }

    if let Some(priority) = new.priority {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(Error::validation(
                "priority",
                format!("Priority must be between {} and {}", MIN_PRIORITY, MAX_PRIORITY),
            ));
        }
    }

    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("description", "Description is required"));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(Error::validation(
            "description",
            format!(
                "Description cannot be more than {} characters",
                MAX_DESCRIPTION_CHARS
            ),
        ));
    }
    Ok(())
}

/// Comments must be non-blank and at most 200 characters
pub fn validate_comment(text: &str) -> Result<()> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("text", "Comment text is required"));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(Error::validation(
            "text",
            format!("Comment cannot be more than {} characters", MAX_COMMENT_CHARS),
        ));
    }
    Ok(())
}

/// Photos must be images and no larger than `max_bytes`
pub fn validate_photo(meta: &PhotoMeta, max_bytes: usize) -> Result<()> {
    if !meta.content_type.starts_with("image/") {
        return Err(Error::validation("photo", "Only image files are allowed"));
    }
    if meta.size > max_bytes {
        return Err(Error::validation(
            "photo",
            format!(
                "File size too large. Maximum size is {}MB.",
                max_bytes / (1024 * 1024)
            ),
        ));
    }
    Ok(())
}
