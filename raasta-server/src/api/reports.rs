//! Report creation, retrieval and soft delete

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use raasta_common::{
    db::reports::{self, Inserted},
    validation::LIST_PAGE_SIZE,
    Error, Report, StoredPhoto,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::upload::read_create_form;
use super::{parse_report_id, success, ActingUser};
use crate::{ApiResult, AppState};

/// Header carrying the client's per-submission key
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

fn idempotency_key(headers: &HeaderMap) -> ApiResult<Option<String>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| Error::validation("Idempotency-Key", "header must be ASCII"))?
        .trim();
    if key.is_empty() {
        return Ok(None);
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(Error::validation(
            "Idempotency-Key",
            format!("header longer than {} characters", MAX_IDEMPOTENCY_KEY_LEN),
        )
        .into());
    }
    Ok(Some(key.to_string()))
}

fn report_body(report: &Report) -> Value {
    json!({ "report": report.with_counts() })
}

/// POST /api/reports
///
/// Multipart form: `type`, `description`, `location`, optional `coordinates`,
/// `severity`, `title`, `priority`, `tags`, `estimatedResolutionTime` and one `photo`.
/// Returns 201 for a new report. A repeated `Idempotency-Key` from the same reporter
/// returns the stored report with 200 and stores nothing.
pub async fn create_report(
    State(state): State<AppState>,
    user: ActingUser,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let client_token = idempotency_key(&headers)?;
    let form = read_create_form(multipart, state.max_photo_bytes).await?;

    if let Some(token) = client_token.as_deref() {
        if let Some(existing) = reports::find_by_client_token(&state.db, user.id(), token).await? {
            info!(report_id = %existing.id(), "Replayed submission, returning stored report");
            return Ok((StatusCode::OK, success(report_body(&existing))));
        }
    }

    // Validate before touching photo storage so a bad form leaves nothing behind.
    let mut report = Report::create(form.new_report, user.id(), Vec::new())?;

    let mut stored_photo = None;
    if let Some(upload) = form.photo {
        let stored = state.photos.store(upload.bytes, upload.meta).await?;
        report.photos.push(stored.clone().into_photo());
        stored_photo = Some(stored);
    }

    let inserted = match reports::insert_report(&state.db, report, client_token.as_deref()).await {
        Ok(inserted) => inserted,
        Err(e) => {
            discard_photo(&state, stored_photo.as_ref()).await;
            return Err(e.into());
        }
    };

    match inserted {
        Inserted::Created(report) => {
            info!(
                report_id = %report.id(),
                report_type = %report.report_type,
                has_coordinates = report.coordinates().is_some(),
                photos = report.photos.len(),
                "Report submitted"
            );
            Ok((StatusCode::CREATED, success(report_body(&report))))
        }
        Inserted::Existing(existing) => {
            // A concurrent replay won the insert; its report holds its own photo.
            discard_photo(&state, stored_photo.as_ref()).await;
            Ok((StatusCode::OK, success(report_body(&existing))))
        }
    }
}

/// Remove a photo stored for a report that was never inserted
async fn discard_photo(state: &AppState, photo: Option<&StoredPhoto>) {
    let Some(photo) = photo else {
        return;
    };
    if let Err(e) = state.photos.remove(photo).await {
        warn!(storage_id = %photo.storage_id, error = %e, "Failed to remove unreferenced photo");
    }
}

/// GET /api/reports
///
/// Active reports, newest first.
pub async fn list_reports(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let reports = reports::list_active(&state.db, LIST_PAGE_SIZE).await?;
    let items: Vec<_> = reports.iter().map(Report::with_counts).collect();
    Ok(success(json!({ "count": items.len(), "reports": items })))
}

/// GET /api/reports/my-reports
pub async fn my_reports(State(state): State<AppState>, user: ActingUser) -> ApiResult<Json<Value>> {
    let reports = reports::list_by_reporter(&state.db, user.id(), LIST_PAGE_SIZE).await?;
    let items: Vec<_> = reports.iter().map(Report::with_counts).collect();
    Ok(success(json!({ "count": items.len(), "reports": items })))
}

/// GET /api/reports/:id
pub async fn get_report(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_report_id(&id)?;
    let report = reports::get_active_report(&state.db, id).await?;
    Ok(success(report_body(&report)))
}

/// DELETE /api/reports/:id
///
/// Soft delete; only the reporter may do it.
pub async fn delete_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_report_id(&id)?;
    reports::mutate_report(&state.db, id, "delete", |report| report.deactivate(user.id())).await?;
    info!(report_id = %id, user = %user.id(), "Report deleted");
    Ok(Json(json!({ "status": "success", "message": "Report deleted" })))
}
