//! Moderation status transitions
//!
//! Who may moderate is decided by the session service; any authenticated caller
//! reaching these routes acts as the moderator.

use axum::{
    extract::{Path, State},
    Json,
};
use raasta_common::{db::reports::mutate_report, ReportStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_report_id, success, ActingUser};
use crate::{ApiResult, AppState};

/// Optional body of `/reject` and `/resolve`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationNotes {
    #[serde(default, alias = "notes")]
    pub resolution_notes: Option<String>,
}

async fn apply(
    state: &AppState,
    user: ActingUser,
    raw_id: &str,
    next: ReportStatus,
    notes: Option<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_report_id(raw_id)?;
    let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let (report, _) = mutate_report(&state.db, id, next.as_str(), |r| {
        r.transition(next, user.id(), notes.clone())
    })
    .await?;
    Ok(success(json!({ "report": report.with_counts() })))
}

/// POST /api/reports/:id/verify
pub async fn verify_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    apply(&state, user, &id, ReportStatus::Verified, None).await
}

/// POST /api/reports/:id/reject
pub async fn reject_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    body: Option<Json<ModerationNotes>>,
) -> ApiResult<Json<Value>> {
    let notes = body.and_then(|Json(b)| b.resolution_notes);
    apply(&state, user, &id, ReportStatus::Rejected, notes).await
}

/// POST /api/reports/:id/resolve
///
/// Only a verified report can be resolved.
pub async fn resolve_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    body: Option<Json<ModerationNotes>>,
) -> ApiResult<Json<Value>> {
    let notes = body.and_then(|Json(b)| b.resolution_notes);
    apply(&state, user, &id, ReportStatus::Resolved, notes).await
}
