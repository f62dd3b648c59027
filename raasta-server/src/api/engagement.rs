//! Likes, votes, comments and views
//!
//! Each handler applies one engagement operation atomically and answers with the
//! report's fresh counters.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use raasta_common::{
    db::reports::mutate_report, report::Comment, EngagementCounts, Error, VoteDirection,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{json_body, parse_report_id, success, ActingUser};
use crate::{ApiResult, AppState};

/// Counters plus the caller's own state after the operation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementResponse {
    #[serde(flatten)]
    pub counts: EngagementCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<VoteDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
}

impl EngagementResponse {
    fn counts(counts: EngagementCounts) -> Self {
        Self {
            counts,
            liked: None,
            vote: None,
            comment: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// POST /api/reports/:id/like
pub async fn like_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_report_id(&id)?;
    let (_, counts) = mutate_report(&state.db, id, "like", |r| r.like(user.id())).await?;
    info!(report_id = %id, user = %user.id(), likes = counts.like_count, "Report liked");
    Ok(success(EngagementResponse {
        liked: Some(true),
        ..EngagementResponse::counts(counts)
    }))
}

/// DELETE /api/reports/:id/like
pub async fn unlike_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_report_id(&id)?;
    let (_, counts) = mutate_report(&state.db, id, "unlike", |r| r.unlike(user.id())).await?;
    info!(report_id = %id, user = %user.id(), likes = counts.like_count, "Report unliked");
    Ok(success(EngagementResponse {
        liked: Some(false),
        ..EngagementResponse::counts(counts)
    }))
}

/// POST /api/reports/:id/vote
///
/// Body: `{"voteType": "up" | "down"}`. A second vote replaces the first.
pub async fn vote_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = parse_report_id(&id)?;
    let body = json_body(body, "voteType")?;
    let direction: VoteDirection = body.vote_type.trim().parse()?;
    let (_, counts) = mutate_report(&state.db, id, "vote", |r| r.vote(user.id(), direction)).await?;
    info!(report_id = %id, user = %user.id(), %direction, score = counts.vote_score, "Vote recorded");
    Ok(success(EngagementResponse {
        vote: Some(direction),
        ..EngagementResponse::counts(counts)
    }))
}

/// POST /api/reports/:id/comments
///
/// Body: `{"text": "..."}`, 1 to 200 characters after trimming.
pub async fn comment_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = parse_report_id(&id)?;
    let body = json_body(body, "text")?;
    let (_, (counts, comment)) = mutate_report(&state.db, id, "comment", |r| {
        let counts = r.comment(user.id(), &body.text)?;
        // Appended by this round
        let comment = r
            .comments()
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal(format!("comment on report {} not appended", id)))?;
        Ok((counts, comment))
    })
    .await?;

    info!(report_id = %id, user = %user.id(), comments = counts.comment_count, "Comment added");
    Ok(success(EngagementResponse {
        comment: Some(comment),
        ..EngagementResponse::counts(counts)
    }))
}

/// POST /api/reports/:id/view
///
/// Only a user's first view raises the counter.
pub async fn view_report(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_report_id(&id)?;
    let (_, counts) = mutate_report(&state.db, id, "view", |r| r.record_view(user.id())).await?;
    Ok(success(EngagementResponse::counts(counts)))
}
