//! HTTP API handlers for raasta-server

pub mod auth;
pub mod engagement;
pub mod health;
pub mod moderation;
pub mod reports;
pub mod upload;

pub use auth::{ActingUser, SessionVerifier, TokenTable};
pub use health::health_routes;

use axum::{extract::rejection::JsonRejection, Json};
use raasta_common::{Error, ReportId};
use serde::Serialize;
use serde_json::{json, Value};

/// Wrap a payload in the `{"status":"success","data":...}` envelope
pub(crate) fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": data,
    }))
}

/// Path ids that are not UUIDs cannot name a stored report
pub(crate) fn parse_report_id(raw: &str) -> Result<ReportId, Error> {
    raw.parse().map_err(|_| Error::report_not_found(raw))
}

/// Unwrap a JSON body, reporting a missing or mistyped body as a validation error on `field`
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>, field: &str) -> Result<T, Error> {
    body.map(|Json(value)| value)
        .map_err(|rejection| Error::validation(field, rejection.body_text()))
}
